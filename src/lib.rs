#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::io::{BufReader, Read, Write};

use chrono::{NaiveDateTime, Timelike};
use interprocess::local_socket::{prelude::*, Stream};
use log::debug;
use pi_clockd::{
    read_message, socket_name, write_message, Alarm, AlarmEdit, ClientMessage, Days, Error,
    NewAlarm, NextAlarm, Result, ServerMessage, Settings, SettingsEdit, Status,
};
use uuid::Uuid;

/// parsing of alarm times and edits given on the command line
pub mod alarm_edit;
/// plain text rendering of the clock, alarms and settings
pub mod widgets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    AM,
    PM,
}

/// An alarm being put together from command line arguments.
///
/// `time_of_day` is `None` for 24 hour times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmBuilder {
    name: String,
    hour: u8,
    minute: u8,
    time_of_day: Option<TimeOfDay>,
    days: Days,
    sound: Option<String>,
    volume: u8,
}

impl Default for AlarmBuilder {
    fn default() -> Self {
        let time = chrono::Local::now().naive_local().time();
        Self {
            name: String::default(),
            // hour and minute always fit
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            time_of_day: None,
            days: Days::ALL,
            sound: None,
            volume: pi_clockd::alarm::DEFAULT_VOLUME,
        }
    }
}

/// A connection to `pi_clockd`. Any number of requests can be made on it.
#[derive(Debug)]
pub struct Client<S = Stream> {
    conn: BufReader<S>,
}

impl Client {
    pub fn connect(name: &str) -> Result<Self> {
        let conn = Stream::connect(socket_name(name)?).map_err(|e| {
            Error::Protocol(format!(
                "couldn't reach pi_clockd at {name} ({e}), is it running?"
            ))
        })?;
        Ok(Self::new(conn))
    }
}

impl<S: Read + Write> Client<S> {
    pub fn new(conn: S) -> Self {
        Self {
            conn: BufReader::new(conn),
        }
    }

    /// Sends `message` and waits for the reply. Error replies become `Err`.
    pub fn request(&mut self, message: &ClientMessage) -> Result<ServerMessage> {
        debug!("sending {message:?}");
        write_message(self.conn.get_mut(), message)?;
        match read_message(&mut self.conn)? {
            Some(ServerMessage::Error(e)) => Err(Error::Protocol(e)),
            Some(reply) => Ok(reply),
            None => Err(Error::Protocol(
                "pi_clockd closed the connection".to_string(),
            )),
        }
    }

    pub fn alarms(&mut self) -> Result<Vec<Alarm>> {
        match self.request(&ClientMessage::GetAlarms)? {
            ServerMessage::Alarms(alarms) => Ok(alarms),
            other => Err(unexpected(&other)),
        }
    }

    pub fn add(&mut self, alarm: NewAlarm) -> Result<Alarm> {
        match self.request(&ClientMessage::AddAlarm(alarm))? {
            ServerMessage::AlarmAdded(alarm) => Ok(alarm),
            other => Err(unexpected(&other)),
        }
    }

    pub fn edit(&mut self, id: Uuid, edits: Vec<AlarmEdit>) -> Result<Alarm> {
        match self.request(&ClientMessage::EditAlarm(id, edits))? {
            ServerMessage::AlarmSet(alarm) => Ok(alarm),
            other => Err(unexpected(&other)),
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Alarm> {
        match self.request(&ClientMessage::RemoveAlarm(id))? {
            ServerMessage::AlarmRemoved(alarm) => Ok(alarm),
            other => Err(unexpected(&other)),
        }
    }

    pub fn stop(&mut self) -> Result<bool> {
        match self.request(&ClientMessage::StopAlarm)? {
            ServerMessage::AlarmStopped(was_ringing) => Ok(was_ringing),
            other => Err(unexpected(&other)),
        }
    }

    pub fn snooze(&mut self) -> Result<Option<NaiveDateTime>> {
        match self.request(&ClientMessage::Snooze)? {
            ServerMessage::Snoozed(until) => Ok(until),
            other => Err(unexpected(&other)),
        }
    }

    pub fn toggle_test(&mut self) -> Result<bool> {
        match self.request(&ClientMessage::ToggleTest)? {
            ServerMessage::TestToggled(playing) => Ok(playing),
            other => Err(unexpected(&other)),
        }
    }

    pub fn next_alarm(&mut self) -> Result<Option<NextAlarm>> {
        match self.request(&ClientMessage::NextAlarm)? {
            ServerMessage::NextAlarm(next) => Ok(next),
            other => Err(unexpected(&other)),
        }
    }

    pub fn status(&mut self) -> Result<Status> {
        match self.request(&ClientMessage::GetStatus)? {
            ServerMessage::Status(status) => Ok(status),
            other => Err(unexpected(&other)),
        }
    }

    pub fn settings(&mut self) -> Result<Settings> {
        match self.request(&ClientMessage::GetSettings)? {
            ServerMessage::Settings(settings) => Ok(settings),
            other => Err(unexpected(&other)),
        }
    }

    pub fn set_settings(&mut self, edits: Vec<SettingsEdit>) -> Result<Settings> {
        match self.request(&ClientMessage::SetSettings(edits))? {
            ServerMessage::Settings(settings) => Ok(settings),
            other => Err(unexpected(&other)),
        }
    }

    /// Looks up an alarm by full id or unique id prefix.
    pub fn resolve(&mut self, id: &str) -> Result<Uuid> {
        resolve_id(&self.alarms()?, id)
    }
}

fn unexpected(reply: &ServerMessage) -> Error {
    Error::Protocol(format!("unexpected reply {reply:?}"))
}

/// Finds the alarm whose id is `id` or starts with it (hyphens optional).
pub fn resolve_id(alarms: &[Alarm], id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(id) {
        return Ok(id);
    }
    let prefix = id.trim().to_lowercase().replace('-', "");
    if prefix.is_empty() {
        return Err(Error::UnknownId(id.to_string()));
    }
    let mut matches = alarms
        .iter()
        .filter(|alarm| alarm.id.simple().to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(alarm), None) => Ok(alarm.id),
        (Some(_), Some(_)) => Err(Error::AmbiguousId(id.to_string())),
        (None, _) => Err(Error::UnknownId(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::io::Cursor;

    /// Replays canned replies and records what was sent.
    struct Scripted {
        replies: Cursor<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Scripted {
        fn new(replies: &[ServerMessage]) -> Self {
            let mut buffer = Vec::new();
            for reply in replies {
                write_message(&mut buffer, reply).unwrap();
            }
            Self {
                replies: Cursor::new(buffer),
                sent: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.replies.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.sent.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn alarm(id: &str) -> Alarm {
        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).unwrap(), Days::ALL);
        alarm.id = Uuid::parse_str(id).unwrap();
        alarm
    }

    #[test]
    fn test_requests_share_one_connection() {
        let mut client = Client::new(Scripted::new(&[
            ServerMessage::AlarmStopped(true),
            ServerMessage::Snoozed(None),
        ]));
        assert!(client.stop().unwrap());
        assert_eq!(client.snooze().unwrap(), None);

        let sent = String::from_utf8(client.conn.get_ref().sent.clone()).unwrap();
        assert_eq!(sent, "\"StopAlarm\"\n\"Snooze\"\n");
    }

    #[test]
    fn test_error_reply_becomes_err() {
        let mut client = Client::new(Scripted::new(&[ServerMessage::Error(
            "alarm not found".to_string(),
        )]));
        let err = client.remove(Uuid::nil()).unwrap_err();
        assert_eq!(err.to_string(), "protocol error: alarm not found");
    }

    #[test]
    fn test_wrong_reply_and_hangup() {
        let mut client = Client::new(Scripted::new(&[ServerMessage::TestToggled(true)]));
        assert!(matches!(client.alarms(), Err(Error::Protocol(_))));
        assert!(matches!(client.alarms(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_resolve_id() {
        let alarms = [
            alarm("3f2a0c1e-0000-4000-8000-000000000001"),
            alarm("3f2b9d00-0000-4000-8000-000000000002"),
            alarm("a1000000-0000-4000-8000-000000000003"),
        ];
        assert_eq!(resolve_id(&alarms, "a1").unwrap(), alarms[2].id);
        assert_eq!(resolve_id(&alarms, "3F2B").unwrap(), alarms[1].id);
        assert_eq!(
            resolve_id(&alarms, "3f2a0c1e-0000").unwrap(),
            alarms[0].id
        );
        assert!(matches!(
            resolve_id(&alarms, "3f2"),
            Err(Error::AmbiguousId(_))
        ));
        assert!(matches!(resolve_id(&alarms, "ff"), Err(Error::UnknownId(_))));
        assert!(matches!(resolve_id(&alarms, ""), Err(Error::UnknownId(_))));
        assert_eq!(
            resolve_id(&[], "a1000000-0000-4000-8000-000000000003").unwrap(),
            alarms[2].id
        );
    }
}
