#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(
    clippy::use_self,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::missing_panics_doc
)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::io::{self, BufRead, Write};

use chrono::NaiveDateTime;
use interprocess::local_socket::{prelude::*, GenericFilePath, GenericNamespaced, Name, NameType};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

pub mod alarm;
pub mod alert;
pub mod backlight;
pub mod clock;
pub mod config;
pub mod error;
pub mod matcher;
pub mod rtc;
pub mod server;
pub mod settings;
pub mod store;
pub mod telemetry;
pub mod weather;

pub use alarm::{Alarm, AlarmEdit, Days, NewAlarm};
pub use clock::{AlarmClock, Ringing, Status};
pub use error::{Error, Result};
pub use matcher::NextAlarm;
pub use settings::{AutoDim, Settings, SettingsEdit};

/// Requests from `pi_clock` to the daemon.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    GetAlarms,
    AddAlarm(NewAlarm),
    EditAlarm(Uuid, Vec<AlarmEdit>),
    RemoveAlarm(Uuid),
    StopAlarm,
    Snooze,
    ToggleTest,
    NextAlarm,
    GetStatus,
    GetSettings,
    SetSettings(Vec<SettingsEdit>),
}

/// One reply per [`ClientMessage`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerMessage {
    Alarms(Vec<Alarm>),
    AlarmAdded(Alarm),
    AlarmSet(Alarm),
    AlarmRemoved(Alarm),
    /// whether anything was ringing
    AlarmStopped(bool),
    /// when the alarm rings again, `None` if nothing was snoozed
    Snoozed(Option<NaiveDateTime>),
    /// whether the test sound is now playing
    TestToggled(bool),
    NextAlarm(Option<NextAlarm>),
    Status(Status),
    Settings(Settings),
    Error(String),
}

/// Writes `message` as one line of JSON.
pub fn write_message<W: Write, M: Serialize>(writer: &mut W, message: &M) -> Result<()> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads one line of JSON. `None` once the peer has closed the connection.
pub fn read_message<R: BufRead, M: DeserializeOwned>(reader: &mut R) -> Result<Option<M>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}

/// The daemon's socket: namespaced where the platform has namespaces, otherwise
/// a file in the temp directory.
pub fn socket_name(name: &str) -> io::Result<Name<'_>> {
    if GenericNamespaced::is_supported() {
        name.to_ns_name::<GenericNamespaced>()
    } else {
        std::env::temp_dir()
            .join(name)
            .to_fs_name::<GenericFilePath>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_messages_are_one_line_each() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &ClientMessage::GetStatus).unwrap();
        write_message(
            &mut buffer,
            &ClientMessage::EditAlarm(Uuid::nil(), vec![AlarmEdit::Enable(false)]),
        )
        .unwrap();
        write_message(&mut buffer, &ClientMessage::Snooze).unwrap();
        assert_eq!(buffer.iter().filter(|b| **b == b'\n').count(), 3);

        let mut reader = BufReader::new(buffer.as_slice());
        let first: Option<ClientMessage> = read_message(&mut reader).unwrap();
        assert_eq!(first, Some(ClientMessage::GetStatus));
        let second: Option<ClientMessage> = read_message(&mut reader).unwrap();
        assert_eq!(
            second,
            Some(ClientMessage::EditAlarm(
                Uuid::nil(),
                vec![AlarmEdit::Enable(false)]
            ))
        );
        let third: Option<ClientMessage> = read_message(&mut reader).unwrap();
        assert_eq!(third, Some(ClientMessage::Snooze));
        let end: Option<ClientMessage> = read_message(&mut reader).unwrap();
        assert_eq!(end, None);
    }

    #[test]
    fn test_new_alarm_wire_format() {
        let json = r#"{"AddAlarm":{"time":"06:45","days":[5,6],"label":"gym","volume":90,"sound":"rain"}}"#;
        let message: ClientMessage = serde_json::from_str(json).unwrap();
        let ClientMessage::AddAlarm(alarm) = message else {
            panic!("expected AddAlarm");
        };
        assert_eq!(alarm.days, Days::WEEKENDS);
        assert_eq!(alarm.time.to_string(), "06:45:00");
        assert_eq!(alarm.sound.as_deref(), Some("rain"));
    }

    #[test]
    fn test_garbage_is_json_error() {
        let mut reader = BufReader::new("not json\n".as_bytes());
        let result: Result<Option<ClientMessage>> = read_message(&mut reader);
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
