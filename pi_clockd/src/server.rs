//! Local socket front end of the clock.

use std::{
    io::{self, BufReader},
    sync::Arc,
    thread,
};

use chrono::{Local, NaiveDateTime};
use interprocess::local_socket::{prelude::*, ListenerOptions, Stream};
use log::{debug, error, info, warn};

use crate::{
    clock::AlarmClock, error::Result, read_message, socket_name, write_message, ClientMessage,
    Error, ServerMessage,
};

/// Accepts clients until the listener fails, serving each on its own thread.
pub fn run(clock: &Arc<AlarmClock>, name: &str) -> Result<()> {
    let listener = match ListenerOptions::new().name(socket_name(name)?).create_sync() {
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            error!("could not start server because {name} is in use, is another pi_clockd running?");
            return Err(e.into());
        }
        listener => listener?,
    };
    info!("listening on {name}");

    for conn in listener.incoming().filter_map(|conn| {
        conn.map_err(|e| warn!("incoming connection failed: {e}")).ok()
    }) {
        let clock = Arc::clone(clock);
        let spawned = thread::Builder::new()
            .name("client".to_string())
            .spawn(move || {
                if let Err(e) = serve(&clock, conn) {
                    warn!("client connection ended: {e}");
                }
            });
        if let Err(e) = spawned {
            error!("couldn't start client thread: {e}");
        }
    }
    Ok(())
}

/// Answers requests on `conn` until the client hangs up.
fn serve(clock: &AlarmClock, conn: Stream) -> Result<()> {
    debug!("client connected");
    let mut conn = BufReader::new(conn);
    loop {
        let reply = match read_message::<_, ClientMessage>(&mut conn) {
            Ok(Some(message)) => {
                debug!("request {message:?}");
                handle_message(clock, message, Local::now().naive_local())
            }
            Ok(None) => break,
            Err(Error::Json(e)) => ServerMessage::Error(format!("bad request: {e}")),
            Err(e) => return Err(e),
        };
        write_message(conn.get_mut(), &reply)?;
    }
    debug!("client disconnected");
    Ok(())
}

fn reply<T>(result: Result<T>, ok: impl FnOnce(T) -> ServerMessage) -> ServerMessage {
    result.map_or_else(|e| ServerMessage::Error(e.to_string()), ok)
}

/// Runs one request against the clock as if it arrived at `now`.
pub fn handle_message(clock: &AlarmClock, message: ClientMessage, now: NaiveDateTime) -> ServerMessage {
    match message {
        ClientMessage::GetAlarms => ServerMessage::Alarms(clock.alarms()),
        ClientMessage::AddAlarm(alarm) => reply(clock.add_alarm(alarm), ServerMessage::AlarmAdded),
        ClientMessage::EditAlarm(id, edits) => {
            reply(clock.edit_alarm(id, edits), ServerMessage::AlarmSet)
        }
        ClientMessage::RemoveAlarm(id) => {
            reply(clock.remove_alarm(id), ServerMessage::AlarmRemoved)
        }
        ClientMessage::StopAlarm => ServerMessage::AlarmStopped(clock.stop()),
        ClientMessage::Snooze => ServerMessage::Snoozed(clock.snooze(now)),
        ClientMessage::ToggleTest => reply(clock.toggle_test(), ServerMessage::TestToggled),
        ClientMessage::NextAlarm => ServerMessage::NextAlarm(clock.next_alarm(now)),
        ClientMessage::GetStatus => ServerMessage::Status(clock.status(now)),
        ClientMessage::GetSettings => ServerMessage::Settings(clock.settings()),
        ClientMessage::SetSettings(edits) => {
            reply(clock.update_settings(edits, now), ServerMessage::Settings)
        }
    }
}
