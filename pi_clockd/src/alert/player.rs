use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};
use rodio::{Decoder, Sink, Source};

use super::{Alert, AlertSound};
use crate::error::{Error, Result};

#[derive(Debug)]
enum PlayerCommand {
    Play { path: PathBuf, volume: u8 },
    Stop,
    Shutdown,
}

/// Plays sound files on the default output device.
///
/// The output stream cannot leave the thread that opened it, so playback runs
/// on its own thread and is driven over a channel.
#[derive(Debug)]
pub struct PlayerAlert {
    commands: Sender<PlayerCommand>,
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PlayerAlert {
    /// Starts the audio thread, failing if there is no output device.
    pub fn spawn() -> Result<Self> {
        let (commands, receiver) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let active = Arc::new(AtomicBool::new(false));
        let thread_active = Arc::clone(&active);

        let worker = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || audio_loop(&receiver, &ready_tx, &thread_active))
            .map_err(|e| Error::Alert(format!("couldn't start audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                active,
                worker: Some(worker),
            }),
            Ok(Err(message)) => Err(Error::Alert(message)),
            Err(_) => Err(Error::Alert("audio thread exited".to_string())),
        }
    }
}

impl Alert for PlayerAlert {
    fn start(&mut self, sound: &AlertSound) -> Result<()> {
        let path = sound
            .path
            .clone()
            .ok_or_else(|| Error::Alert("no sound file configured".to_string()))?;
        self.active.store(true, Ordering::SeqCst);
        self.commands
            .send(PlayerCommand::Play {
                path,
                volume: sound.volume,
            })
            .map_err(|_| {
                self.active.store(false, Ordering::SeqCst);
                Error::Alert("audio thread is gone".to_string())
            })
    }

    fn stop(&mut self) {
        if self.commands.send(PlayerCommand::Stop).is_err() {
            warn!("audio thread is gone");
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&mut self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for PlayerAlert {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("audio thread panicked");
            }
        }
    }
}

fn audio_loop(
    commands: &Receiver<PlayerCommand>,
    ready: &Sender<std::result::Result<(), String>>,
    active: &AtomicBool,
) {
    let stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(format!("couldn't open audio output: {e}")));
            return;
        }
    };
    let mut sink: Option<Sink> = None;

    loop {
        match commands.recv_timeout(Duration::from_millis(250)) {
            Ok(PlayerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => handle_command(command, &mut sink, active, |path, volume| {
                let source = open_sound(path)?;
                // create source that repeatedly plays the sound at the specified volume
                let new_sink = Sink::connect_new(stream.mixer());
                new_sink.set_volume(f32::from(volume) / 100.0);
                new_sink.append(source.repeat_infinite());
                new_sink.play();
                Ok(new_sink)
            }),
            Err(RecvTimeoutError::Timeout) => {
                if sink.as_ref().is_some_and(Playback::finished) {
                    sink = None;
                    active.store(false, Ordering::SeqCst);
                }
            }
        }
    }
    active.store(false, Ordering::SeqCst);
}

/// A sound being played by the audio thread.
trait Playback {
    fn halt(self);
    fn finished(&self) -> bool;
}

impl Playback for Sink {
    fn halt(self) {
        self.stop();
    }

    fn finished(&self) -> bool {
        self.empty()
    }
}

/// Applies a `Play` or `Stop` to the current playback. `active` follows the
/// order commands are handled in, so a queued `Stop` cannot clear the flag of
/// a `Play` sent after it.
fn handle_command<P: Playback>(
    command: PlayerCommand,
    current: &mut Option<P>,
    active: &AtomicBool,
    play: impl FnOnce(&Path, u8) -> Result<P>,
) {
    match command {
        PlayerCommand::Play { path, volume } => {
            if let Some(old) = current.take() {
                old.halt();
            }
            match play(&path, volume) {
                Ok(playback) => {
                    info!("playing {} at volume {volume}", path.display());
                    *current = Some(playback);
                    active.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    error!("{e}");
                    active.store(false, Ordering::SeqCst);
                }
            }
        }
        PlayerCommand::Stop => {
            if let Some(old) = current.take() {
                old.halt();
            }
            active.store(false, Ordering::SeqCst);
        }
        // the audio loop exits before handing this over
        PlayerCommand::Shutdown => {}
    }
}

fn open_sound(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::file(path, e))?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Alert(format!("couldn't decode {}: {e}", path.display())))
}
