use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::debug;
use uci::{Decoder, Encoder, EngineMessage, GoParams, Info, Position, UciCommand};

use super::{Engine, EngineError, EngineFactory, SearchOutcome};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_TIMEOUT: Duration = Duration::from_millis(300);
const QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a fresh engine process per `open`.
pub struct ProcessFactory;

impl EngineFactory for ProcessFactory {
    type Engine = UciProcess;

    fn open(&self, name: &str) -> Result<UciProcess, EngineError> {
        UciProcess::spawn(name)
    }
}

/// An external engine speaking UCI over stdin/stdout.
///
/// A reader thread forwards stdout line by line into a channel so every read
/// can wait against a deadline instead of blocking on the pipe.
pub struct UciProcess {
    name: String,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    lines: Receiver<String>,
    encoder: Encoder,
    decoder: Decoder,
    // Set when a search was abandoned; its bestmove may still be in flight.
    out_of_sync: bool,
}

impl UciProcess {
    pub fn spawn(name: &str) -> Result<Self, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            name: name.to_string(),
            source,
        };

        let mut child = Command::new(name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Protocol {
                name: name.to_string(),
                message: "engine pipes unavailable".to_string(),
            });
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = thread::Builder::new()
            .name(format!("{}-stdout", name))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(e));
        }

        let mut process = Self {
            name: name.to_string(),
            child,
            stdin: BufWriter::new(stdin),
            lines: rx,
            encoder: Encoder {},
            decoder: Decoder::new(),
            out_of_sync: false,
        };
        process.handshake(Instant::now() + STARTUP_TIMEOUT)?;

        Ok(process)
    }

    fn handshake(&mut self, deadline: Instant) -> Result<(), EngineError> {
        self.send(&UciCommand::Uci)?;
        while self.recv(deadline, "uciok")? != EngineMessage::UciOk {}
        self.sync_ready(deadline)
    }

    fn send(&mut self, command: &UciCommand) -> Result<(), EngineError> {
        let line = self.encoder.encode(command);
        debug!("{} <- {}", self.name, line);

        writeln!(self.stdin, "{}", line)
            .and_then(|_| self.stdin.flush())
            .map_err(|source| EngineError::Io {
                name: self.name.clone(),
                source,
            })
    }

    fn recv(
        &mut self,
        deadline: Instant,
        waiting_for: &'static str,
    ) -> Result<EngineMessage, EngineError> {
        match self.lines.recv_deadline(deadline) {
            Ok(line) => {
                debug!("{} -> {}", self.name, line);
                Ok(self.decoder.decode(&line))
            }
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout {
                name: self.name.clone(),
                waiting_for,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Exited {
                name: self.name.clone(),
            }),
        }
    }

    fn sync_ready(&mut self, deadline: Instant) -> Result<(), EngineError> {
        self.send(&UciCommand::IsReady)?;
        while self.recv(deadline, "readyok")? != EngineMessage::ReadyOk {}
        Ok(())
    }

    /// Stops an abandoned search and drains its output up to `readyok`.
    fn resync(&mut self, deadline: Instant) -> Result<(), EngineError> {
        if self.out_of_sync {
            self.send(&UciCommand::Stop)?;
            self.sync_ready(deadline)?;
            self.out_of_sync = false;
        }
        Ok(())
    }
}

impl Engine for UciProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_option(
        &mut self,
        name: &str,
        value: &str,
        deadline: Instant,
    ) -> Result<(), EngineError> {
        self.resync(deadline)?;
        self.send(&UciCommand::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        })?;
        self.sync_ready(deadline)
    }

    fn new_game(&mut self, deadline: Instant) -> Result<(), EngineError> {
        self.resync(deadline)?;
        self.send(&UciCommand::UciNewGame)?;
        self.sync_ready(deadline)
    }

    fn set_position(&mut self, position: &Position, deadline: Instant) -> Result<(), EngineError> {
        self.resync(deadline)?;
        self.send(&UciCommand::Position(position.clone()))
    }

    fn go(&mut self, params: &GoParams) -> Result<(), EngineError> {
        self.send(&UciCommand::Go(params.clone()))?;
        // Cleared again once bestmove arrives.
        self.out_of_sync = true;
        Ok(())
    }

    fn wait(
        &mut self,
        deadline: Instant,
        on_info: &mut dyn FnMut(&Info),
    ) -> Result<SearchOutcome, EngineError> {
        let mut outcome = SearchOutcome::default();
        loop {
            match self.recv(deadline, "bestmove")? {
                EngineMessage::Info(info) => {
                    outcome.observe(&info);
                    on_info(&info);
                }
                EngineMessage::BestMove(best_move) => {
                    self.out_of_sync = false;
                    outcome.best_move = best_move;
                    return Ok(outcome);
                }
                _ => {}
            }
        }
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        // Ask politely first, then force kill
        let _ = self.send(&UciCommand::Quit);

        let deadline = Instant::now() + QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            thread::sleep(QUIT_POLL_INTERVAL);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
