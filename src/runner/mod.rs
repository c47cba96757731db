//! External command execution.
//!
//! The child runs with piped output; a background thread reads it line by
//! line and posts [`RunEvent`]s on a channel. The UI thread drains the
//! channel without blocking, so it stays the only writer of display state.
//!
//! ```no_run
//! use lieutenant::runner::{spawn, RunEvent, RunOptions};
//!
//! let handle = spawn(&["terraform".into(), "plan".into()], RunOptions::attached());
//! while let Some(event) = handle.recv() {
//!     match event {
//!         RunEvent::Line(line) => println!("{}", line),
//!         RunEvent::Finished(Err(failure)) => println!("{}", failure),
//!         RunEvent::Finished(Ok(())) => {}
//!     }
//! }
//! ```

mod resolve;

pub use resolve::resolve_argv;

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::error::CommandFailure;

/// Progress of a running command
#[derive(Debug)]
pub enum RunEvent {
    /// One output line, without its line terminator
    Line(String),
    /// The command is done; always the last event
    Finished(Result<(), CommandFailure>),
}

/// How the child is wired to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Read stderr into the event stream too (otherwise inherit it)
    pub capture_stderr: bool,
    /// Give the child our stdin (otherwise `/dev/null`)
    pub inherit_stdin: bool,
}

impl RunOptions {
    /// For a full-screen UI: everything goes through the channel, no stdin
    pub fn detached() -> Self {
        Self {
            capture_stderr: true,
            inherit_stdin: false,
        }
    }

    /// For plain streaming: stderr and stdin stay on the terminal
    pub fn attached() -> Self {
        Self {
            capture_stderr: false,
            inherit_stdin: true,
        }
    }
}

/// Receiving end of a running command
pub struct RunHandle {
    command: String,
    receiver: Receiver<RunEvent>,
}

impl RunHandle {
    /// The command line as shown in messages
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Next event if one is ready. `None` once the stream is exhausted too.
    pub fn try_recv(&self) -> Option<RunEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next event; `None` after [`RunEvent::Finished`]
    pub fn recv(&self) -> Option<RunEvent> {
        self.receiver.recv().ok()
    }
}

/// Start `argv` (program followed by arguments) in the background.
///
/// Launch failures are reported through the returned handle as a
/// `Finished(Err(..))` event, like any other failure.
pub fn spawn(argv: &[String], options: RunOptions) -> RunHandle {
    let (tx, rx) = mpsc::channel();
    let command = shell_words::join(argv);
    let handle = RunHandle {
        command: command.clone(),
        receiver: rx,
    };

    let Some((program, args)) = argv.split_first() else {
        let _ = tx.send(RunEvent::Finished(Err(CommandFailure::Resolve(
            "no command given".to_string(),
        ))));
        return handle;
    };

    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::piped());
    cmd.stdin(if options.inherit_stdin {
        Stdio::inherit()
    } else {
        Stdio::null()
    });
    cmd.stderr(if options.capture_stderr {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            tracing::warn!("failed to launch {}: {}", command, source);
            let _ = tx.send(RunEvent::Finished(Err(CommandFailure::Launch {
                command,
                source,
            })));
            return handle;
        }
    };
    tracing::info!("started {} (pid {})", command, child.id());

    let stderr_reader = child
        .stderr
        .take()
        .map(|stderr| spawn_line_reader(stderr, tx.clone()));
    let stdout = child.stdout.take();

    thread::spawn(move || {
        if let Some(stdout) = stdout {
            read_lines(stdout, &tx);
        }
        if let Some(reader) = stderr_reader {
            let _ = reader.join();
        }

        let outcome = match child.wait() {
            Ok(status) => check_status(&command, status),
            Err(source) => Err(CommandFailure::Launch { command, source }),
        };
        if let Err(ref failure) = outcome {
            tracing::warn!("{}", failure);
        }
        let _ = tx.send(RunEvent::Finished(outcome));
    });

    handle
}

/// Exit code to hand back to the shell for a finished command
pub fn exit_code(outcome: &Result<(), CommandFailure>) -> i32 {
    match outcome {
        Ok(()) => 0,
        Err(CommandFailure::Exited { code, .. }) => *code,
        Err(CommandFailure::Launch { .. }) => 127,
        Err(_) => 1,
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), CommandFailure> {
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(CommandFailure::Exited {
            command: command.to_string(),
            code,
        }),
        None => Err(CommandFailure::Killed {
            command: command.to_string(),
        }),
    }
}

fn spawn_line_reader(stream: impl Read + Send + 'static, tx: Sender<RunEvent>) -> JoinHandle<()> {
    thread::spawn(move || read_lines(stream, &tx))
}

/// Forward every line of `stream` until end of stream or a read error
fn read_lines(stream: impl Read, tx: &Sender<RunEvent>) {
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                // One terminator only: "\n" or "\r\n"
                if buffer.last() == Some(&b'\n') {
                    buffer.pop();
                    if buffer.last() == Some(&b'\r') {
                        buffer.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buffer).into_owned();
                if tx.send(RunEvent::Line(line)).is_err() {
                    // Receiver gone; nobody is listening any more
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("output read error: {}", e);
                break;
            }
        }
    }
}
