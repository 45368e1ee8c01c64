//! Engine session.
//!
//! A session owns the [`Reviewer`] on a single tokio task. Engine output,
//! control requests and configuration changes all arrive on that task
//! through channels, so the review state is only ever touched there.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};
use uci::{EngineMessage, GuiCommand};

use crate::config::{ConfigHandle, ReviewConfig};
use crate::engine::EngineError;
use crate::error::ReviewError;
use crate::review::Reviewer;
use crate::sink::PresentationSink;

const CHANNEL_CAPACITY: usize = 100;

/// Line-based connection to a UCI engine.
pub struct EngineTransport {
    commands: mpsc::Sender<String>,
    lines: mpsc::Receiver<String>,
    child: Option<Child>,
}

impl EngineTransport {
    /// Spawns the engine. `command` may carry arguments after the path.
    pub async fn spawn(command: &str) -> Result<Self, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            path: command.to_string(),
            source,
        };
        let parts: Vec<&str> = command.split_whitespace().collect();
        let (program, args) = parts.split_first().ok_or_else(|| {
            spawn_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"))
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let mut stdin = child.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = child.stdout.take().ok_or(EngineError::Closed)?;

        let (command_tx, mut command_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                if stdin.write_all(cmd.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let (line_tx, line_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        info!(command, "engine started");
        Ok(Self {
            commands: command_tx,
            lines: line_rx,
            child: Some(child),
        })
    }

    /// A transport over plain channels, for engines that are not processes.
    pub fn from_channels(commands: mpsc::Sender<String>, lines: mpsc::Receiver<String>) -> Self {
        Self {
            commands,
            lines,
            child: None,
        }
    }

    async fn close(mut self) {
        if let Some(mut child) = self.child.take() {
            // Give it a moment to exit after `quit`.
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = child.kill().await;
        }
    }
}

/// Where a played move left the review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveAck {
    pub ply: i32,
    pub san: String,
    /// No search was requested because the game is over.
    pub game_over: bool,
}

enum Request {
    Play {
        lan: String,
        reply: oneshot::Sender<Result<MoveAck, ReviewError>>,
    },
    Select {
        ply: i32,
        reply: oneshot::Sender<bool>,
    },
    NewGame {
        moves: Vec<String>,
        reply: oneshot::Sender<Result<(), ReviewError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Control surface of a running session.
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    task: JoinHandle<Result<(), ReviewError>>,
}

impl SessionHandle {
    /// Plays `lan` after the last move.
    pub async fn play(&self, lan: &str) -> Result<MoveAck, ReviewError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Play {
            lan: lan.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Navigates to `ply`. Returns false when there is no such ply.
    pub async fn select(&self, ply: i32) -> Result<bool, ReviewError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Select { ply, reply }).await?;
        Ok(rx.await.map_err(|_| EngineError::Closed)?)
    }

    /// Loads a game given as LAN moves.
    pub async fn new_game(&self, moves: Vec<String>) -> Result<(), ReviewError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::NewGame { moves, reply }).await?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Quits the engine and waits for the session to end.
    pub async fn shutdown(self) -> Result<(), ReviewError> {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
        self.task.await.map_err(|_| EngineError::Closed)?
    }

    async fn request(&self, request: Request) -> Result<(), EngineError> {
        self.requests.send(request).await.map_err(|_| EngineError::Closed)
    }
}

/// Starts a session on its own task.
pub fn start_session(
    reviewer: Reviewer,
    transport: EngineTransport,
    config: &ConfigHandle,
    sink: Box<dyn PresentationSink + Send>,
) -> SessionHandle {
    let (requests, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let session = Session {
        reviewer,
        transport,
        requests: request_rx,
        config: config.subscribe(),
        sink,
    };

    SessionHandle {
        requests,
        task: tokio::spawn(session.run()),
    }
}

/// Spawns the configured engine and starts a session with the default rules
/// and opening book.
pub async fn spawn_session(
    config: &ConfigHandle,
    sink: Box<dyn PresentationSink + Send>,
) -> Result<SessionHandle, ReviewError> {
    let snapshot = config.get();
    let reviewer = Reviewer::with_defaults(&snapshot)?;
    let transport = EngineTransport::spawn(&snapshot.engine_path).await?;
    Ok(start_session(reviewer, transport, config, sink))
}

struct Session {
    reviewer: Reviewer,
    transport: EngineTransport,
    requests: mpsc::Receiver<Request>,
    config: watch::Receiver<ReviewConfig>,
    sink: Box<dyn PresentationSink + Send>,
}

impl Session {
    async fn run(mut self) -> Result<(), ReviewError> {
        let commands = self.reviewer.start();
        send_all(&self.transport.commands, commands).await?;

        let mut config_open = true;
        let result = loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown { reply }) => {
                        let _ = reply.send(());
                        break Ok(());
                    }
                    Some(request) => {
                        if let Err(err) = self.handle_request(request).await {
                            break Err(err);
                        }
                    }
                    None => break Ok(()),
                },
                line = self.transport.lines.recv() => match line {
                    Some(line) => {
                        trace!(%line, "<-");
                        let message = EngineMessage::parse(&line);
                        let commands = self.reviewer.on_engine_message(&message, self.sink.as_mut());
                        if let Err(err) = send_all(&self.transport.commands, commands).await {
                            break Err(err.into());
                        }
                    }
                    None => {
                        error!("engine closed its output");
                        break Err(EngineError::Closed.into());
                    }
                },
                changed = self.config.changed(), if config_open => {
                    if changed.is_err() {
                        config_open = false;
                        continue;
                    }
                    let config = self.config.borrow_and_update().clone();
                    debug!("configuration changed");
                    let commands = self.reviewer.apply_config(&config);
                    if let Err(err) = send_all(&self.transport.commands, commands).await {
                        break Err(err.into());
                    }
                }
            }
        };

        let commands = self.reviewer.quit();
        // The engine may already be gone.
        let _ = send_all(&self.transport.commands, commands).await;
        self.transport.close().await;
        result
    }

    async fn handle_request(&mut self, request: Request) -> Result<(), ReviewError> {
        match request {
            Request::Play { lan, reply } => match self.reviewer.on_move(&lan) {
                Ok(commands) => {
                    send_all(&self.transport.commands, commands).await?;
                    let line = self.reviewer.position().current_line();
                    let _ = reply.send(Ok(MoveAck {
                        ply: self.reviewer.position().last_ply(),
                        san: line.san().to_string(),
                        game_over: line.is_game_over(),
                    }));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
            Request::Select { ply, reply } => {
                let commands = self.reviewer.on_select_node(ply, self.sink.as_mut());
                let found = commands.is_some();
                send_all(&self.transport.commands, commands.unwrap_or_default()).await?;
                let _ = reply.send(found);
            }
            Request::NewGame { moves, reply } => match self.reviewer.on_new_game(&moves) {
                Ok(commands) => {
                    send_all(&self.transport.commands, commands).await?;
                    let _ = reply.send(Ok(()));
                }
                Err(err) => {
                    let _ = reply.send(Err(err.into()));
                }
            },
            Request::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
        Ok(())
    }
}

async fn send_all(engine: &mpsc::Sender<String>, commands: Vec<GuiCommand>) -> Result<(), EngineError> {
    for command in commands {
        let line = command.to_uci();
        trace!(%line, "->");
        engine.send(line).await.map_err(|err| EngineError::Send(err.0))?;
    }
    Ok(())
}
