//! Robolink session
//!
//! Composes the command and video channels, owns the connect/disconnect
//! lifecycle and the drive state, and delivers everything inbound to the
//! consumer over a single event channel.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex, RwLock};

use super::command::{CommandWriter, RECV_CHUNK_LEN};
use super::video::read_frame;
use super::Endpoints;
use crate::protocol::{Direction, DriveState, Mode};

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Already connected")]
    AlreadyConnected,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events emitted by the session
///
/// The consumer owns all rendering and timestamping; the session never
/// formats for display.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Both channels attempted; the session is usable. `video_addr` is
    /// `None` when the video channel could not be opened (degraded,
    /// command-only operation).
    Connected {
        command_addr: SocketAddr,
        video_addr: Option<SocketAddr>,
    },
    /// The session is fully closed
    Disconnected { reason: String },
    /// Raw text chunk received on the command channel
    LogLine(String),
    /// One decoded video frame; ownership transfers to the consumer
    VideoFrame(Bytes),
    /// Non-fatal error worth reporting
    Error { message: String },
}

/// Shared connection state for one connect attempt.
///
/// The drive state is NOT here: it is mutated only by the foreground
/// `Session` methods. Background loops read the open flags and nothing
/// else.
struct Link {
    state: Arc<RwLock<SessionState>>,
    command_open: AtomicBool,
    video_open: AtomicBool,
    writer: Mutex<Option<CommandWriter<OwnedWriteHalf>>>,
    event_tx: mpsc::Sender<SessionEvent>,
    shutdown_tx: watch::Sender<bool>,
    torn_down: AtomicBool,
}

impl Link {
    fn command_open(&self) -> bool {
        self.command_open.load(Ordering::SeqCst)
    }

    fn video_open(&self) -> bool {
        self.video_open.load(Ordering::SeqCst)
    }

    /// Close both channels. Idempotent; later calls are no-ops.
    async fn teardown(&self, reason: &str) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        // Invariant: video is never open while command is closed, so
        // video clears first
        self.video_open.store(false, Ordering::SeqCst);
        self.command_open.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }

        *self.state.write().await = SessionState::Disconnected;

        tracing::info!(reason, "session closed");
        let _ = self
            .event_tx
            .send(SessionEvent::Disconnected { reason: reason.to_string() })
            .await;
    }
}

/// A driving session against one robot
pub struct Session {
    /// Where to reach the robot
    endpoints: Endpoints,
    /// Current mode/sub-mode/power/button state
    drive: DriveState,
    /// Current state, shared with the background loops
    state: Arc<RwLock<SessionState>>,
    /// Event sender
    event_tx: mpsc::Sender<SessionEvent>,
    /// Event receiver (for the consumer)
    event_rx: Option<mpsc::Receiver<SessionEvent>>,
    /// Live connection, if any
    link: Option<Arc<Link>>,
}

impl Session {
    /// Create a new session (not yet connected)
    pub fn new(endpoints: Endpoints) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);

        Self {
            endpoints,
            drive: DriveState::default(),
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            event_tx,
            event_rx: Some(event_rx),
            link: None,
        }
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.event_rx.take()
    }

    /// Get the current state
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == SessionState::Connected
    }

    /// Check if the video channel is up
    pub fn has_video(&self) -> bool {
        self.link.as_ref().map(|l| l.video_open()).unwrap_or(false)
    }

    /// Current drive state
    pub fn drive(&self) -> &DriveState {
        &self.drive
    }

    /// Connect both channels and start the background loops.
    ///
    /// The command stream opens first; if it fails the session stays
    /// `Disconnected` and the error is returned. A video failure is not
    /// fatal: the session comes up in command-only operation.
    pub async fn connect(&mut self) -> SessionResult<()> {
        {
            let state = self.state.read().await;
            if *state != SessionState::Disconnected {
                return Err(SessionError::AlreadyConnected);
            }
        }

        {
            let mut state = self.state.write().await;
            *state = SessionState::Connecting;
        }

        let (command_addr, command_stream) = match self.open_command().await {
            Ok(opened) => opened,
            Err(e) => {
                let mut state = self.state.write().await;
                *state = SessionState::Disconnected;
                return Err(e);
            }
        };

        // Video is best-effort: a robot without a camera service is
        // still drivable
        let video_stream = match self.open_video().await {
            Ok(opened) => Some(opened),
            Err(e) => {
                tracing::warn!(error = %e, "video channel unavailable, continuing command-only");
                let _ = self
                    .event_tx
                    .send(SessionEvent::Error {
                        message: format!("video connect failed: {}", e),
                    })
                    .await;
                None
            }
        };
        let video_addr = video_stream.as_ref().map(|(addr, _)| *addr);

        let (command_read, command_write) = command_stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let link = Arc::new(Link {
            state: self.state.clone(),
            command_open: AtomicBool::new(true),
            video_open: AtomicBool::new(video_stream.is_some()),
            writer: Mutex::new(Some(CommandWriter::new(command_write))),
            event_tx: self.event_tx.clone(),
            shutdown_tx,
            torn_down: AtomicBool::new(false),
        });

        spawn_command_loop(link.clone(), command_read, shutdown_rx.clone());
        if let Some((_, stream)) = video_stream {
            spawn_video_loop(link.clone(), stream, shutdown_rx);
        }

        {
            let mut state = self.state.write().await;
            *state = SessionState::Connected;
        }
        self.link = Some(link);

        tracing::info!(%command_addr, ?video_addr, "session connected");
        let _ = self
            .event_tx
            .send(SessionEvent::Connected { command_addr, video_addr })
            .await;

        // Announce the reset default state to the robot
        self.drive = DriveState::default();
        self.send_current().await;

        Ok(())
    }

    async fn open_command(&self) -> SessionResult<(SocketAddr, TcpStream)> {
        let addr = self.endpoints.resolve_command().await?;
        tracing::debug!(%addr, "connecting command channel");
        Ok((addr, TcpStream::connect(addr).await?))
    }

    async fn open_video(&self) -> SessionResult<(SocketAddr, TcpStream)> {
        let addr = self.endpoints.resolve_video().await?;
        tracing::debug!(%addr, "connecting video channel");
        Ok((addr, TcpStream::connect(addr).await?))
    }

    /// Disconnect both channels. Idempotent; never an error.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.teardown("client disconnect").await;
        }
    }

    /// Switch mode. Resets the sub-mode and sends immediately.
    pub async fn set_mode(&mut self, mode: Mode) {
        if !self.is_connected().await {
            return;
        }
        self.drive.set_mode(mode);
        self.send_current().await;
    }

    /// Select a behavior variant within the current autonomous mode
    /// (color search, figure number). In manual mode the sub-mode is
    /// owned by the direction buttons.
    pub async fn set_sub_mode(&mut self, sub_mode: u8) {
        if !self.is_connected().await || self.drive.mode.is_manual() {
            return;
        }
        self.drive.sub_mode = sub_mode;
        self.send_current().await;
    }

    /// Press a direction button (manual mode only)
    pub async fn press_direction(&mut self, direction: Direction) {
        if !self.is_connected().await || !self.drive.mode.is_manual() {
            return;
        }
        self.drive.sub_mode = direction.sub_mode();
        self.drive.button_pressed = true;
        self.send_current().await;
    }

    /// Release the direction button (manual mode only). A release with
    /// the button already up sends nothing.
    pub async fn release_direction(&mut self) {
        if !self.is_connected().await || !self.drive.mode.is_manual() {
            return;
        }
        if !self.drive.button_pressed {
            return;
        }
        self.drive.button_pressed = false;
        self.send_current().await;
    }

    /// Update the power setting used by subsequent sends. Does not send
    /// by itself; the value rides along with the next direction event.
    pub fn set_power(&mut self, power: u8) {
        self.drive.set_power(power);
    }

    /// Send the command line for the current drive state.
    ///
    /// A silent no-op when not connected. A write failure tears the
    /// whole session down and is reported through events only.
    async fn send_current(&mut self) {
        let Some(link) = self.link.clone() else {
            return;
        };
        if !link.command_open() {
            return;
        }

        let line = self.drive.command();
        let mut guard = link.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return;
        };

        match writer.send(&line).await {
            Ok(()) => tracing::debug!(command = %line, "command sent"),
            Err(e) => {
                // Teardown takes the writer lock itself
                drop(guard);
                let reason = format!("command send failed: {}", e);
                tracing::warn!("{}", reason);
                let _ = link
                    .event_tx
                    .send(SessionEvent::Error { message: reason.clone() })
                    .await;
                link.teardown(&reason).await;
            }
        }
    }
}

/// Background receive loop for the command channel.
///
/// Forwards raw chunks as log lines. Send and receive share a fate:
/// any command-path failure ends the whole session.
fn spawn_command_loop(
    link: Arc<Link>,
    mut reader: OwnedReadHalf,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut buf = [0u8; RECV_CHUNK_LEN];
        let reason = loop {
            if !link.command_open() {
                break "disconnect requested".to_string();
            }
            tokio::select! {
                result = reader.read(&mut buf) => match result {
                    Ok(0) => break "command stream closed by peer".to_string(),
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if link.event_tx.send(SessionEvent::LogLine(chunk)).await.is_err() {
                            break "event consumer dropped".to_string();
                        }
                    }
                    Err(e) => break format!("command read error: {}", e),
                },
                _ = shutdown.changed() => break "disconnect requested".to_string(),
            }
        };
        link.teardown(&reason).await;
    });
}

/// Background frame loop for the video channel.
///
/// Decoded frames queue on the event channel in decode order; a slow
/// consumer delays delivery, not decoding. Losing video does not touch
/// the command channel.
fn spawn_video_loop(link: Arc<Link>, mut stream: TcpStream, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        loop {
            if !link.video_open() {
                break;
            }
            tokio::select! {
                result = read_frame(&mut stream) => match result {
                    Ok(frame) => {
                        tracing::trace!(len = frame.len(), "video frame");
                        if link.event_tx.send(SessionEvent::VideoFrame(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) if e.is_clean_close() => {
                        tracing::info!("video stream closed by peer");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "video channel error");
                        break;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
        link.video_open.store(false, Ordering::SeqCst);
    });
}
