//! Websocket [`LiveChannel`].
//!
//! A driver task owns the socket. `join`/`leave` reach it as commands over an
//! mpsc channel and wait for the frame to be written; server status frames
//! fan out to every [`events`](LiveChannel::events) receiver.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use launchpad_core::{AuthToken, ProjectId, StatusEvent};

use crate::channel::LiveChannel;
use crate::error::LiveError;
use crate::protocol::Frame;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Command {
    Send {
        frame: Frame,
        respond_to: oneshot::Sender<Result<(), LiveError>>,
    },
    Close {
        respond_to: oneshot::Sender<()>,
    },
}

/// Handle to a connected live channel. Cheap to share behind an `Arc`.
///
/// Dropping the last handle closes the command channel, which makes the
/// driver send a close frame and exit.
#[derive(Debug, Clone)]
pub struct WsChannel {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<StatusEvent>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Send { frame, .. } => f.debug_struct("Send").field("frame", frame).finish(),
            Command::Close { .. } => f.write_str("Close"),
        }
    }
}

impl WsChannel {
    /// Connect to `url`, sending `token` as a bearer `Authorization` header.
    pub async fn connect(url: &str, token: Option<&AuthToken>) -> Result<Self, LiveError> {
        let connect_err = |reason: String| LiveError::Connect {
            url: url.to_string(),
            reason,
        };

        let mut request = url
            .into_client_request()
            .map_err(|e| connect_err(e.to_string()))?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|e| connect_err(format!("invalid token header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        tracing::debug!(url, "connecting to live channel");
        let (socket, _) = connect_async(request)
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        tracing::info!(url, "live channel connected");

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        tokio::spawn(drive(socket, command_rx, event_tx.clone()));

        Ok(Self {
            commands: command_tx,
            events: event_tx,
        })
    }

    /// Send a close frame and stop the driver. Later joins fail with
    /// [`LiveError::ChannelClosed`].
    pub async fn close(&self) {
        let (respond_to, done) = oneshot::channel();
        if self.commands.send(Command::Close { respond_to }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), LiveError> {
        let (respond_to, reply) = oneshot::channel();
        self.commands
            .send(Command::Send { frame, respond_to })
            .await
            .map_err(|_| LiveError::ChannelClosed("live driver"))?;
        reply
            .await
            .map_err(|_| LiveError::ChannelClosed("live driver reply"))?
    }
}

#[async_trait]
impl LiveChannel for WsChannel {
    async fn join(&self, project: &ProjectId) -> Result<(), LiveError> {
        self.send_frame(Frame::Join {
            project_id: project.clone(),
        })
        .await
    }

    async fn leave(&self, project: &ProjectId) -> Result<(), LiveError> {
        self.send_frame(Frame::Leave {
            project_id: project.clone(),
        })
        .await
    }

    fn events(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }
}

async fn drive(
    socket: Socket,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<StatusEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send { frame, respond_to }) => {
                    let result = match frame.encode() {
                        Ok(text) => sink.send(Message::Text(text)).await.map_err(LiveError::from),
                        Err(err) => Err(LiveError::from(err)),
                    };
                    let _ = respond_to.send(result);
                }
                Some(Command::Close { respond_to }) => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = respond_to.send(());
                    break;
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch(&text, &events),
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("live channel closed by server");
                    break;
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "live channel read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

fn dispatch(text: &str, events: &broadcast::Sender<StatusEvent>) {
    match Frame::decode(text) {
        Ok(frame) => match frame.into_event() {
            Some(event) => {
                tracing::debug!(project = %event.project_id, status = %event.status, "status frame");
                let _ = events.send(event);
            }
            None => tracing::debug!(frame = text, "ignoring non-status frame"),
        },
        Err(err) => tracing::debug!(error = %err, frame = text, "ignoring undecodable frame"),
    }
}
