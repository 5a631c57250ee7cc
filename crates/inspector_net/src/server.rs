//! The WebSocket gateway.
//!
//! Accepts framed client connections up to the registry's capacity, runs
//! one reader and one writer task per connection, and dispatches parsed
//! frames into the [`RequestHandler`]. Connection synchronization on
//! accept (initial snapshot, config, feature info) is owned by the
//! handler so the core controls the ordering contract.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::messages::Frame;
use crate::session::{Session, SessionRegistry};

/// The core's side of the bus: connect synchronization and request
/// dispatch.
pub trait RequestHandler: Send + Sync + 'static {
    /// Called once per new session, after registration. Implementations
    /// send the initial snapshot, mark the session initialized, then send
    /// config and feature advertisements — in that order.
    fn on_connect(&self, session: &Arc<Session>);

    /// Handle one inbound frame; an optional reply is sent on the
    /// session's queue.
    fn handle(
        &self,
        session: &Arc<Session>,
        frame: Frame,
    ) -> impl Future<Output = Option<Frame>> + Send;
}

/// The accept loop plus lifecycle control.
pub struct InspectorGateway<H> {
    handler: Arc<H>,
    registry: Arc<SessionRegistry>,
    stopped: AtomicBool,
    shutdown: Notify,
}

impl<H: RequestHandler> InspectorGateway<H> {
    #[must_use]
    pub fn new(handler: Arc<H>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            handler,
            registry,
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Bind and serve until [`stop`](Self::stop) is called.
    pub async fn run(self: Arc<Self>, bind: &str, port: u16) -> Result<(), NetError> {
        let listener = TcpListener::bind((bind, port)).await?;
        self.run_on(listener).await
    }

    /// Serve on a pre-bound listener. Useful when the caller needs the
    /// actual local address (ephemeral ports).
    pub async fn run_on(self: Arc<Self>, listener: TcpListener) -> Result<(), NetError> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "inspector gateway listening");
        }

        loop {
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let gateway = self.clone();
                            tokio::spawn(async move {
                                if let Err(e) = gateway.handle_connection(stream, addr.to_string()).await {
                                    debug!(%addr, error = %e, "connection ended with error");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
                () = self.shutdown.notified() => break,
            }
        }

        info!("inspector gateway stopped");
        Ok(())
    }

    /// Stop accepting and drop every session. Idempotent.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::Relaxed) {
            self.shutdown.notify_waiters();
            self.registry.clear();
        }
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: String,
    ) -> Result<(), NetError> {
        let mut ws = tokio_tungstenite::accept_async(stream).await?;

        let (tx, mut rx) = unbounded_channel::<Message>();
        let Some(session) = self.registry.try_register(tx, remote_addr.clone()) else {
            // At capacity: close with a code the client can distinguish
            // from a normal shutdown. No frame is sent.
            info!(%remote_addr, "rejecting connection, gateway at capacity");
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Again,
                    reason: "inspector at capacity".into(),
                }))
                .await;
            return Ok(());
        };

        let (mut write, mut read) = ws.split();

        // Writer: drain the session queue in FIFO order.
        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        info!(session = session.id(), %remote_addr, "client connected");
        self.handler.on_connect(&session);

        while let Some(message) = read.next().await {
            let message = match message {
                Ok(message) => message,
                Err(_) => break,
            };
            match message {
                Message::Text(text) => {
                    session.touch();
                    match Frame::decode(&text) {
                        Ok(frame) => {
                            if let Some(reply) = self.handler.handle(&session, frame).await {
                                let _ = session.send_frame(&reply);
                            }
                        }
                        Err(e) => {
                            let _ = session.send_frame(&Frame::error(e.to_string()));
                        }
                    }
                }
                Message::Ping(_) => {
                    // The protocol layer answers pings; just record life.
                    session.touch();
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        info!(session = session.id(), "client disconnected");
        self.registry.remove(session.id());
        writer.abort();
        Ok(())
    }
}
