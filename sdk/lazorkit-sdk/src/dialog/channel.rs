//! # Signer surface message channel
//!
//! Owns the lifecycle of the surface (embedded frame or window), posts
//! requests to it and routes its replies through the [`RequestCorrelator`].
//! Every inbound event is origin-checked before it is decoded.

use crate::config::{DialogMode, LazorkitConfig};
use crate::core::signer::{SignerSurface, SurfaceKind};
use crate::dialog::correlator::RequestCorrelator;
use crate::dialog::message::{Message, MessageBody, Source};
use crate::dialog::origin::OriginValidator;
use crate::error::ChannelError;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// A message delivered by the host from the signer surface.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Origin reported by the host for the sender
    pub origin: String,
    pub data: serde_json::Value,
}

impl InboundEvent {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub url: String,
    pub mode: DialogMode,
    pub fallback_to_popup: bool,
    pub timeout: Duration,
}

impl From<&LazorkitConfig> for ChannelConfig {
    fn from(config: &LazorkitConfig) -> Self {
        Self {
            url: config.url.clone(),
            mode: config.mode,
            fallback_to_popup: config.fallback_to_popup,
            timeout: config.timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open(SurfaceKind),
    Destroyed,
}

pub struct MessageChannel {
    config: ChannelConfig,
    target_origin: String,
    surface: Arc<dyn SignerSurface>,
    validator: RwLock<OriginValidator>,
    correlator: RequestCorrelator,
    state: Mutex<State>,
    open_lock: tokio::sync::Mutex<()>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
}

impl MessageChannel {
    /// `host_origin` is the embedding page's own origin, which is trusted
    /// alongside the surface URL's origin.
    pub fn new(
        config: ChannelConfig,
        surface: Arc<dyn SignerSurface>,
        host_origin: Option<&str>,
    ) -> Result<Self, ChannelError> {
        let url = Url::parse(&config.url)
            .map_err(|e| ChannelError::InvalidArgument(format!("surface url: {}", e)))?;
        let target_origin = url.origin().ascii_serialization();

        let mut validator = OriginValidator::new(host_origin);
        validator.add_allowed_origin(&target_origin);

        Ok(Self {
            config,
            target_origin,
            surface,
            validator: RwLock::new(validator),
            correlator: RequestCorrelator::new(),
            state: Mutex::new(State::Closed),
            open_lock: tokio::sync::Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }

    pub fn add_allowed_origin(&self, origin: &str) {
        self.validator.write().add_allowed_origin(origin);
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open(_))
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(*self.state.lock(), State::Destroyed)
    }

    /// Kind of the currently open surface
    pub fn surface_kind(&self) -> Option<SurfaceKind> {
        match *self.state.lock() {
            State::Open(kind) => Some(kind),
            _ => None,
        }
    }

    /// Non-response messages from the surface (e.g. `dialog:close`)
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Open the surface. Opening an open channel is a no-op.
    #[tracing::instrument(skip(self), fields(url = %self.config.url))]
    pub async fn open(&self) -> Result<SurfaceKind, ChannelError> {
        let _guard = self.open_lock.lock().await;
        let current = *self.state.lock();
        match current {
            State::Open(kind) => return Ok(kind),
            State::Destroyed => return Err(ChannelError::ChannelClosed),
            State::Closed => {},
        }

        let kind = self.open_surface().await?;

        let destroyed = {
            let mut state = self.state.lock();
            if *state == State::Destroyed {
                true
            } else {
                *state = State::Open(kind);
                false
            }
        };
        if destroyed {
            self.surface.close().await;
            return Err(ChannelError::ChannelClosed);
        }

        tracing::info!("signer surface open as {:?}", kind);
        Ok(kind)
    }

    async fn open_surface(&self) -> Result<SurfaceKind, ChannelError> {
        let embedded_supported = self.surface.supports_embedded();
        let mut kind = match self.config.mode {
            DialogMode::Embedded => SurfaceKind::Embedded,
            DialogMode::Window => SurfaceKind::Window,
            DialogMode::Auto if embedded_supported => SurfaceKind::Embedded,
            DialogMode::Auto => SurfaceKind::Window,
        };

        if kind == SurfaceKind::Embedded && !embedded_supported {
            if !self.config.fallback_to_popup {
                return Err(ChannelError::SurfaceUnavailable(
                    "host cannot embed the signer surface".to_string(),
                ));
            }
            tracing::debug!("embedded surface unsupported, falling back to window");
            kind = SurfaceKind::Window;
        }

        match self.surface.open(kind, &self.config.url).await {
            Ok(()) => Ok(kind),
            Err(reason) if kind == SurfaceKind::Embedded && self.config.fallback_to_popup => {
                tracing::warn!("embedded surface failed ({}), retrying as window", reason);
                self.surface
                    .open(SurfaceKind::Window, &self.config.url)
                    .await
                    .map(|_| SurfaceKind::Window)
                    .map_err(ChannelError::SurfaceUnavailable)
            },
            Err(reason) => Err(ChannelError::SurfaceUnavailable(reason)),
        }
    }

    /// Post `request` and wait for its response with the default timeout
    pub async fn send(&self, request: Message) -> Result<Message, ChannelError> {
        self.send_with_timeout(request, self.config.timeout).await
    }

    #[tracing::instrument(skip(self, request), fields(id = %request.id, kind = request.kind()))]
    pub async fn send_with_timeout(
        &self,
        request: Message,
        timeout: Duration,
    ) -> Result<Message, ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::ChannelClosed);
        }
        let payload = request.encode()?;

        // Registered before posting so a fast reply cannot be missed.
        let handle = self.correlator.register(&request.id, timeout)?;
        if !self.is_open() {
            self.correlator.cancel(&request.id);
            return Err(ChannelError::ChannelClosed);
        }

        if let Err(reason) = self.surface.post(payload, &self.target_origin).await {
            self.correlator.cancel(&request.id);
            if !self.is_open() {
                tracing::debug!("post failed after close: {}", reason);
                return Err(ChannelError::ChannelClosed);
            }
            return Err(ChannelError::SurfaceUnavailable(reason));
        }
        tracing::debug!("request posted");

        handle.wait().await
    }

    /// Route one inbound event. Returns true if it settled a request or
    /// reached subscribers.
    pub fn handle_event(&self, event: InboundEvent) -> bool {
        if self.is_destroyed() {
            return false;
        }
        if !self.validator.read().is_trusted(&event.origin) {
            tracing::debug!("dropping message from untrusted origin {}", event.origin);
            return false;
        }

        let message = match Message::decode(event.data) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("dropping undecodable message: {}", err);
                return false;
            },
        };
        if message.source != Source::Dialog {
            tracing::debug!("ignoring {} from parent", message.kind());
            return false;
        }

        if !message.is_response() {
            if matches!(message.body, MessageBody::Close) {
                self.surface_closed();
            }
            self.notify(message);
            return true;
        }

        let request_id = message.request_id.clone().unwrap_or_default();
        let routed = match message.response_error() {
            Some(error) => self.correlator.reject(
                &request_id,
                ChannelError::SignerError {
                    code: error.code.clone(),
                    message: error.message.clone(),
                },
            ),
            None => self.correlator.resolve(&request_id, message),
        };
        if !routed {
            tracing::debug!("dropping unmatched response for {}", request_id);
        }
        routed
    }

    /// Pump host events until the stream ends or the channel is destroyed
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = inbound.recv().await {
            if self.is_destroyed() {
                break;
            }
            self.handle_event(event);
        }
        tracing::debug!("inbound stream finished");
    }

    /// Close the surface and reject everything pending. The channel can be reopened.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) {
        let was_open = {
            let mut state = self.state.lock();
            if matches!(*state, State::Open(_)) {
                *state = State::Closed;
                true
            } else {
                false
            }
        };

        let rejected = self.correlator.reject_all(ChannelError::ChannelClosed);
        if rejected > 0 {
            tracing::debug!("rejected {} pending requests", rejected);
        }

        if was_open {
            match Message::close_notification(Source::Parent).encode() {
                Ok(value) => {
                    if let Err(reason) = self.surface.post(value, &self.target_origin).await {
                        tracing::warn!("failed to notify surface of close: {}", reason);
                    }
                },
                Err(err) => tracing::warn!("failed to encode close notification: {}", err),
            }
            self.surface.close().await;
            tracing::info!("signer surface closed");
        }
    }

    /// Release everything. Idempotent; the channel cannot be reopened.
    #[tracing::instrument(skip(self))]
    pub async fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Destroyed);
        if previous == State::Destroyed {
            return;
        }

        self.correlator.reject_all(ChannelError::ChannelClosed);
        self.subscribers.lock().clear();
        if let State::Open(_) = previous {
            self.surface.close().await;
        }
        tracing::info!("message channel destroyed");
    }

    /// The surface went away on its own; nothing pending can be answered.
    fn surface_closed(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, State::Open(_)) {
                *state = State::Closed;
            }
        }
        let rejected = self.correlator.reject_all(ChannelError::ChannelClosed);
        tracing::info!("signer surface closed itself, rejected {} pending", rejected);
    }

    fn notify(&self, message: Message) {
        tracing::debug!("forwarding {} to subscribers", message.kind());
        self.subscribers
            .lock()
            .retain(|tx| tx.send(message.clone()).is_ok());
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("config", &self.config)
            .field("target_origin", &self.target_origin)
            .field("state", &*self.state.lock())
            .field("correlator", &self.correlator)
            .finish()
    }
}
