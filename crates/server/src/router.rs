use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use meterhub_core::{ErrorReply, EventHandler, EventKind, InboundEnvelope, ReplySink};

/// Kind-keyed dispatch table, built once at startup and immutable after.
///
/// Registration takes an `Arc<dyn EventHandler>`, so every registered entry
/// is callable; there is no dynamic lookup that can yield something else.
pub struct EventRouter {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

pub struct EventRouterBuilder {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventRouterBuilder {
    /// Bind one handler for a kind. Binding the same kind again replaces
    /// the earlier handler.
    pub fn register(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn build(self) -> EventRouter {
        EventRouter {
            handlers: self.handlers,
        }
    }
}

impl EventRouter {
    pub fn builder() -> EventRouterBuilder {
        EventRouterBuilder {
            handlers: HashMap::new(),
        }
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route one inbound envelope.
    ///
    /// Protocol errors (unknown or unregistered type) are answered with a
    /// best-effort error reply and never escape. Handler failures are logged
    /// and swallowed — inbound handlers owe no reply.
    pub async fn dispatch(&self, envelope: InboundEnvelope, reply: &dyn ReplySink) {
        let Some(kind) = EventKind::parse(&envelope.kind) else {
            warn!(kind = %envelope.kind, "unknown event type");
            send_error_reply(reply, format!("unknown event type: {}", envelope.kind)).await;
            return;
        };

        let Some(handler) = self.handlers.get(&kind) else {
            warn!(%kind, "no handler registered for event type");
            send_error_reply(reply, format!("no handler for event type: {kind}")).await;
            return;
        };

        debug!(%kind, "dispatching event");
        if let Err(error) = handler.handle(envelope.payload, reply).await {
            warn!(%kind, %error, "event handler failed");
        }
    }
}

/// Best-effort error reply. A failure to deliver it leaves nothing else to
/// do and is only traced.
pub(crate) async fn send_error_reply(reply: &dyn ReplySink, message: String) {
    let frame = match serde_json::to_string(&ErrorReply { error: message }) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(%error, "failed to encode error reply");
            return;
        }
    };
    if let Err(error) = reply.send(frame).await {
        debug!(%error, "error reply could not be delivered");
    }
}
