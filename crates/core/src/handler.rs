use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Outbound side of one connection. Handlers reply through this seam so the
/// read path never needs to know what transport the connection runs over.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Queue one outbound JSON text frame on the originating connection.
    async fn send(&self, frame: String) -> Result<()>;
}

/// One handler per registered event kind. Registration happens once at
/// startup; a registered handler is always callable.
///
/// The payload arrives undecoded — each handler knows its own payload shape
/// and decodes it, so a shape mismatch is contained at the dispatch boundary
/// like any other handler failure.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: Value, reply: &dyn ReplySink) -> Result<()>;
}

/// Capability seam for unique-id generation. Raw record ids come from here
/// at write time, never from client input.
pub trait IdSource: Send + Sync {
    fn new_id(&self) -> String;
}

/// Default id source: random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
