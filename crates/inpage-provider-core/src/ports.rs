use std::sync::Arc;

use crate::domain::{RpcPayload, RpcReply};
use crate::error::{ProviderError, RpcError};

/// Completion callback of an engine call: `(error, reply)` exactly as the
/// engine produced them.
pub type RpcCallback = Box<dyn FnOnce(Option<RpcError>, RpcReply) + Send + 'static>;

/// The RPC dispatch engine that matches a request to a response.
///
/// Implementations must invoke the callback at most once. They may do so
/// synchronously or from another thread.
pub trait RpcEngine: Send + Sync {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback);
}

impl<E: RpcEngine + ?Sized> RpcEngine for Arc<E> {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        (**self).handle(payload, callback)
    }
}

/// The underlying duplex stream to the wallet.
pub trait StreamPort: Send + Sync {
    /// Tears the stream down. Implementations report the closure back to the
    /// provider, which ends in a permanent disconnect.
    fn destroy(&self, error: ProviderError);
}

/// Stream that cannot be destroyed, for providers driven purely by an engine.
#[derive(Debug, Clone, Default)]
pub struct DetachedStream;

impl StreamPort for DetachedStream {
    fn destroy(&self, error: ProviderError) {
        tracing::debug!(%error, "destroy requested on detached stream");
    }
}
