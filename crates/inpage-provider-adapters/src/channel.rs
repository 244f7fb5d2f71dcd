//! Already-demultiplexed notification channel between wallet and provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use inpage_provider_core::{InpageProvider, ProviderError, RpcEngine, StreamPort, WalletNotification};

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Notification(WalletNotification),
    /// The wallet side closed the stream.
    Close { reason: Option<String> },
}

#[derive(Debug)]
pub struct MessageChannel {
    name: String,
    sender: Mutex<Option<UnboundedSender<ChannelMessage>>>,
    destroyed: AtomicBool,
}

impl MessageChannel {
    pub fn new(name: impl Into<String>) -> (Arc<Self>, UnboundedReceiver<ChannelMessage>) {
        let (tx, rx) = unbounded_channel();
        let channel = Arc::new(Self {
            name: name.into(),
            sender: Mutex::new(Some(tx)),
            destroyed: AtomicBool::new(false),
        });
        (channel, rx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wallet-side handle for pushing notifications. `None` once destroyed.
    pub fn sender(&self) -> Option<UnboundedSender<ChannelMessage>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl StreamPort for MessageChannel {
    fn destroy(&self, error: ProviderError) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::warn!(stream = %self.name, %error, "destroying wallet stream");
        if let Some(sender) = sender {
            // The pump may already be gone; nothing left to notify then.
            let _ = sender.send(ChannelMessage::Close {
                reason: Some(error.to_string()),
            });
        }
    }
}

/// Feeds channel messages into `provider` until the stream closes, then
/// disconnects it permanently.
///
/// The stream closes on `ChannelMessage::Close` or once every sender is
/// dropped. A `MessageChannel` keeps its own sender until `destroy`, so for
/// receivers it created only `Close` ends the loop.
pub async fn pump<E: RpcEngine>(
    provider: Arc<InpageProvider<E>>,
    stream_name: String,
    mut rx: UnboundedReceiver<ChannelMessage>,
) {
    loop {
        match rx.recv().await {
            Some(ChannelMessage::Notification(notification)) => {
                provider.handle_notification(&notification);
            }
            Some(ChannelMessage::Close { reason }) => {
                provider.handle_stream_disconnect(&stream_name, reason.as_deref());
                break;
            }
            None => {
                provider.handle_stream_disconnect(&stream_name, None);
                break;
            }
        }
    }
}

pub fn spawn_pump<E>(
    provider: Arc<InpageProvider<E>>,
    stream_name: String,
    rx: UnboundedReceiver<ChannelMessage>,
) -> JoinHandle<()>
where
    E: RpcEngine + 'static,
{
    tokio::spawn(pump(provider, stream_name, rx))
}
