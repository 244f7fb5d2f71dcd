use std::sync::Arc;

use tokio::task::JoinHandle;

use inpage_provider_core::{InpageProvider, ProviderError};

use crate::channel::{spawn_pump, ChannelMessage, MessageChannel};
use crate::config::ProviderConfig;
use crate::engine::WalletEngine;

/// A provider wired to its engine and notification channel, with the
/// channel pump running on the current tokio runtime.
#[derive(Debug)]
pub struct ProviderRuntime {
    provider: Arc<InpageProvider<WalletEngine>>,
    channel: Arc<MessageChannel>,
    pump: JoinHandle<()>,
}

impl ProviderRuntime {
    /// Builds and initializes the provider. Must be called within a tokio
    /// runtime.
    pub async fn launch(config: &ProviderConfig) -> Result<Self, ProviderError> {
        // Proxy engine construction waits for its worker's HTTP client.
        let engine_config = config.clone();
        let engine = tokio::task::spawn_blocking(move || WalletEngine::with_config(&engine_config))
            .await
            .map_err(|e| ProviderError::Transport(format!("wallet engine setup failed: {e}")))?;
        let (channel, rx) = MessageChannel::new(config.json_rpc_stream_name.clone());

        if let (Some(wallet), Some(sender)) = (engine.deterministic(), channel.sender()) {
            wallet.attach(sender);
        }

        let provider = Arc::new(InpageProvider::new(
            engine,
            channel.clone(),
            config.provider_options(),
        ));
        let pump = spawn_pump(
            Arc::clone(&provider),
            config.json_rpc_stream_name.clone(),
            rx,
        );

        provider.initialize().await?;
        tracing::info!(
            stream = %config.json_rpc_stream_name,
            chain_id = ?provider.chain_id(),
            "inpage provider ready"
        );

        Ok(Self {
            provider,
            channel,
            pump,
        })
    }

    pub fn provider(&self) -> &Arc<InpageProvider<WalletEngine>> {
        &self.provider
    }

    pub fn channel(&self) -> &Arc<MessageChannel> {
        &self.channel
    }

    /// Closes the wallet side of the stream and waits for the pump to
    /// drain. The provider ends permanently disconnected.
    ///
    /// The channel and the deterministic wallet both hold senders for the
    /// runtime's lifetime, so this (or a stream-failure `destroy`) is the
    /// only way the pump stops.
    pub async fn shutdown(self, reason: Option<String>) {
        if let Some(sender) = self.channel.sender() {
            let _ = sender.send(ChannelMessage::Close { reason });
        }
        if let Err(error) = self.pump.await {
            tracing::error!(%error, "notification pump task failed");
        }
    }
}
