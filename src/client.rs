use crate::config::SyncConfig;
use crate::descriptor::{GroupPropertyDescriptor, PropertyDescriptor};
use crate::error::Result;
use crate::group::{bind_group, GroupBinding};
use crate::property::{bind_fixture, FixtureBinding};
use crate::store::ChannelStore;
use crate::subscription::Subscription;
use crate::transport::Transport;
use crate::types::ConnectionStatus;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Live connection to a lighting server and the channel store it feeds
///
/// The `LightingClient` owns the [`Transport`] and the [`ChannelStore`], and
/// runs the task that moves decoded channel levels from one to the other.
/// Fixture and group properties are bound against its store.
pub struct LightingClient {
    transport: Transport,
    store: Arc<ChannelStore>,
    pump: JoinHandle<()>,
}

impl LightingClient {
    /// Validate `config` and start connecting
    ///
    /// Returns as soon as the connection attempt has started; watch
    /// [`LightingClient::subscribe_status`] to learn when it is open. Must be
    /// called inside a tokio runtime.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dmx_channel_sync::{ChannelRef, LightingClient, SyncConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = LightingClient::connect(SyncConfig::new("192.168.1.50", 8080))?;
    ///     let dimmer = ChannelRef::new(1, 1);
    ///     let _watch = client.store().subscribe(dimmer.key(), |level| {
    ///         println!("Dimmer is at {}", level);
    ///     });
    ///     client.store().update(&dimmer, 255);
    ///     Ok(())
    /// }
    /// ```
    pub fn connect(config: SyncConfig) -> Result<Self> {
        config.validate()?;

        let (levels_tx, mut levels_rx) = mpsc::unbounded_channel();
        let transport = Transport::connect(config.endpoint_url(), config.heartbeat_interval(), levels_tx);
        let store = ChannelStore::new(
            Arc::new(transport.clone()),
            Arc::new(config.addressing()),
            config.aggregation_window(),
        );

        let pump_store = store.clone();
        let pump = tokio::spawn(async move {
            while let Some(levels) = levels_rx.recv().await {
                pump_store.ingest(levels);
            }
        });

        Ok(Self { transport, store, pump })
    }

    /// Store holding the latest level of every channel
    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Connection feeding the store
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub fn subscribe_status(
        &self,
        listener: impl Fn(ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.transport.subscribe_status(listener)
    }

    /// Reconnect after the connection has closed
    pub fn reconnect(&self) {
        self.transport.reconnect();
    }

    /// Bind a fixture's properties to this client's store
    pub fn bind_fixture(&self, descriptors: &[PropertyDescriptor]) -> FixtureBinding {
        bind_fixture(&self.store, descriptors)
    }

    /// Bind a group's properties to this client's store
    pub fn bind_group(&self, descriptors: &[GroupPropertyDescriptor]) -> GroupBinding {
        bind_group(&self.store, descriptors)
    }

    /// Close the connection and stop feeding the store
    ///
    /// Levels waiting in the store's quiet window are applied first. Dropping
    /// the client does the same without the final flush.
    pub fn dispose(self) {
        self.store.flush();
    }
}

impl Drop for LightingClient {
    fn drop(&mut self) {
        self.transport.close();
        self.pump.abort();
    }
}
