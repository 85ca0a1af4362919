//! Real-time DMX channel synchronization for lighting control panels
//!
//! This library keeps a local mirror of a lighting server's DMX channel
//! levels and turns them into typed fixture values. It provides:
//!
//! - A WebSocket transport with status reporting, heartbeat and manual reconnect
//! - Trailing-edge coalescing of inbound level storms
//! - Per-channel subscriptions, so each consumer only hears its own channels
//! - Slider, setting, position and colour values for single fixtures
//! - Range and uniformity summaries for groups of fixtures
//! - A virtual dimmer for colour fixtures without a dimmer channel
//!
//! # Quick Start
//!
//! ```no_run
//! use dmx_channel_sync::{
//!     ChannelRef, ColourChannels, LightingClient, PropertyDescriptor, SyncConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LightingClient::connect(SyncConfig::new("192.168.1.50", 8080))?;
//!
//!     // An RGB fixture with no dimmer channel gets a virtual dimmer
//!     let colour = ColourChannels::rgb(
//!         ChannelRef::new(1, 1),
//!         ChannelRef::new(1, 2),
//!         ChannelRef::new(1, 3),
//!     );
//!     let fixture = client.bind_fixture(&[PropertyDescriptor::Colour(colour)]);
//!
//!     if let Some(dimmer) = &fixture.virtual_dimmer {
//!         let _watch = dimmer.subscribe(|| println!("brightness changed"));
//!         dimmer.set_value(128);
//!         println!("Brightness: {}%", dimmer.snapshot().percentage);
//!     }
//!
//!     client.dispose();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Transport**: the single WebSocket connection and its status
//! - **Protocol**: JSON frames exchanged with the server
//! - **Aggregator**: debounced batching of inbound levels
//! - **Store**: channel levels plus the subscription multiplexer
//! - **Property / Group / Virtual dimmer**: derived values and their writers
//! - **Client**: wires the above together from a [`SyncConfig`]

mod addressing;
mod aggregator;
mod client;
mod config;
mod descriptor;
mod error;
mod group;
mod lock;
mod property;
mod protocol;
mod store;
mod subscription;
mod transport;
mod types;
mod virtual_dimmer;

// Public exports
pub use addressing::{ChannelAddressing, LinearAddressing};
pub use aggregator::Aggregator;
pub use client::LightingClient;
pub use config::SyncConfig;
pub use descriptor::{
    ColourChannels, GroupColourDescriptor, GroupPositionDescriptor, GroupPropertyDescriptor,
    GroupSettingDescriptor, GroupSliderDescriptor, PositionChannels, PositionDescriptor,
    PositionRange, PropertyDescriptor, SettingDescriptor, SettingOption, SliderCategory,
    SliderDescriptor,
};
pub use error::{Result, SyncError};
pub use group::{
    bind_group, GroupBinding, GroupColour, GroupColourValue, GroupPosition, GroupPositionValue,
    GroupProperty, GroupSetting, GroupSettingValue, GroupSlider, RangeSummary,
};
pub use property::{
    bind_fixture, blend_extended, normalize, resolve_option, slider_percentage, virtual_dimmer_colour,
    Colour, ColourTarget, ColourValue, Derivation, DerivedProperty, FixtureBinding, FixtureProperty,
    Position, PositionValue, Setting, SettingValue, Slider,
};
pub use protocol::{decode_inbound, ChannelWrite, InboundMessage, OutboundMessage};
pub use store::{ChannelStore, ChannelWriter};
pub use subscription::Subscription;
pub use transport::Transport;
pub use types::{ChannelKey, ChannelLevel, ChannelRef, ChannelValue, ConnectionStatus, WireId};
pub use virtual_dimmer::{
    dimmer_percentage, ColourRatios, GroupVirtualDimmer, GroupVirtualDimmerState, VirtualDimmer,
    VirtualDimmerState,
};
