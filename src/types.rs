use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of one DMX channel
pub type ChannelValue = u8;

/// Flat channel identifier used on the wire
pub type WireId = u32;

/// Identifies one DMX channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub universe: u32,
    pub channel_no: u32,
}

impl ChannelRef {
    pub fn new(universe: u32, channel_no: u32) -> Self {
        Self {
            universe,
            channel_no,
        }
    }

    /// Canonical multiplexing key for this channel
    pub fn key(&self) -> ChannelKey {
        ChannelKey::from(*self)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.universe, self.channel_no)
    }
}

/// Canonical string form of a [`ChannelRef`] (`"<universe>:<channelNo>"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(String);

impl ChannelKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the key back into a channel; `None` if it is not `"u:c"`
    pub fn channel(&self) -> Option<ChannelRef> {
        let (universe, channel_no) = self.0.split_once(':')?;
        Some(ChannelRef::new(universe.parse().ok()?, channel_no.parse().ok()?))
    }
}

impl From<ChannelRef> for ChannelKey {
    fn from(channel: ChannelRef) -> Self {
        Self(channel.to_string())
    }
}

impl From<&ChannelRef> for ChannelKey {
    fn from(channel: &ChannelRef) -> Self {
        Self(channel.to_string())
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A level reported by the server for one wire channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLevel {
    pub id: WireId,
    pub level: ChannelValue,
}

impl ChannelLevel {
    pub fn new(id: WireId, level: ChannelValue) -> Self {
        Self { id, level }
    }
}

/// Lifecycle state of the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closing => "closing",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Round and clamp an arbitrary numeric level into the DMX range
pub(crate) fn clamp_level(level: f64) -> ChannelValue {
    if level.is_nan() {
        return 0;
    }
    level.round().clamp(0.0, 255.0) as ChannelValue
}
