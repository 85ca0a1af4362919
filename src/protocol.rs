use crate::error::{Result, SyncError};
use crate::types::{clamp_level, ChannelLevel, ChannelValue, WireId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw inbound frame: a `type` discriminant plus an optional payload
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Single channel delta payload (`uC`)
#[derive(Debug, Clone, Deserialize)]
struct DeltaData {
    c: WireDelta,
}

#[derive(Debug, Clone, Deserialize)]
struct WireDelta {
    i: WireId,
    l: f64,
}

/// Bulk snapshot payload (`channelState`)
#[derive(Debug, Clone, Deserialize)]
struct SnapshotData {
    channels: Vec<WireChannel>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChannel {
    id: WireId,
    #[serde(rename = "currentLevel")]
    current_level: f64,
}

/// Decoded server message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// One channel changed
    ChannelUpdate(ChannelLevel),

    /// Full channel state, sent in response to the initial request
    ChannelState(Vec<ChannelLevel>),

    /// Heartbeat acknowledgement
    Pong,

    /// A message type this client does not consume
    Other(String),
}

/// Channel write payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelWrite {
    pub id: WireId,
    pub level: ChannelValue,
    pub fade_time: u32,
}

/// Message sent to the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundMessage {
    /// Set one channel immediately
    #[serde(rename = "updateChannel")]
    UpdateChannel { channel: ChannelWrite },

    /// Ask for a full channel snapshot
    #[serde(rename = "channelState")]
    ChannelStateRequest,

    /// Heartbeat
    #[serde(rename = "ping")]
    Ping,
}

impl OutboundMessage {
    /// Write a channel with no fade
    pub fn update_channel(id: WireId, level: ChannelValue) -> Self {
        OutboundMessage::UpdateChannel {
            channel: ChannelWrite {
                id,
                level,
                fade_time: 0,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode one text frame
pub fn decode_inbound(text: &str) -> Result<InboundMessage> {
    let envelope: Envelope = serde_json::from_str(text)?;

    match envelope.kind.as_str() {
        "uC" => {
            let delta: DeltaData = payload(envelope.data, "uC")?;
            Ok(InboundMessage::ChannelUpdate(ChannelLevel::new(
                delta.c.i,
                clamp_level(delta.c.l),
            )))
        }
        "channelState" => {
            let snapshot: SnapshotData = payload(envelope.data, "channelState")?;
            Ok(InboundMessage::ChannelState(
                snapshot
                    .channels
                    .into_iter()
                    .map(|channel| ChannelLevel::new(channel.id, clamp_level(channel.current_level)))
                    .collect(),
            ))
        }
        "pong" => Ok(InboundMessage::Pong),
        _ => Ok(InboundMessage::Other(envelope.kind)),
    }
}

fn payload<T: DeserializeOwned>(data: Value, kind: &str) -> Result<T> {
    if data.is_null() {
        return Err(SyncError::InvalidMessage(format!("{} without data", kind)));
    }
    Ok(serde_json::from_value(data)?)
}
