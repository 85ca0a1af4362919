//! Static fixture metadata describing how properties map onto channels
//!
//! Descriptors come from the fixture catalog and are never mutated here. They
//! deserialize from the catalog's camelCase JSON.

use crate::types::{ChannelRef, ChannelValue};
use serde::{Deserialize, Serialize};

/// What a slider controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliderCategory {
    Dimmer,
    Strobe,
    Speed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderDescriptor {
    pub channel: ChannelRef,
    pub min: ChannelValue,
    pub max: ChannelValue,
    pub category: SliderCategory,
}

/// Channels of one colour-mixing fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColourChannels {
    pub red_channel: ChannelRef,
    pub green_channel: ChannelRef,
    pub blue_channel: ChannelRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_channel: Option<ChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amber_channel: Option<ChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_channel: Option<ChannelRef>,
}

impl ColourChannels {
    pub fn rgb(red: ChannelRef, green: ChannelRef, blue: ChannelRef) -> Self {
        Self {
            red_channel: red,
            green_channel: green,
            blue_channel: blue,
            white_channel: None,
            amber_channel: None,
            uv_channel: None,
        }
    }

    pub fn with_white(mut self, channel: ChannelRef) -> Self {
        self.white_channel = Some(channel);
        self
    }

    pub fn with_amber(mut self, channel: ChannelRef) -> Self {
        self.amber_channel = Some(channel);
        self
    }

    pub fn with_uv(mut self, channel: ChannelRef) -> Self {
        self.uv_channel = Some(channel);
        self
    }

    /// Every channel this colour reads, RGB first
    pub fn all(&self) -> Vec<ChannelRef> {
        let mut channels = vec![self.red_channel, self.green_channel, self.blue_channel];
        channels.extend(self.white_channel);
        channels.extend(self.amber_channel);
        channels.extend(self.uv_channel);
        channels
    }
}

/// Pan/tilt channel pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChannels {
    pub pan_channel: ChannelRef,
    pub tilt_channel: ChannelRef,
}

/// Channel bounds for pan and tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRange {
    pub pan_min: ChannelValue,
    pub pan_max: ChannelValue,
    pub tilt_min: ChannelValue,
    pub tilt_max: ChannelValue,
}

impl Default for PositionRange {
    fn default() -> Self {
        Self {
            pan_min: 0,
            pan_max: 255,
            tilt_min: 0,
            tilt_max: 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDescriptor {
    #[serde(flatten)]
    pub channels: PositionChannels,
    #[serde(flatten)]
    pub range: PositionRange,
}

/// One labelled band of a setting channel, starting at `level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingOption {
    pub name: String,
    pub level: ChannelValue,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour_preview: Option<String>,
}

impl SettingOption {
    pub fn new(name: impl Into<String>, level: ChannelValue) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            level,
            colour_preview: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDescriptor {
    pub channel: ChannelRef,
    pub options: Vec<SettingOption>,
}

/// How one fixture property maps onto channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PropertyDescriptor {
    Slider(SliderDescriptor),
    Colour(ColourChannels),
    Position(PositionDescriptor),
    Setting(SettingDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSliderDescriptor {
    pub member_slider_channels: Vec<ChannelRef>,
    pub min: ChannelValue,
    pub max: ChannelValue,
    pub category: SliderCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupColourDescriptor {
    pub member_colour_channels: Vec<ColourChannels>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPositionDescriptor {
    pub member_position_channels: Vec<PositionChannels>,
    #[serde(flatten)]
    pub range: PositionRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettingDescriptor {
    pub member_setting_channels: Vec<ChannelRef>,
    pub options: Vec<SettingOption>,
}

/// The same property replicated across group members, one channel set per member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroupPropertyDescriptor {
    Slider(GroupSliderDescriptor),
    Colour(GroupColourDescriptor),
    Position(GroupPositionDescriptor),
    Setting(GroupSettingDescriptor),
}
