use super::RangeSummary;
use crate::descriptor::GroupPositionDescriptor;
use crate::property::{normalize, Derivation, DerivedProperty};
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};

/// Pan/tilt across every group member
#[derive(Debug, Clone)]
pub struct GroupPosition {
    descriptor: GroupPositionDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupPositionValue {
    pub avg_pan: f64,
    pub avg_tilt: f64,
    /// Average pan over the pan range, in `[0, 1]`
    pub pan_normalized: f64,
    pub tilt_normalized: f64,
    pub pan_min: ChannelValue,
    pub pan_max: ChannelValue,
    pub tilt_min: ChannelValue,
    pub tilt_max: ChannelValue,
    pub is_uniform: bool,
    /// `"pan, tilt"`, each axis shown as a range when members differ
    pub display_text: String,
}

fn mean(levels: &[ChannelValue]) -> f64 {
    if levels.is_empty() {
        return 0.0;
    }
    levels.iter().map(|level| f64::from(*level)).sum::<f64>() / levels.len() as f64
}

impl GroupPosition {
    pub fn new(descriptor: GroupPositionDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &GroupPositionDescriptor {
        &self.descriptor
    }
}

impl Derivation for GroupPosition {
    type Value = GroupPositionValue;

    fn channels(&self) -> Vec<ChannelRef> {
        self.descriptor
            .member_position_channels
            .iter()
            .flat_map(|member| [member.pan_channel, member.tilt_channel])
            .collect()
    }

    fn derive(&self, store: &ChannelStore) -> GroupPositionValue {
        let members = &self.descriptor.member_position_channels;
        let pans: Vec<_> = members.iter().map(|member| store.get(&member.pan_channel)).collect();
        let tilts: Vec<_> = members.iter().map(|member| store.get(&member.tilt_channel)).collect();

        let (avg_pan, avg_tilt) = (mean(&pans), mean(&tilts));
        let pan = RangeSummary::of(pans);
        let tilt = RangeSummary::of(tilts);
        let range = &self.descriptor.range;

        GroupPositionValue {
            avg_pan,
            avg_tilt,
            pan_normalized: normalize(avg_pan, range.pan_min, range.pan_max),
            tilt_normalized: normalize(avg_tilt, range.tilt_min, range.tilt_max),
            pan_min: pan.min,
            pan_max: pan.max,
            tilt_min: tilt.min,
            tilt_max: tilt.max,
            is_uniform: pan.is_uniform && tilt.is_uniform,
            display_text: format!("{}, {}", pan.display_text, tilt.display_text),
        }
    }
}

impl DerivedProperty<GroupPosition> {
    /// Point every member at the same pan and tilt
    pub fn set(&self, pan: ChannelValue, tilt: ChannelValue) {
        for member in &self.derivation().descriptor().member_position_channels {
            self.store().update(&member.pan_channel, pan);
            self.store().update(&member.tilt_channel, tilt);
        }
    }

    /// Pan and tilt as fractions of the group's ranges
    pub fn set_normalized(&self, pan: f64, tilt: f64) {
        let range = self.derivation().descriptor().range;
        let scale = |fraction: f64, min: ChannelValue, max: ChannelValue| {
            let (min, max) = (f64::from(min), f64::from(max));
            clamp_level(min + (max - min) * fraction.clamp(0.0, 1.0))
        };
        self.set(
            scale(pan, range.pan_min, range.pan_max),
            scale(tilt, range.tilt_min, range.tilt_max),
        );
    }
}
