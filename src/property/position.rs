use super::{Derivation, DerivedProperty};
use crate::descriptor::PositionDescriptor;
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};

/// Pan/tilt of a moving head
#[derive(Debug, Clone)]
pub struct Position {
    descriptor: PositionDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionValue {
    pub pan: ChannelValue,
    pub tilt: ChannelValue,
    pub pan_normalized: f64,
    pub tilt_normalized: f64,
}

impl Position {
    pub fn new(descriptor: PositionDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &PositionDescriptor {
        &self.descriptor
    }
}

/// Map `value` into `[0, 1]` over `min..=max`; `0.5` for an empty range
pub fn normalize(value: f64, min: ChannelValue, max: ChannelValue) -> f64 {
    if max == min {
        return 0.5;
    }
    let (min, max) = (f64::from(min), f64::from(max));
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

fn denormalize(fraction: f64, min: ChannelValue, max: ChannelValue) -> ChannelValue {
    let (min, max) = (f64::from(min), f64::from(max));
    clamp_level(min + (max - min) * fraction.clamp(0.0, 1.0))
}

impl Derivation for Position {
    type Value = PositionValue;

    fn channels(&self) -> Vec<ChannelRef> {
        vec![self.descriptor.channels.pan_channel, self.descriptor.channels.tilt_channel]
    }

    fn derive(&self, store: &ChannelStore) -> PositionValue {
        let range = &self.descriptor.range;
        let pan = store.get(&self.descriptor.channels.pan_channel);
        let tilt = store.get(&self.descriptor.channels.tilt_channel);
        PositionValue {
            pan,
            tilt,
            pan_normalized: normalize(f64::from(pan), range.pan_min, range.pan_max),
            tilt_normalized: normalize(f64::from(tilt), range.tilt_min, range.tilt_max),
        }
    }
}

impl DerivedProperty<Position> {
    /// Write raw pan and tilt levels
    pub fn set(&self, pan: ChannelValue, tilt: ChannelValue) {
        let channels = &self.derivation().descriptor().channels;
        self.store().update(&channels.pan_channel, pan);
        self.store().update(&channels.tilt_channel, tilt);
    }

    /// Write pan and tilt given as fractions of their ranges
    pub fn set_normalized(&self, pan: f64, tilt: f64) {
        let range = self.derivation().descriptor().range;
        self.set(
            denormalize(pan, range.pan_min, range.pan_max),
            denormalize(tilt, range.tilt_min, range.tilt_max),
        );
    }
}
