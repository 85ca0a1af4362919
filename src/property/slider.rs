use super::{Derivation, DerivedProperty};
use crate::descriptor::SliderDescriptor;
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};

/// Raw level of a single-channel slider
#[derive(Debug, Clone)]
pub struct Slider {
    descriptor: SliderDescriptor,
}

impl Slider {
    pub fn new(descriptor: SliderDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &SliderDescriptor {
        &self.descriptor
    }
}

impl Derivation for Slider {
    type Value = ChannelValue;

    fn channels(&self) -> Vec<ChannelRef> {
        vec![self.descriptor.channel]
    }

    fn derive(&self, store: &ChannelStore) -> ChannelValue {
        store.get(&self.descriptor.channel)
    }
}

/// Position of `value` within `min..=max` as a whole percentage
pub fn slider_percentage(value: ChannelValue, min: ChannelValue, max: ChannelValue) -> u8 {
    if max <= min {
        return 0;
    }
    let span = f64::from(max - min);
    let offset = f64::from(value.clamp(min, max) - min);
    (offset / span * 100.0).round() as u8
}

impl DerivedProperty<Slider> {
    /// Current value as a percentage of the slider's range
    pub fn percentage(&self) -> u8 {
        let descriptor = self.derivation().descriptor();
        slider_percentage(*self.snapshot(), descriptor.min, descriptor.max)
    }

    /// Write a raw level
    pub fn set(&self, value: ChannelValue) {
        self.store().update(&self.derivation().descriptor().channel, value);
    }

    /// Write a percentage of the slider's range
    pub fn set_percentage(&self, percentage: f64) {
        let descriptor = self.derivation().descriptor();
        let min = f64::from(descriptor.min);
        let max = f64::from(descriptor.max.max(descriptor.min));
        let fraction = percentage.clamp(0.0, 100.0) / 100.0;
        self.set(clamp_level(min + (max - min) * fraction));
    }
}
