use super::RangeSummary;
use crate::descriptor::GroupSliderDescriptor;
use crate::property::{slider_percentage, Derivation, DerivedProperty};
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};

/// The same slider across every group member
#[derive(Debug, Clone)]
pub struct GroupSlider {
    descriptor: GroupSliderDescriptor,
}

impl GroupSlider {
    pub fn new(descriptor: GroupSliderDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &GroupSliderDescriptor {
        &self.descriptor
    }
}

impl Derivation for GroupSlider {
    type Value = RangeSummary;

    fn channels(&self) -> Vec<ChannelRef> {
        self.descriptor.member_slider_channels.clone()
    }

    fn derive(&self, store: &ChannelStore) -> RangeSummary {
        RangeSummary::of(
            self.descriptor
                .member_slider_channels
                .iter()
                .map(|channel| store.get(channel)),
        )
    }
}

impl DerivedProperty<GroupSlider> {
    /// Percentage of the highest member
    pub fn percentage(&self) -> u8 {
        let descriptor = self.derivation().descriptor();
        slider_percentage(self.snapshot().max, descriptor.min, descriptor.max)
    }

    /// Write the same level to every member
    pub fn set(&self, value: ChannelValue) {
        for channel in &self.derivation().descriptor().member_slider_channels {
            self.store().update(channel, value);
        }
    }

    pub fn set_percentage(&self, percentage: f64) {
        let descriptor = self.derivation().descriptor();
        let min = f64::from(descriptor.min);
        let max = f64::from(descriptor.max.max(descriptor.min));
        let fraction = percentage.clamp(0.0, 100.0) / 100.0;
        self.set(clamp_level(min + (max - min) * fraction));
    }
}
