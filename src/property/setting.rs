use super::{Derivation, DerivedProperty};
use crate::descriptor::{SettingDescriptor, SettingOption};
use crate::store::ChannelStore;
use crate::types::{ChannelRef, ChannelValue};

/// Labelled band of a setting channel
#[derive(Debug, Clone)]
pub struct Setting {
    descriptor: SettingDescriptor,
}

/// Current level and the option it falls in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingValue {
    pub value: ChannelValue,
    pub option: Option<SettingOption>,
}

impl Setting {
    pub fn new(descriptor: SettingDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &SettingDescriptor {
        &self.descriptor
    }
}

/// Option whose band contains `value`
///
/// Options partition the range by ascending `level`; the match is the option
/// with the highest level not above `value`. Falls back to the first declared
/// option when every level is above `value`.
pub fn resolve_option(options: &[SettingOption], value: ChannelValue) -> Option<&SettingOption> {
    options
        .iter()
        .filter(|option| option.level <= value)
        .max_by_key(|option| option.level)
        .or_else(|| options.first())
}

impl Derivation for Setting {
    type Value = SettingValue;

    fn channels(&self) -> Vec<ChannelRef> {
        vec![self.descriptor.channel]
    }

    fn derive(&self, store: &ChannelStore) -> SettingValue {
        let value = store.get(&self.descriptor.channel);
        SettingValue {
            value,
            option: resolve_option(&self.descriptor.options, value).cloned(),
        }
    }
}

impl DerivedProperty<Setting> {
    /// Select an option by name
    pub fn select(&self, name: &str) {
        let descriptor = self.derivation().descriptor();
        match descriptor.options.iter().find(|option| option.name == name) {
            Some(option) => self.store().update(&descriptor.channel, option.level),
            None => tracing::warn!("No option named {} on channel {}", name, descriptor.channel),
        }
    }
}
