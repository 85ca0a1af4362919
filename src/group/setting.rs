use crate::descriptor::{GroupSettingDescriptor, SettingOption};
use crate::property::{resolve_option, Derivation, DerivedProperty};
use crate::store::ChannelStore;
use crate::types::ChannelRef;

/// The same setting across every group member
#[derive(Debug, Clone)]
pub struct GroupSetting {
    descriptor: GroupSettingDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSettingValue {
    /// Every member resolves to the same option
    pub is_uniform: bool,
    /// The shared option's display name, or `"Mixed"`
    pub display_text: String,
    pub current_option: Option<SettingOption>,
}

impl GroupSetting {
    pub fn new(descriptor: GroupSettingDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &GroupSettingDescriptor {
        &self.descriptor
    }
}

impl Derivation for GroupSetting {
    type Value = GroupSettingValue;

    fn channels(&self) -> Vec<ChannelRef> {
        self.descriptor.member_setting_channels.clone()
    }

    fn derive(&self, store: &ChannelStore) -> GroupSettingValue {
        let options = &self.descriptor.options;
        let resolved: Vec<Option<&SettingOption>> = self
            .descriptor
            .member_setting_channels
            .iter()
            .map(|channel| resolve_option(options, store.get(channel)))
            .collect();

        let is_uniform = resolved.windows(2).all(|pair| pair[0] == pair[1]);
        let current_option = match resolved.first() {
            Some(first) if is_uniform => (*first).cloned(),
            _ => None,
        };

        let display_text = match (&current_option, is_uniform) {
            (Some(option), _) => option.display_name.clone(),
            (None, true) => String::new(),
            (None, false) => "Mixed".to_string(),
        };

        GroupSettingValue {
            is_uniform,
            display_text,
            current_option,
        }
    }
}

impl DerivedProperty<GroupSetting> {
    /// Select the same option on every member
    pub fn select(&self, name: &str) {
        let descriptor = self.derivation().descriptor();
        let Some(option) = descriptor.options.iter().find(|option| option.name == name) else {
            tracing::warn!("No option named {} in group setting", name);
            return;
        };
        for channel in &descriptor.member_setting_channels {
            self.store().update(channel, option.level);
        }
    }
}
