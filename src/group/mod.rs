//! Summaries of one property replicated across the members of a group
//!
//! Every group derivation reads each member the way the single-fixture
//! derivation does and folds the results into one aggregate. Group writers
//! send the same value to every member, so editing a mixed group makes it
//! uniform in one write.

mod colour;
mod position;
mod setting;
mod slider;

pub use colour::{GroupColour, GroupColourValue};
pub use position::{GroupPosition, GroupPositionValue};
pub use setting::{GroupSetting, GroupSettingValue};
pub use slider::GroupSlider;

use crate::descriptor::{ColourChannels, GroupPropertyDescriptor, SliderCategory};
use crate::property::DerivedProperty;
use crate::store::ChannelStore;
use crate::subscription::Subscription;
use crate::types::ChannelValue;
use crate::virtual_dimmer::GroupVirtualDimmer;
use std::sync::Arc;

/// Spread of one level across members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSummary {
    pub min: ChannelValue,
    pub max: ChannelValue,
    pub is_uniform: bool,
    /// The shared value, or `"min–max"` when members differ
    pub display_text: String,
}

impl RangeSummary {
    /// Summarize member levels; an empty group reads as a uniform `0`
    pub fn of(values: impl IntoIterator<Item = ChannelValue>) -> Self {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Self::from_bounds(0, 0);
        };
        let (min, max) = values.fold((first, first), |(min, max), value| (min.min(value), max.max(value)));
        Self::from_bounds(min, max)
    }

    fn from_bounds(min: ChannelValue, max: ChannelValue) -> Self {
        let display_text = if min == max {
            min.to_string()
        } else {
            format!("{}–{}", min, max)
        };
        Self {
            min,
            max,
            is_uniform: min == max,
            display_text,
        }
    }
}

/// One bound group property
pub enum GroupProperty {
    Slider(DerivedProperty<GroupSlider>),
    Colour(DerivedProperty<GroupColour>),
    Position(DerivedProperty<GroupPosition>),
    Setting(DerivedProperty<GroupSetting>),
}

impl GroupProperty {
    pub fn bind(store: &Arc<ChannelStore>, descriptor: &GroupPropertyDescriptor) -> Self {
        let store = store.clone();
        match descriptor {
            GroupPropertyDescriptor::Slider(slider) => {
                GroupProperty::Slider(DerivedProperty::new(store, GroupSlider::new(slider.clone())))
            }
            GroupPropertyDescriptor::Colour(colour) => {
                GroupProperty::Colour(DerivedProperty::new(store, GroupColour::new(colour.clone())))
            }
            GroupPropertyDescriptor::Position(position) => {
                GroupProperty::Position(DerivedProperty::new(store, GroupPosition::new(position.clone())))
            }
            GroupPropertyDescriptor::Setting(setting) => {
                GroupProperty::Setting(DerivedProperty::new(store, GroupSetting::new(setting.clone())))
            }
        }
    }

    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        match self {
            GroupProperty::Slider(property) => property.subscribe(on_change),
            GroupProperty::Colour(property) => property.subscribe(on_change),
            GroupProperty::Position(property) => property.subscribe(on_change),
            GroupProperty::Setting(property) => property.subscribe(on_change),
        }
    }
}

/// Every property of one group, plus a virtual dimmer where one applies
pub struct GroupBinding {
    pub properties: Vec<GroupProperty>,
    pub virtual_dimmer: Option<DerivedProperty<GroupVirtualDimmer>>,
}

/// Bind a group's descriptors to a store
///
/// A virtual dimmer is attached when the group has a colour property but no
/// dimmer slider.
pub fn bind_group(store: &Arc<ChannelStore>, descriptors: &[GroupPropertyDescriptor]) -> GroupBinding {
    let properties = descriptors
        .iter()
        .map(|descriptor| GroupProperty::bind(store, descriptor))
        .collect();

    let virtual_dimmer = group_virtual_dimmer_colour(descriptors)
        .map(|members| DerivedProperty::new(store.clone(), GroupVirtualDimmer::new(members)));

    GroupBinding {
        properties,
        virtual_dimmer,
    }
}

fn group_virtual_dimmer_colour(descriptors: &[GroupPropertyDescriptor]) -> Option<Vec<ColourChannels>> {
    let has_dimmer = descriptors.iter().any(|descriptor| {
        matches!(descriptor, GroupPropertyDescriptor::Slider(slider) if slider.category == SliderCategory::Dimmer)
    });
    if has_dimmer {
        return None;
    }
    descriptors.iter().find_map(|descriptor| match descriptor {
        GroupPropertyDescriptor::Colour(colour) => Some(colour.member_colour_channels.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{GroupColourDescriptor, GroupSliderDescriptor};
    use crate::store::test_support::{ch, store};

    #[test]
    fn uniform_members_show_the_single_value() {
        let summary = RangeSummary::of([128, 128, 128]);
        assert!(summary.is_uniform);
        assert_eq!((summary.min, summary.max), (128, 128));
        assert_eq!(summary.display_text, "128");
    }

    #[test]
    fn mixed_members_show_the_range() {
        let summary = RangeSummary::of([50, 200, 50]);
        assert!(!summary.is_uniform);
        assert_eq!((summary.min, summary.max), (50, 200));
        assert_eq!(summary.display_text, "50–200");
    }

    #[test]
    fn empty_group_is_a_uniform_zero() {
        let summary = RangeSummary::of(std::iter::empty());
        assert!(summary.is_uniform);
        assert_eq!(summary.display_text, "0");
    }

    #[tokio::test]
    async fn colour_group_without_a_dimmer_gets_a_virtual_one() {
        let (store, _) = store();
        let colour = GroupPropertyDescriptor::Colour(GroupColourDescriptor {
            member_colour_channels: vec![
                ColourChannels::rgb(ch(1), ch(2), ch(3)),
                ColourChannels::rgb(ch(4), ch(5), ch(6)),
            ],
        });
        let binding = bind_group(&store, &[colour.clone()]);
        assert_eq!(binding.properties.len(), 1);
        let dimmer = binding.virtual_dimmer.as_ref().map(|dimmer| dimmer.derivation().members().len());
        assert_eq!(dimmer, Some(2));

        let dimmer_slider = GroupPropertyDescriptor::Slider(GroupSliderDescriptor {
            member_slider_channels: vec![ch(10), ch(11)],
            min: 0,
            max: 255,
            category: SliderCategory::Dimmer,
        });
        assert!(bind_group(&store, &[dimmer_slider, colour]).virtual_dimmer.is_none());
    }
}
