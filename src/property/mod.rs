//! Typed values derived from raw channel levels
//!
//! Every property is a [`DerivedProperty`]: `subscribe` registers a callback
//! on exactly the channels the property reads, and `snapshot` recomputes the
//! value and returns the previous `Arc` when nothing changed, so consumers can
//! compare snapshots by pointer to skip redundant work.

mod colour;
mod position;
mod setting;
mod slider;

pub use colour::{blend_extended, Colour, ColourTarget, ColourValue};
pub(crate) use colour::write_colour;
pub use position::{normalize, Position, PositionValue};
pub use setting::{resolve_option, Setting, SettingValue};
pub use slider::{slider_percentage, Slider};

use crate::descriptor::{ColourChannels, PropertyDescriptor, SliderCategory};
use crate::lock::lock;
use crate::store::ChannelStore;
use crate::subscription::Subscription;
use crate::types::ChannelRef;
use crate::virtual_dimmer::VirtualDimmer;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Computes one typed value from channel levels
pub trait Derivation: Send + Sync + 'static {
    type Value: PartialEq + Send + Sync + 'static;

    /// Channels the value depends on
    fn channels(&self) -> Vec<ChannelRef>;

    /// Compute the value from the store's current levels
    fn derive(&self, store: &ChannelStore) -> Self::Value;
}

/// A derivation bound to a store, with a memoized snapshot
pub struct DerivedProperty<D: Derivation> {
    store: Arc<ChannelStore>,
    derivation: D,
    last: Mutex<Option<Arc<D::Value>>>,
}

impl<D: Derivation> DerivedProperty<D> {
    /// Bind `derivation` to `store`; nothing is read until the first snapshot
    pub fn new(store: Arc<ChannelStore>, derivation: D) -> Self {
        Self {
            store,
            derivation,
            last: Mutex::new(None),
        }
    }

    /// Current value; the same `Arc` as last time if the value is unchanged
    pub fn snapshot(&self) -> Arc<D::Value> {
        let fresh = self.derivation.derive(&self.store);
        let mut last = lock(&self.last);
        match last.as_ref() {
            Some(previous) if **previous == fresh => previous.clone(),
            _ => {
                let value = Arc::new(fresh);
                *last = Some(value.clone());
                value
            }
        }
    }

    /// Call `on_change` whenever any channel the value depends on is updated
    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        let on_change = Arc::new(on_change);
        let mut seen = HashSet::new();

        let subscriptions = self
            .derivation
            .channels()
            .into_iter()
            .map(|channel| channel.key())
            .filter(|key| seen.insert(key.clone()))
            .map(|key| {
                let on_change = on_change.clone();
                self.store.subscribe(key, move |_| on_change())
            })
            .collect();

        Subscription::merge(subscriptions)
    }

    /// Channels and rules behind this property
    pub fn derivation(&self) -> &D {
        &self.derivation
    }

    /// Store the property reads from and writes through
    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }
}

/// One bound fixture property
pub enum FixtureProperty {
    Slider(DerivedProperty<Slider>),
    Colour(DerivedProperty<Colour>),
    Position(DerivedProperty<Position>),
    Setting(DerivedProperty<Setting>),
}

impl FixtureProperty {
    pub fn bind(store: &Arc<ChannelStore>, descriptor: &PropertyDescriptor) -> Self {
        let store = store.clone();
        match descriptor {
            PropertyDescriptor::Slider(slider) => {
                FixtureProperty::Slider(DerivedProperty::new(store, Slider::new(slider.clone())))
            }
            PropertyDescriptor::Colour(channels) => {
                FixtureProperty::Colour(DerivedProperty::new(store, Colour::new(*channels)))
            }
            PropertyDescriptor::Position(position) => {
                FixtureProperty::Position(DerivedProperty::new(store, Position::new(*position)))
            }
            PropertyDescriptor::Setting(setting) => {
                FixtureProperty::Setting(DerivedProperty::new(store, Setting::new(setting.clone())))
            }
        }
    }

    /// Subscribe to whichever property this is
    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        match self {
            FixtureProperty::Slider(property) => property.subscribe(on_change),
            FixtureProperty::Colour(property) => property.subscribe(on_change),
            FixtureProperty::Position(property) => property.subscribe(on_change),
            FixtureProperty::Setting(property) => property.subscribe(on_change),
        }
    }
}

/// Every property of one fixture, plus a virtual dimmer where one applies
pub struct FixtureBinding {
    pub properties: Vec<FixtureProperty>,
    pub virtual_dimmer: Option<DerivedProperty<VirtualDimmer>>,
}

/// Bind a fixture's descriptors to a store
///
/// A virtual dimmer is attached when the fixture has a colour property but
/// no dimmer slider.
pub fn bind_fixture(store: &Arc<ChannelStore>, descriptors: &[PropertyDescriptor]) -> FixtureBinding {
    let properties = descriptors
        .iter()
        .map(|descriptor| FixtureProperty::bind(store, descriptor))
        .collect();

    let virtual_dimmer = virtual_dimmer_colour(descriptors)
        .map(|channels| DerivedProperty::new(store.clone(), VirtualDimmer::new(channels)));

    FixtureBinding {
        properties,
        virtual_dimmer,
    }
}

/// Colour channels to drive a virtual dimmer from, if the fixture needs one
pub fn virtual_dimmer_colour(descriptors: &[PropertyDescriptor]) -> Option<ColourChannels> {
    let has_dimmer = descriptors.iter().any(|descriptor| {
        matches!(descriptor, PropertyDescriptor::Slider(slider) if slider.category == SliderCategory::Dimmer)
    });
    if has_dimmer {
        return None;
    }
    descriptors.iter().find_map(|descriptor| match descriptor {
        PropertyDescriptor::Colour(channels) => Some(*channels),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SliderDescriptor;
    use crate::store::test_support::{ch, set, store};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rgb() -> ColourChannels {
        ColourChannels::rgb(ch(1), ch(2), ch(3))
    }

    #[tokio::test]
    async fn unchanged_value_keeps_the_same_snapshot() {
        let (store, _) = store();
        let colour = DerivedProperty::new(store.clone(), Colour::new(rgb()));
        set(&store, &[(1, 10), (2, 20), (3, 30)]);

        let first = colour.snapshot();
        let second = colour.snapshot();
        assert!(Arc::ptr_eq(&first, &second));

        // Rewriting the same level does not produce a new snapshot
        set(&store, &[(2, 20)]);
        assert!(Arc::ptr_eq(&first, &colour.snapshot()));

        set(&store, &[(2, 21)]);
        let third = colour.snapshot();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.g, 21);
    }

    #[tokio::test]
    async fn subscription_covers_only_the_property_channels() {
        let (store, _) = store();
        let colour = DerivedProperty::new(store.clone(), Colour::new(rgb()));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let subscription = colour.subscribe(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        set(&store, &[(4, 255)]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        set(&store, &[(3, 255)]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        set(&store, &[(1, 255)]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(&ch(1).key()), 0);
    }

    #[tokio::test]
    async fn virtual_dimmer_only_without_a_dimmer_slider() {
        let (store, _) = store();
        let colour_only = [PropertyDescriptor::Colour(rgb())];
        let binding = bind_fixture(&store, &colour_only);
        assert_eq!(binding.properties.len(), 1);
        assert!(binding.virtual_dimmer.is_some());

        let with_dimmer = [
            PropertyDescriptor::Slider(SliderDescriptor {
                channel: ch(10),
                min: 0,
                max: 255,
                category: SliderCategory::Dimmer,
            }),
            PropertyDescriptor::Colour(rgb()),
        ];
        assert!(bind_fixture(&store, &with_dimmer).virtual_dimmer.is_none());

        let strobe_only = [PropertyDescriptor::Slider(SliderDescriptor {
            channel: ch(10),
            min: 0,
            max: 255,
            category: SliderCategory::Strobe,
        })];
        assert!(bind_fixture(&store, &strobe_only).virtual_dimmer.is_none());
    }
}
