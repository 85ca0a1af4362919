//! Synthetic brightness for colour fixtures without a dimmer channel
//!
//! Brightness reads as `max(r, g, b)`. Writes rescale the three primaries so
//! the hue is preserved, and the last lit hue is remembered so raising the
//! dimmer from black brings the colour back instead of white.

use crate::descriptor::ColourChannels;
use crate::group::RangeSummary;
use crate::lock::lock;
use crate::property::{Derivation, DerivedProperty};
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};
use std::sync::Mutex;

/// Each primary relative to the brightest one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourRatios {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ColourRatios {
    /// Equal ratios, used when no lit colour has been seen yet
    pub const WHITE: ColourRatios = ColourRatios {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Ratios of a lit colour; `None` for black
    pub fn of(rgb: [ChannelValue; 3]) -> Option<Self> {
        let max = brightness(rgb);
        if max == 0 {
            return None;
        }
        let max = f64::from(max);
        Some(Self {
            r: f64::from(rgb[0]) / max,
            g: f64::from(rgb[1]) / max,
            b: f64::from(rgb[2]) / max,
        })
    }

    fn scaled(&self, target: ChannelValue) -> [ChannelValue; 3] {
        let target = f64::from(target);
        [
            clamp_level(self.r * target),
            clamp_level(self.g * target),
            clamp_level(self.b * target),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualDimmerState {
    pub value: ChannelValue,
    pub percentage: u8,
}

impl VirtualDimmerState {
    fn new(value: ChannelValue) -> Self {
        Self {
            value,
            percentage: dimmer_percentage(value),
        }
    }
}

/// `value` as a whole percentage of full brightness
pub fn dimmer_percentage(value: ChannelValue) -> u8 {
    (f64::from(value) / 255.0 * 100.0).round() as u8
}

fn brightness(rgb: [ChannelValue; 3]) -> ChannelValue {
    rgb[0].max(rgb[1]).max(rgb[2])
}

fn read_rgb(store: &ChannelStore, channels: &ColourChannels) -> [ChannelValue; 3] {
    [
        store.get(&channels.red_channel),
        store.get(&channels.green_channel),
        store.get(&channels.blue_channel),
    ]
}

/// Current brightness of one fixture, remembering its hue when lit
fn read_member(store: &ChannelStore, channels: &ColourChannels, memory: &mut Option<ColourRatios>) -> ChannelValue {
    let rgb = read_rgb(store, channels);
    if let Some(ratios) = ColourRatios::of(rgb) {
        *memory = Some(ratios);
    }
    brightness(rgb)
}

/// Rescale one fixture's primaries to `target` brightness
fn write_member(
    store: &ChannelStore,
    channels: &ColourChannels,
    memory: &mut Option<ColourRatios>,
    target: ChannelValue,
) {
    let ratios = match ColourRatios::of(read_rgb(store, channels)) {
        Some(current) => {
            *memory = Some(current);
            current
        }
        None => memory.unwrap_or(ColourRatios::WHITE),
    };

    let [r, g, b] = ratios.scaled(target);
    store.update(&channels.red_channel, r);
    store.update(&channels.green_channel, g);
    store.update(&channels.blue_channel, b);
}

/// Virtual dimmer over one fixture's colour channels
#[derive(Debug)]
pub struct VirtualDimmer {
    channels: ColourChannels,
    last_ratios: Mutex<Option<ColourRatios>>,
}

impl VirtualDimmer {
    pub fn new(channels: ColourChannels) -> Self {
        Self {
            channels,
            last_ratios: Mutex::new(None),
        }
    }

    pub fn channels(&self) -> &ColourChannels {
        &self.channels
    }

    /// Hue restored when the fixture is raised from black
    pub fn last_ratios(&self) -> Option<ColourRatios> {
        *lock(&self.last_ratios)
    }

    /// Seed the remembered hue, e.g. from a fixture's preset colour
    pub fn remember(&self, ratios: ColourRatios) {
        *lock(&self.last_ratios) = Some(ratios);
    }
}

impl Derivation for VirtualDimmer {
    type Value = VirtualDimmerState;

    fn channels(&self) -> Vec<ChannelRef> {
        vec![
            self.channels.red_channel,
            self.channels.green_channel,
            self.channels.blue_channel,
        ]
    }

    fn derive(&self, store: &ChannelStore) -> VirtualDimmerState {
        let mut memory = lock(&self.last_ratios);
        VirtualDimmerState::new(read_member(store, &self.channels, &mut memory))
    }
}

impl DerivedProperty<VirtualDimmer> {
    /// Set brightness, keeping the current or remembered hue
    pub fn set_value(&self, target: ChannelValue) {
        let dimmer = self.derivation();
        let mut memory = lock(&dimmer.last_ratios);
        write_member(self.store(), &dimmer.channels, &mut memory, target);
    }

    pub fn set_percentage(&self, percentage: f64) {
        self.set_value(clamp_level(percentage.clamp(0.0, 100.0) / 100.0 * 255.0));
    }
}

/// Brightness summary across a group of colour fixtures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVirtualDimmerState {
    pub range: RangeSummary,
    /// Percentage of the brightest member
    pub percentage: u8,
}

/// Virtual dimmer over every member of a group, with hue memory per member
#[derive(Debug)]
pub struct GroupVirtualDimmer {
    members: Vec<ColourChannels>,
    last_ratios: Mutex<Vec<Option<ColourRatios>>>,
}

impl GroupVirtualDimmer {
    pub fn new(members: Vec<ColourChannels>) -> Self {
        let last_ratios = Mutex::new(vec![None; members.len()]);
        Self { members, last_ratios }
    }

    pub fn members(&self) -> &[ColourChannels] {
        &self.members
    }

    pub fn last_ratios(&self) -> Vec<Option<ColourRatios>> {
        lock(&self.last_ratios).clone()
    }
}

impl Derivation for GroupVirtualDimmer {
    type Value = GroupVirtualDimmerState;

    fn channels(&self) -> Vec<ChannelRef> {
        self.members
            .iter()
            .flat_map(|member| [member.red_channel, member.green_channel, member.blue_channel])
            .collect()
    }

    fn derive(&self, store: &ChannelStore) -> GroupVirtualDimmerState {
        let mut memory = lock(&self.last_ratios);
        let values: Vec<_> = self
            .members
            .iter()
            .zip(memory.iter_mut())
            .map(|(member, ratios)| read_member(store, member, ratios))
            .collect();

        let range = RangeSummary::of(values);
        GroupVirtualDimmerState {
            percentage: dimmer_percentage(range.max),
            range,
        }
    }
}

impl DerivedProperty<GroupVirtualDimmer> {
    /// Set every member to the same brightness, each keeping its own hue
    pub fn set_value(&self, target: ChannelValue) {
        let dimmer = self.derivation();
        let mut memory = lock(&dimmer.last_ratios);
        for (member, ratios) in dimmer.members.iter().zip(memory.iter_mut()) {
            write_member(self.store(), member, ratios, target);
        }
    }

    pub fn set_percentage(&self, percentage: f64) {
        self.set_value(clamp_level(percentage.clamp(0.0, 100.0) / 100.0 * 255.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{ch, set, store};

    fn rgb(first: u32) -> ColourChannels {
        ColourChannels::rgb(ch(first), ch(first + 1), ch(first + 2))
    }

    #[tokio::test]
    async fn brightness_is_the_brightest_primary() {
        let (store, _) = store();
        let dimmer = DerivedProperty::new(store.clone(), VirtualDimmer::new(rgb(1)));
        set(&store, &[(1, 40), (2, 204), (3, 10)]);

        let state = dimmer.snapshot();
        assert_eq!(state.value, 204);
        assert_eq!(state.percentage, 80);
    }

    #[tokio::test]
    async fn dimming_preserves_the_hue() {
        let (store, writer) = store();
        let dimmer = DerivedProperty::new(store.clone(), VirtualDimmer::new(rgb(1)));
        set(&store, &[(1, 100), (2, 50), (3, 25)]);

        dimmer.set_value(50);
        assert_eq!(writer.writes(), vec![(1, 50), (2, 25), (3, 13)]);
    }

    #[tokio::test]
    async fn raising_from_black_restores_the_remembered_hue() {
        let (store, writer) = store();
        let dimmer = DerivedProperty::new(store, VirtualDimmer::new(rgb(1)));
        dimmer.derivation().remember(ColourRatios {
            r: 0.5,
            g: 0.3,
            b: 0.2,
        });

        dimmer.set_value(100);
        assert_eq!(writer.writes(), vec![(1, 50), (2, 30), (3, 20)]);
    }

    #[tokio::test]
    async fn reading_a_lit_colour_remembers_it() {
        let (store, writer) = store();
        let dimmer = DerivedProperty::new(store.clone(), VirtualDimmer::new(rgb(1)));

        set(&store, &[(1, 200), (2, 100), (3, 0)]);
        assert_eq!(dimmer.snapshot().value, 200);

        // Blackout elsewhere, then raise the dimmer again
        set(&store, &[(1, 0), (2, 0), (3, 0)]);
        assert_eq!(dimmer.snapshot().value, 0);
        assert_eq!(
            dimmer.derivation().last_ratios(),
            Some(ColourRatios {
                r: 1.0,
                g: 0.5,
                b: 0.0
            })
        );

        dimmer.set_value(255);
        assert_eq!(writer.writes(), vec![(1, 255), (2, 128), (3, 0)]);
    }

    #[tokio::test]
    async fn no_memory_raises_to_white() {
        let (store, writer) = store();
        let dimmer = DerivedProperty::new(store, VirtualDimmer::new(rgb(1)));

        dimmer.set_value(80);
        assert_eq!(writer.writes(), vec![(1, 80), (2, 80), (3, 80)]);
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(dimmer_percentage(0), 0);
        assert_eq!(dimmer_percentage(128), 50);
        assert_eq!(dimmer_percentage(255), 100);
    }

    #[tokio::test]
    async fn group_reports_the_spread_of_member_brightness() {
        let (store, _) = store();
        let dimmer = DerivedProperty::new(store.clone(), GroupVirtualDimmer::new(vec![rgb(1), rgb(4)]));
        set(&store, &[(1, 255), (5, 51)]);

        let state = dimmer.snapshot();
        assert_eq!((state.range.min, state.range.max), (51, 255));
        assert!(!state.range.is_uniform);
        assert_eq!(state.percentage, 100);
    }

    #[tokio::test]
    async fn group_write_keeps_each_member_hue() {
        let (store, writer) = store();
        let dimmer = DerivedProperty::new(store.clone(), GroupVirtualDimmer::new(vec![rgb(1), rgb(4)]));
        set(&store, &[(1, 200), (2, 100), (3, 0), (4, 0), (5, 0), (6, 100)]);

        dimmer.set_value(100);
        assert_eq!(
            writer.writes(),
            vec![(1, 100), (2, 50), (3, 0), (4, 0), (5, 0), (6, 100)]
        );
    }
}
