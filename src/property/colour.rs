use super::{Derivation, DerivedProperty};
use crate::descriptor::ColourChannels;
use crate::store::ChannelStore;
use crate::types::{ChannelRef, ChannelValue};

// Blend targets for the extended emitters
const AMBER_GREEN: f64 = 191.0;
const AMBER_BLUE_LOSS: f64 = 0.1;
const UV_RED: f64 = 139.0;
const UV_GREEN_LOSS: f64 = 0.2;

/// RGB colour mixing with optional white, amber and UV emitters
#[derive(Debug, Clone)]
pub struct Colour {
    channels: ColourChannels,
}

/// Colour snapshot with CSS previews
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourValue {
    pub r: ChannelValue,
    pub g: ChannelValue,
    pub b: ChannelValue,
    pub w: Option<ChannelValue>,
    pub a: Option<ChannelValue>,
    pub uv: Option<ChannelValue>,
    /// Raw RGB only
    pub css: String,
    /// RGB with white, amber and UV blended in
    pub combined_css: String,
}

impl ColourValue {
    pub fn new(
        r: ChannelValue,
        g: ChannelValue,
        b: ChannelValue,
        w: Option<ChannelValue>,
        a: Option<ChannelValue>,
        uv: Option<ChannelValue>,
    ) -> Self {
        Self {
            r,
            g,
            b,
            w,
            a,
            uv,
            css: rgb_css(r, g, b),
            combined_css: blend_extended(r, g, b, w, a, uv),
        }
    }
}

fn rgb_css(r: ChannelValue, g: ChannelValue, b: ChannelValue) -> String {
    format!("rgb({}, {}, {})", r, g, b)
}

fn toward(base: f64, target: f64, factor: f64) -> f64 {
    base + (target - base) * factor
}

/// CSS colour approximating how the extended emitters look over the RGB base
///
/// White, then amber, then UV are layered, each step starting from the
/// result of the previous one.
pub fn blend_extended(
    r: ChannelValue,
    g: ChannelValue,
    b: ChannelValue,
    w: Option<ChannelValue>,
    a: Option<ChannelValue>,
    uv: Option<ChannelValue>,
) -> String {
    let (mut red, mut green, mut blue) = (f64::from(r), f64::from(g), f64::from(b));

    if let Some(w) = w {
        let factor = f64::from(w) / 255.0;
        red = toward(red, 255.0, factor);
        green = toward(green, 255.0, factor);
        blue = toward(blue, 255.0, factor);
    }

    if let Some(a) = a {
        let factor = f64::from(a) / 255.0;
        red = toward(red, 255.0, factor);
        green = toward(green, AMBER_GREEN, factor);
        blue *= 1.0 - AMBER_BLUE_LOSS * factor;
    }

    if let Some(uv) = uv {
        let factor = f64::from(uv) / 255.0;
        red = toward(red, UV_RED, factor);
        green *= 1.0 - UV_GREEN_LOSS * factor;
        blue = toward(blue, 255.0, factor);
    }

    let channel = |value: f64| value.round().clamp(0.0, 255.0) as ChannelValue;
    rgb_css(channel(red), channel(green), channel(blue))
}

impl Colour {
    pub fn new(channels: ColourChannels) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &ColourChannels {
        &self.channels
    }
}

impl Derivation for Colour {
    type Value = ColourValue;

    fn channels(&self) -> Vec<ChannelRef> {
        self.channels.all()
    }

    fn derive(&self, store: &ChannelStore) -> ColourValue {
        let read = |channel: Option<ChannelRef>| channel.map(|channel| store.get(&channel));
        ColourValue::new(
            store.get(&self.channels.red_channel),
            store.get(&self.channels.green_channel),
            store.get(&self.channels.blue_channel),
            read(self.channels.white_channel),
            read(self.channels.amber_channel),
            read(self.channels.uv_channel),
        )
    }
}

/// Colour to write; extended emitters left `None` are switched off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColourTarget {
    pub r: ChannelValue,
    pub g: ChannelValue,
    pub b: ChannelValue,
    pub w: Option<ChannelValue>,
    pub a: Option<ChannelValue>,
    pub uv: Option<ChannelValue>,
}

impl ColourTarget {
    pub fn rgb(r: ChannelValue, g: ChannelValue, b: ChannelValue) -> Self {
        Self {
            r,
            g,
            b,
            ..Self::default()
        }
    }

    /// Full white, on the white emitter when the fixture has one
    pub fn white_for(channels: &ColourChannels) -> Self {
        if channels.white_channel.is_some() {
            Self {
                w: Some(255),
                ..Self::default()
            }
        } else {
            Self::rgb(255, 255, 255)
        }
    }
}

/// Write a target to one fixture's colour channels
pub(crate) fn write_colour(store: &ChannelStore, channels: &ColourChannels, target: &ColourTarget) {
    store.update(&channels.red_channel, target.r);
    store.update(&channels.green_channel, target.g);
    store.update(&channels.blue_channel, target.b);

    let extended = [
        (channels.white_channel, target.w),
        (channels.amber_channel, target.a),
        (channels.uv_channel, target.uv),
    ];
    for (channel, level) in extended {
        if let Some(channel) = channel {
            store.update(&channel, level.unwrap_or(0));
        }
    }
}

impl DerivedProperty<Colour> {
    /// Write every colour channel of the fixture
    pub fn set(&self, target: ColourTarget) {
        write_colour(self.store(), self.derivation().channels(), &target);
    }

    /// Write an RGB colour and switch the extended emitters off
    pub fn set_rgb(&self, r: ChannelValue, g: ChannelValue, b: ChannelValue) {
        self.set(ColourTarget::rgb(r, g, b));
    }

    /// Full white without stale RGB alongside it
    pub fn set_white(&self) {
        self.set(ColourTarget::white_for(self.derivation().channels()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{ch, set, store};

    fn rgbwauv() -> ColourChannels {
        ColourChannels::rgb(ch(1), ch(2), ch(3))
            .with_white(ch(4))
            .with_amber(ch(5))
            .with_uv(ch(6))
    }

    #[test]
    fn css_is_the_raw_rgb() {
        let value = ColourValue::new(10, 20, 30, Some(255), None, None);
        assert_eq!(value.css, "rgb(10, 20, 30)");
    }

    #[test]
    fn full_white_blends_to_white() {
        assert_eq!(blend_extended(0, 0, 0, Some(255), None, None), "rgb(255, 255, 255)");
    }

    #[test]
    fn half_white_moves_halfway() {
        assert_eq!(blend_extended(0, 100, 255, Some(128), None, None), "rgb(128, 178, 255)");
    }

    #[test]
    fn full_amber_is_warm_orange() {
        assert_eq!(blend_extended(0, 0, 0, None, Some(255), None), "rgb(255, 191, 0)");
    }

    #[test]
    fn full_uv_is_violet() {
        assert_eq!(blend_extended(0, 0, 0, None, None, Some(255)), "rgb(139, 0, 255)");
        assert_eq!(blend_extended(0, 100, 0, None, None, Some(255)), "rgb(139, 80, 255)");
    }

    #[test]
    fn emitters_compose_in_order() {
        // White saturates everything first, UV then pulls red and green down
        assert_eq!(
            blend_extended(0, 0, 0, Some(255), None, Some(255)),
            "rgb(139, 204, 255)"
        );
    }

    #[test]
    fn without_extended_emitters_combined_matches_css() {
        let value = ColourValue::new(12, 34, 56, None, None, None);
        assert_eq!(value.combined_css, value.css);
    }

    #[tokio::test]
    async fn snapshot_reads_every_channel() {
        let (store, _) = store();
        let colour = DerivedProperty::new(store.clone(), Colour::new(rgbwauv()));
        set(&store, &[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6)]);

        let value = colour.snapshot();
        assert_eq!((value.r, value.g, value.b), (1, 2, 3));
        assert_eq!((value.w, value.a, value.uv), (Some(4), Some(5), Some(6)));
    }

    #[tokio::test]
    async fn white_uses_the_white_emitter_and_clears_the_rest() {
        let (store, writer) = store();
        let colour = DerivedProperty::new(store, Colour::new(rgbwauv()));

        colour.set_white();
        assert_eq!(
            writer.writes(),
            vec![(1, 0), (2, 0), (3, 0), (4, 255), (5, 0), (6, 0)]
        );
    }

    #[tokio::test]
    async fn white_without_a_white_emitter_is_full_rgb() {
        let (store, writer) = store();
        let colour = DerivedProperty::new(store, Colour::new(ColourChannels::rgb(ch(1), ch(2), ch(3))));

        colour.set_white();
        assert_eq!(writer.writes(), vec![(1, 255), (2, 255), (3, 255)]);
    }

    #[tokio::test]
    async fn rgb_write_switches_extended_emitters_off() {
        let (store, writer) = store();
        let colour = DerivedProperty::new(store, Colour::new(rgbwauv()));

        colour.set_rgb(255, 0, 128);
        assert_eq!(
            writer.writes(),
            vec![(1, 255), (2, 0), (3, 128), (4, 0), (5, 0), (6, 0)]
        );
    }
}
