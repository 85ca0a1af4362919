use crate::descriptor::GroupColourDescriptor;
use crate::property::{blend_extended, write_colour, Colour, ColourTarget, ColourValue, Derivation, DerivedProperty};
use crate::store::ChannelStore;
use crate::types::{clamp_level, ChannelRef, ChannelValue};

/// The same colour property across every group member
#[derive(Debug, Clone)]
pub struct GroupColour {
    descriptor: GroupColourDescriptor,
}

/// Average colour of the group
///
/// An extended average is `None` when no member has that emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupColourValue {
    pub avg_r: ChannelValue,
    pub avg_g: ChannelValue,
    pub avg_b: ChannelValue,
    pub avg_w: Option<ChannelValue>,
    pub avg_a: Option<ChannelValue>,
    pub avg_uv: Option<ChannelValue>,
    /// Every member has exactly the same levels
    pub is_uniform: bool,
    pub combined_css: String,
    /// The shared colour, or `"Mixed"`
    pub display_text: String,
}

fn average(levels: impl Iterator<Item = ChannelValue>) -> Option<ChannelValue> {
    let (sum, count) = levels.fold((0u32, 0u32), |(sum, count), level| (sum + u32::from(level), count + 1));
    (count > 0).then(|| clamp_level(f64::from(sum) / f64::from(count)))
}

impl GroupColour {
    pub fn new(descriptor: GroupColourDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &GroupColourDescriptor {
        &self.descriptor
    }
}

impl Derivation for GroupColour {
    type Value = GroupColourValue;

    fn channels(&self) -> Vec<ChannelRef> {
        self.descriptor
            .member_colour_channels
            .iter()
            .flat_map(|member| member.all())
            .collect()
    }

    fn derive(&self, store: &ChannelStore) -> GroupColourValue {
        let members: Vec<ColourValue> = self
            .descriptor
            .member_colour_channels
            .iter()
            .map(|member| Colour::new(*member).derive(store))
            .collect();

        // A missing emitter reads as dark
        let levels = |member: &ColourValue| {
            (
                member.r,
                member.g,
                member.b,
                member.w.unwrap_or(0),
                member.a.unwrap_or(0),
                member.uv.unwrap_or(0),
            )
        };
        let is_uniform = members.windows(2).all(|pair| levels(&pair[0]) == levels(&pair[1]));
        let avg_r = average(members.iter().map(|member| member.r)).unwrap_or(0);
        let avg_g = average(members.iter().map(|member| member.g)).unwrap_or(0);
        let avg_b = average(members.iter().map(|member| member.b)).unwrap_or(0);
        let avg_w = average(members.iter().filter_map(|member| member.w));
        let avg_a = average(members.iter().filter_map(|member| member.a));
        let avg_uv = average(members.iter().filter_map(|member| member.uv));

        let display_text = if is_uniform {
            format!("rgb({}, {}, {})", avg_r, avg_g, avg_b)
        } else {
            "Mixed".to_string()
        };

        GroupColourValue {
            avg_r,
            avg_g,
            avg_b,
            avg_w,
            avg_a,
            avg_uv,
            is_uniform,
            combined_css: blend_extended(avg_r, avg_g, avg_b, avg_w, avg_a, avg_uv),
            display_text,
        }
    }
}

impl DerivedProperty<GroupColour> {
    /// Write the same colour to every member
    pub fn set(&self, target: ColourTarget) {
        for member in &self.derivation().descriptor().member_colour_channels {
            write_colour(self.store(), member, &target);
        }
    }

    /// Write the same RGB levels to every member, with extended emitters off
    pub fn set_rgb(&self, r: ChannelValue, g: ChannelValue, b: ChannelValue) {
        self.set(ColourTarget::rgb(r, g, b));
    }

    /// Full white on each member, using its white emitter when it has one
    pub fn set_white(&self) {
        for member in &self.derivation().descriptor().member_colour_channels {
            write_colour(self.store(), member, &ColourTarget::white_for(member));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ColourChannels;
    use crate::store::test_support::{ch, set, store};

    fn pair() -> GroupColourDescriptor {
        GroupColourDescriptor {
            member_colour_channels: vec![
                ColourChannels::rgb(ch(1), ch(2), ch(3)).with_white(ch(4)),
                ColourChannels::rgb(ch(5), ch(6), ch(7)),
            ],
        }
    }

    #[tokio::test]
    async fn mixed_members_average_per_channel() {
        let (store, _) = store();
        let colour = DerivedProperty::new(store.clone(), GroupColour::new(pair()));
        set(&store, &[(1, 255), (3, 0), (7, 255), (4, 100)]);

        let value = colour.snapshot();
        assert!(!value.is_uniform);
        assert_eq!((value.avg_r, value.avg_g, value.avg_b), (128, 0, 128));
        assert_eq!(value.avg_w, Some(100));
        assert_eq!(value.avg_a, None);
        assert_eq!(value.display_text, "Mixed");
    }

    #[tokio::test]
    async fn identical_members_are_uniform() {
        let (store, _) = store();
        let descriptor = GroupColourDescriptor {
            member_colour_channels: vec![
                ColourChannels::rgb(ch(1), ch(2), ch(3)),
                ColourChannels::rgb(ch(5), ch(6), ch(7)),
            ],
        };
        let colour = DerivedProperty::new(store.clone(), GroupColour::new(descriptor));
        set(&store, &[(1, 10), (2, 20), (3, 30), (5, 10), (6, 20), (7, 30)]);

        let value = colour.snapshot();
        assert!(value.is_uniform);
        assert_eq!(value.display_text, "rgb(10, 20, 30)");
        assert_eq!(value.combined_css, "rgb(10, 20, 30)");
    }

    #[tokio::test]
    async fn members_with_different_emitters_can_still_match() {
        let (store, _) = store();
        let colour = DerivedProperty::new(store.clone(), GroupColour::new(pair()));

        // All dark
        let value = colour.snapshot();
        assert!(value.is_uniform);
        assert_eq!(value.display_text, "rgb(0, 0, 0)");

        // Same RGB, unlit white on the RGBW member
        set(&store, &[(1, 40), (2, 50), (3, 60), (5, 40), (6, 50), (7, 60)]);
        let value = colour.snapshot();
        assert!(value.is_uniform);
        assert_eq!(value.display_text, "rgb(40, 50, 60)");

        // Lit white has no counterpart on the RGB member
        set(&store, &[(4, 90)]);
        assert!(!colour.snapshot().is_uniform);
    }

    #[tokio::test]
    async fn white_is_per_member() {
        let (store, writer) = store();
        let colour = DerivedProperty::new(store, GroupColour::new(pair()));

        colour.set_white();
        assert_eq!(
            writer.writes(),
            vec![(1, 0), (2, 0), (3, 0), (4, 255), (5, 255), (6, 255), (7, 255)]
        );
    }

    #[tokio::test]
    async fn rgb_write_fans_out() {
        let (store, writer) = store();
        let colour = DerivedProperty::new(store, GroupColour::new(pair()));

        colour.set_rgb(1, 2, 3);
        assert_eq!(
            writer.writes(),
            vec![(1, 1), (2, 2), (3, 3), (4, 0), (5, 1), (6, 2), (7, 3)]
        );
    }
}
