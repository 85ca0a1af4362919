use crate::types::{ChannelRef, WireId};

/// Maps channel references to the flat ids the server speaks
///
/// The lighting server owns universe enumeration; integrators plug in the
/// scheme their server uses.
pub trait ChannelAddressing: Send + Sync {
    /// Flat wire id for a channel
    fn to_wire(&self, channel: &ChannelRef) -> WireId;

    /// Channel for a flat wire id
    fn from_wire(&self, id: WireId) -> ChannelRef;
}

/// Universes laid end to end, channels numbered from 1 within each universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearAddressing {
    pub universe_size: u32,
    pub first_universe: u32,
}

impl LinearAddressing {
    pub fn new(universe_size: u32, first_universe: u32) -> Self {
        Self {
            universe_size: universe_size.max(1),
            first_universe,
        }
    }
}

impl Default for LinearAddressing {
    fn default() -> Self {
        Self::new(512, 1)
    }
}

impl ChannelAddressing for LinearAddressing {
    fn to_wire(&self, channel: &ChannelRef) -> WireId {
        let offset = channel.universe.saturating_sub(self.first_universe);
        offset
            .saturating_mul(self.universe_size)
            .saturating_add(channel.channel_no)
    }

    fn from_wire(&self, id: WireId) -> ChannelRef {
        // id 0 has no 1-based channel; keep it in the first universe
        if id == 0 {
            return ChannelRef::new(self.first_universe, 0);
        }
        let index = id - 1;
        ChannelRef::new(
            self.first_universe + index / self.universe_size,
            index % self.universe_size + 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_universe_maps_one_to_one() {
        let addressing = LinearAddressing::default();
        assert_eq!(addressing.to_wire(&ChannelRef::new(1, 5)), 5);
        assert_eq!(addressing.from_wire(5), ChannelRef::new(1, 5));
        assert_eq!(addressing.from_wire(512), ChannelRef::new(1, 512));
    }

    #[test]
    fn later_universes_are_offset() {
        let addressing = LinearAddressing::default();
        assert_eq!(addressing.to_wire(&ChannelRef::new(2, 1)), 513);
        assert_eq!(addressing.from_wire(513), ChannelRef::new(2, 1));
        assert_eq!(addressing.from_wire(1024), ChannelRef::new(2, 512));
    }

    #[test]
    fn every_id_round_trips() {
        let addressing = LinearAddressing::new(16, 0);
        for id in 1..100 {
            let channel = addressing.from_wire(id);
            assert_eq!(addressing.to_wire(&channel), id);
        }
    }
}
