//! # padloop-types
//!
//! Shared type definitions for the padloop instrument core.
//! Plain data only: pad identifiers, arpeggiator patterns, loop events,
//! looper states and scales. Behavior lives in padloop-core.

mod arpeggiator;
mod looper;
mod music;

pub use arpeggiator::ArpPattern;
pub use looper::{LoopEvent, LoopEventKind, LooperState};
pub use music::{Key, Scale};

/// Number of physical pads on the instrument.
pub const PAD_COUNT: usize = 12;

/// Highest valid MIDI note number.
pub const MIDI_NOTE_MAX: u8 = 127;

/// Identifier of a physical pad. Always in `0..PAD_COUNT`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PadId(u8);

impl PadId {
    /// Returns `None` for ids outside the pad range.
    pub fn new(id: u8) -> Option<Self> {
        if (id as usize) < PAD_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over every pad in id order.
    pub fn all() -> impl Iterator<Item = PadId> {
        (0..PAD_COUNT as u8).map(PadId)
    }
}

impl std::fmt::Display for PadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_id_rejects_out_of_range() {
        assert!(PadId::new(11).is_some());
        assert!(PadId::new(12).is_none());
        assert!(PadId::new(255).is_none());
    }

    #[test]
    fn all_pads_are_in_order() {
        let ids: Vec<u8> = PadId::all().map(PadId::get).collect();
        assert_eq!(ids, (0..12).collect::<Vec<u8>>());
    }
}
