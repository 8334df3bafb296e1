//! Configuration getters consumed by the engines.

use padloop_types::{ArpPattern, Key, PadId, Scale};

use crate::arpeggiator::{ARP_GATE_PERCENT, ARP_SPEED_DEFAULT_MS, ARP_SPEED_MAX_MS, ARP_SPEED_MIN_MS};

/// Read-only view of the arpeggiator and pad configuration.
///
/// Values may be out of range; the arpeggiator clamps them before use.
pub trait ArpSettings {
    fn pattern(&self) -> ArpPattern;

    /// Requested step interval in milliseconds.
    fn speed_ms(&self) -> u32;

    /// Hard floor and ceiling for the step interval.
    fn speed_bounds_ms(&self) -> (u32, u32) {
        (ARP_SPEED_MIN_MS, ARP_SPEED_MAX_MS)
    }

    /// Number of octaves to span, 1-3.
    fn octave_span(&self) -> u8;

    /// Gate length as a percentage of the step interval.
    fn gate_percent(&self) -> u8 {
        ARP_GATE_PERCENT
    }

    /// Base MIDI pitch of a pad.
    fn note_for_pad(&self, pad: PadId) -> u8;
}

/// Live, front-panel editable settings of the instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSettings {
    pub arp_pattern: ArpPattern,
    pub arp_speed_ms: u32,
    pub arp_speed_min_ms: u32,
    pub arp_speed_max_ms: u32,
    pub arp_octaves: u8,
    pub arp_gate_percent: u8,
    pub key: Key,
    pub octave: u8,
    pub scale: Scale,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            arp_pattern: ArpPattern::Off,
            arp_speed_ms: ARP_SPEED_DEFAULT_MS,
            arp_speed_min_ms: ARP_SPEED_MIN_MS,
            arp_speed_max_ms: ARP_SPEED_MAX_MS,
            arp_octaves: 1,
            arp_gate_percent: ARP_GATE_PERCENT,
            key: Key::C,
            octave: 4,
            scale: Scale::default(),
        }
    }
}

impl InstrumentSettings {
    pub fn root_note(&self) -> u8 {
        self.key.midi_note(self.octave)
    }

    pub fn cycle_pattern(&mut self) -> ArpPattern {
        self.arp_pattern = self.arp_pattern.next();
        self.arp_pattern
    }

    pub fn cycle_scale(&mut self) -> Scale {
        self.scale = self.scale.next();
        self.scale
    }
}

impl ArpSettings for InstrumentSettings {
    fn pattern(&self) -> ArpPattern {
        self.arp_pattern
    }

    fn speed_ms(&self) -> u32 {
        self.arp_speed_ms
    }

    fn speed_bounds_ms(&self) -> (u32, u32) {
        let floor = self.arp_speed_min_ms.max(1);
        (floor, self.arp_speed_max_ms.max(floor))
    }

    fn octave_span(&self) -> u8 {
        self.arp_octaves
    }

    fn gate_percent(&self) -> u8 {
        self.arp_gate_percent
    }

    fn note_for_pad(&self, pad: PadId) -> u8 {
        self.scale.note_for_pad(self.root_note(), pad)
    }
}
