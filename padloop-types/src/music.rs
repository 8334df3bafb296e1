use serde::{Deserialize, Serialize};

use crate::{PadId, MIDI_NOTE_MAX};

/// Musical key (pitch class)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Key {
    #[default]
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::C,
        Key::Cs,
        Key::D,
        Key::Ds,
        Key::E,
        Key::F,
        Key::Fs,
        Key::G,
        Key::Gs,
        Key::A,
        Key::As,
        Key::B,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Key::C => "C",
            Key::Cs => "C#",
            Key::D => "D",
            Key::Ds => "D#",
            Key::E => "E",
            Key::F => "F",
            Key::Fs => "F#",
            Key::G => "G",
            Key::Gs => "G#",
            Key::A => "A",
            Key::As => "A#",
            Key::B => "B",
        }
    }

    pub fn semitone(&self) -> u8 {
        Key::ALL.iter().position(|k| k == self).unwrap_or(0) as u8
    }

    pub fn parse(s: &str) -> Option<Key> {
        match s.trim() {
            "C" => Some(Key::C),
            "C#" | "Cs" | "Db" => Some(Key::Cs),
            "D" => Some(Key::D),
            "D#" | "Ds" | "Eb" => Some(Key::Ds),
            "E" => Some(Key::E),
            "F" => Some(Key::F),
            "F#" | "Fs" | "Gb" => Some(Key::Fs),
            "G" => Some(Key::G),
            "G#" | "Gs" | "Ab" => Some(Key::Gs),
            "A" => Some(Key::A),
            "A#" | "As" | "Bb" => Some(Key::As),
            "B" => Some(Key::B),
            _ => None,
        }
    }

    /// MIDI note of this key in the given octave (C4 = 60), saturating at 127.
    pub fn midi_note(&self, octave: u8) -> u8 {
        let note = (octave as u16 + 1) * 12 + self.semitone() as u16;
        note.min(MIDI_NOTE_MAX as u16) as u8
    }
}

/// Pad layout scale: semitone intervals from the root, one pad per degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scale {
    Major,
    NaturalMinor,
    HarmonicMinor,
    Dorian,
    Lydian,
    Mixolydian,
    Locrian,
    Phrygian,
    PhrygianDominant,
    #[default]
    PentatonicMajor,
    PentatonicMinor,
    PentatonicBlues,
    Arabian,
    Oriental,
    Japanese,
    Chromatic,
    // Song scales: degrees in melody order, tapped pad by pad
    TwinkleTwinkle,
    HotCrossBuns,
    MaryHadALamb,
    JingleBells,
}

impl Scale {
    pub const ALL: [Scale; 20] = [
        Scale::Major,
        Scale::NaturalMinor,
        Scale::HarmonicMinor,
        Scale::Dorian,
        Scale::Lydian,
        Scale::Mixolydian,
        Scale::Locrian,
        Scale::Phrygian,
        Scale::PhrygianDominant,
        Scale::PentatonicMajor,
        Scale::PentatonicMinor,
        Scale::PentatonicBlues,
        Scale::Arabian,
        Scale::Oriental,
        Scale::Japanese,
        Scale::Chromatic,
        Scale::TwinkleTwinkle,
        Scale::HotCrossBuns,
        Scale::MaryHadALamb,
        Scale::JingleBells,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scale::Major => "Major",
            Scale::NaturalMinor => "Natural Minor",
            Scale::HarmonicMinor => "Harmonic Minor",
            Scale::Dorian => "Dorian",
            Scale::Lydian => "Lydian",
            Scale::Mixolydian => "Mixolydian",
            Scale::Locrian => "Locrian",
            Scale::Phrygian => "Phrygian",
            Scale::PhrygianDominant => "Phrygian Dominant",
            Scale::PentatonicMajor => "Pentatonic Major",
            Scale::PentatonicMinor => "Pentatonic Minor",
            Scale::PentatonicBlues => "Blues",
            Scale::Arabian => "Arabian",
            Scale::Oriental => "Oriental",
            Scale::Japanese => "Japanese",
            Scale::Chromatic => "Chromatic",
            Scale::TwinkleTwinkle => "Twinkle Twinkle",
            Scale::HotCrossBuns => "Hot Cross Buns",
            Scale::MaryHadALamb => "Mary Had a Lamb",
            Scale::JingleBells => "Jingle Bells",
        }
    }

    /// Semitone intervals from root for this scale
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::PhrygianDominant => &[0, 1, 4, 5, 7, 8, 10],
            Scale::PentatonicMajor => &[0, 2, 4, 7, 9],
            Scale::PentatonicMinor => &[0, 3, 5, 7, 10],
            Scale::PentatonicBlues => &[0, 3, 5, 6, 7, 10],
            Scale::Arabian => &[0, 2, 3, 5, 6, 8, 9, 11],
            Scale::Oriental => &[0, 1, 4, 5, 6, 8, 10],
            Scale::Japanese => &[0, 1, 5, 7, 8],
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::TwinkleTwinkle => &[0, 0, 7, 7, 9, 9, 7, 5, 5, 4, 4, 2],
            Scale::HotCrossBuns => &[4, 4, 2, 2, 0, 4, 4, 2, 2, 0, 4, 7],
            Scale::MaryHadALamb => &[4, 2, 0, 2, 4, 4, 4, 2, 2, 2, 4, 4],
            Scale::JingleBells => &[4, 4, 4, 4, 4, 4, 4, 7, 0, 2, 4],
        }
    }

    /// Song scales repeat degrees, so pads are not in ascending pitch order.
    pub fn is_song(&self) -> bool {
        matches!(
            self,
            Scale::TwinkleTwinkle | Scale::HotCrossBuns | Scale::MaryHadALamb | Scale::JingleBells
        )
    }

    pub fn next(&self) -> Scale {
        let idx = Scale::ALL.iter().position(|s| s == self).unwrap_or(0);
        Scale::ALL[(idx + 1) % Scale::ALL.len()]
    }

    pub fn prev(&self) -> Scale {
        let idx = Scale::ALL.iter().position(|s| s == self).unwrap_or(0);
        Scale::ALL[(idx + Scale::ALL.len() - 1) % Scale::ALL.len()]
    }

    /// Look up a scale by its display name, ignoring case, spaces and dashes.
    pub fn parse(s: &str) -> Option<Scale> {
        let wanted = normalize(s);
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| normalize(scale.name()) == wanted)
    }

    /// Base pitch of a pad: pad `i` plays degree `i mod len`, one octave up per
    /// wrap around the scale. Saturates at the top of the MIDI range.
    pub fn note_for_pad(&self, root: u8, pad: PadId) -> u8 {
        let intervals = self.intervals();
        let len = intervals.len();
        let degree = intervals[pad.index() % len] as u16;
        let octave = (pad.index() / len) as u16;
        let note = root as u16 + degree + octave * 12;
        note.min(MIDI_NOTE_MAX as u16) as u8
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
