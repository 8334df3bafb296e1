use serde::{Deserialize, Serialize};

/// Traversal pattern used by the step arpeggiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArpPattern {
    #[default]
    Off,
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpPattern {
    pub const ALL: [ArpPattern; 5] = [
        ArpPattern::Off,
        ArpPattern::Up,
        ArpPattern::Down,
        ArpPattern::UpDown,
        ArpPattern::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArpPattern::Off => "Off",
            ArpPattern::Up => "Up",
            ArpPattern::Down => "Down",
            ArpPattern::UpDown => "Up/Down",
            ArpPattern::Random => "Random",
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, ArpPattern::Off)
    }

    pub fn next(&self) -> ArpPattern {
        match self {
            ArpPattern::Off => ArpPattern::Up,
            ArpPattern::Up => ArpPattern::Down,
            ArpPattern::Down => ArpPattern::UpDown,
            ArpPattern::UpDown => ArpPattern::Random,
            ArpPattern::Random => ArpPattern::Off,
        }
    }

    pub fn prev(&self) -> ArpPattern {
        match self {
            ArpPattern::Off => ArpPattern::Random,
            ArpPattern::Up => ArpPattern::Off,
            ArpPattern::Down => ArpPattern::Up,
            ArpPattern::UpDown => ArpPattern::Down,
            ArpPattern::Random => ArpPattern::UpDown,
        }
    }

    /// Parse the names used in config files (`"up-down"`, `"random"`, ...).
    pub fn parse(s: &str) -> Option<ArpPattern> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Some(ArpPattern::Off),
            "up" => Some(ArpPattern::Up),
            "down" => Some(ArpPattern::Down),
            "up-down" | "updown" | "up/down" => Some(ArpPattern::UpDown),
            "random" => Some(ArpPattern::Random),
            _ => None,
        }
    }
}
