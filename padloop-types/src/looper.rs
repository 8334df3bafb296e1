use serde::{Deserialize, Serialize};

/// Externally visible looper state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LooperState {
    #[default]
    Disabled,
    Idle,
    Recording,
    Playing,
    Paused,
}

impl LooperState {
    pub fn name(&self) -> &'static str {
        match self {
            LooperState::Disabled => "Disabled",
            LooperState::Idle => "Idle",
            LooperState::Recording => "Recording",
            LooperState::Playing => "Playing",
            LooperState::Paused => "Paused",
        }
    }
}

/// Payload of a recorded performance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopEventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
    /// -8192 (full down) to +8191 (full up), 0 = center
    PitchBend { value: i16 },
}

/// A performance event stamped relative to the start of its recording pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopEvent {
    pub timestamp_ms: u32,
    pub kind: LoopEventKind,
}

impl LoopEvent {
    pub fn new(timestamp_ms: u32, kind: LoopEventKind) -> Self {
        Self { timestamp_ms, kind }
    }
}
