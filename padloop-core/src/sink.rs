//! Sound output seam.
//!
//! `NoteSink` captures what the core *means* to play (start a note, stop a
//! note, move a controller) independently of the synthesis engine behind it.
//! Both engines receive the sink as a parameter on every call that can make
//! sound, so the embedding system owns exactly one.

pub trait NoteSink {
    fn note_on(&mut self, note: u8, velocity: u8);

    fn note_off(&mut self, note: u8);

    fn control_change(&mut self, controller: u8, value: u8);

    /// -8192 (full down) to +8191 (full up), 0 = center
    fn pitch_bend(&mut self, value: i16);

    /// Emergency stop. Must silence everything regardless of what the caller
    /// believes is sounding.
    fn all_notes_off(&mut self);
}

impl<T: NoteSink + ?Sized> NoteSink for &mut T {
    fn note_on(&mut self, note: u8, velocity: u8) {
        (**self).note_on(note, velocity)
    }

    fn note_off(&mut self, note: u8) {
        (**self).note_off(note)
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        (**self).control_change(controller, value)
    }

    fn pitch_bend(&mut self, value: i16) {
        (**self).pitch_bend(value)
    }

    fn all_notes_off(&mut self) {
        (**self).all_notes_off()
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NoteSink for NullSink {
    fn note_on(&mut self, _note: u8, _velocity: u8) {}
    fn note_off(&mut self, _note: u8) {}
    fn control_change(&mut self, _controller: u8, _value: u8) {}
    fn pitch_bend(&mut self, _value: i16) {}
    fn all_notes_off(&mut self) {}
}

// ─── Test Sink ──────────────────────────────────────────────────────

/// An operation recorded by `TestSink` for assertion in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOp {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
    PitchBend { value: i16 },
    AllNotesOff,
}

/// A sink that records every operation for assertions.
#[derive(Debug, Default, Clone)]
pub struct TestSink {
    ops: Vec<SinkOp>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> &[SinkOp] {
        &self.ops
    }

    /// Clear recorded operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&SinkOp) -> bool>(&self, f: F) -> usize {
        self.operations().iter().filter(|op| f(op)).count()
    }

    /// Notes started, in order.
    pub fn notes_on(&self) -> Vec<u8> {
        self.operations()
            .iter()
            .filter_map(|op| match op {
                SinkOp::NoteOn { note, .. } => Some(*note),
                _ => None,
            })
            .collect()
    }

    /// Notes stopped, in order.
    pub fn notes_off(&self) -> Vec<u8> {
        self.operations()
            .iter()
            .filter_map(|op| match op {
                SinkOp::NoteOff { note } => Some(*note),
                _ => None,
            })
            .collect()
    }

    /// Notes that were started more often than they were stopped.
    pub fn sounding(&self) -> Vec<u8> {
        let mut balance = [0i32; 128];
        for op in &self.ops {
            match *op {
                SinkOp::NoteOn { note, .. } => balance[note as usize & 0x7f] += 1,
                SinkOp::NoteOff { note } => balance[note as usize & 0x7f] -= 1,
                SinkOp::AllNotesOff => balance = [0; 128],
                _ => {}
            }
        }
        (0..128u8).filter(|n| balance[*n as usize] > 0).collect()
    }

    fn push(&mut self, op: SinkOp) {
        self.ops.push(op);
    }
}

impl NoteSink for TestSink {
    fn note_on(&mut self, note: u8, velocity: u8) {
        self.push(SinkOp::NoteOn { note, velocity });
    }

    fn note_off(&mut self, note: u8) {
        self.push(SinkOp::NoteOff { note });
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        self.push(SinkOp::ControlChange { controller, value });
    }

    fn pitch_bend(&mut self, value: i16) {
        self.push(SinkOp::PitchBend { value });
    }

    fn all_notes_off(&mut self) {
        self.push(SinkOp::AllNotesOff);
    }
}
