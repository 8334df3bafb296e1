//! Step arpeggiator.
//!
//! Plays one note at a time from the set of held pads, walking the pads in
//! pitch order (or at random) across an octave span. Every note it starts or
//! stops is also handed to a `NoteRecorder`, normally the looper, exactly as a
//! manual key press would be.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use padloop_types::{ArpPattern, PadId, MIDI_NOTE_MAX, PAD_COUNT};

use crate::held_pads::HeldPads;
use crate::settings::ArpSettings;
use crate::sink::NoteSink;

/// Fastest allowed step interval.
pub const ARP_SPEED_MIN_MS: u32 = 50;
/// Slowest allowed step interval.
pub const ARP_SPEED_MAX_MS: u32 = 2000;
/// 120 BPM eighth notes.
pub const ARP_SPEED_DEFAULT_MS: u32 = 500;
/// Gate length as percentage of the step interval.
pub const ARP_GATE_PERCENT: u8 = 80;
/// Largest octave span.
pub const ARP_MAX_OCTAVES: u8 = 3;

const DEFAULT_VELOCITY: u8 = 100;

/// Recording entry point fed with every generated note.
pub trait NoteRecorder {
    fn record_note(&mut self, note: u8, velocity: u8, is_on: bool, now_us: u64);
}

impl<T: NoteRecorder + ?Sized> NoteRecorder for &mut T {
    fn record_note(&mut self, note: u8, velocity: u8, is_on: bool, now_us: u64) {
        (**self).record_note(note, velocity, is_on, now_us)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

/// Position in the pattern: index into the pitch-sorted held pads, octave
/// index, and travel direction (only meaningful for up-down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    step: usize,
    octave: u8,
    direction: Direction,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            step: 0,
            octave: 0,
            direction: Direction::Ascending,
        }
    }
}

/// The single note currently gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingNote {
    pub note: u8,
    pub pad: PadId,
    pub started_ms: u64,
}

pub struct Arpeggiator {
    held: HeldPads,
    velocity: u8,
    cursor: Cursor,
    sounding: Option<SoundingNote>,
    last_step_ms: u64,
    rng: SmallRng,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new()
    }
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Deterministic random pattern, for tests and reproducible demos.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            held: HeldPads::new(),
            velocity: DEFAULT_VELOCITY,
            cursor: Cursor::default(),
            sounding: None,
            last_step_ms: 0,
            rng,
        }
    }

    /// Add a pad to the held set. The first held pad starts the pattern from
    /// the beginning and plays its first step right away.
    pub fn pad_on<S, R>(
        &mut self,
        pad_id: u8,
        velocity: u8,
        now_us: u64,
        settings: &impl ArpSettings,
        sink: &mut S,
        recorder: &mut R,
    ) where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        let Some(pad) = PadId::new(pad_id) else {
            return;
        };
        let added = self.held.insert(pad);
        self.velocity = velocity;

        if added && self.held.len() == 1 {
            self.cursor = Cursor::default();
            self.last_step_ms = now_us / 1000;
            self.play_next_step(now_us, settings, sink, recorder);
        }
    }

    /// Remove a pad. Releasing the last one silences the arpeggiator at once.
    pub fn pad_off<S, R>(&mut self, pad_id: u8, now_us: u64, sink: &mut S, recorder: &mut R)
    where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        let Some(pad) = PadId::new(pad_id) else {
            return;
        };
        self.held.remove(pad);

        if self.held.is_empty() {
            self.stop_current_note(now_us, sink, recorder);
            self.cursor = Cursor::default();
        }
    }

    /// Stop the sounding note and forget all held pads.
    pub fn stop<S, R>(&mut self, now_us: u64, sink: &mut S, recorder: &mut R)
    where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        self.stop_current_note(now_us, sink, recorder);
        self.held.clear();
        self.cursor = Cursor::default();
        log::debug!(target: "arp", "stopped");
    }

    /// Emergency silence: does not consult or record the sounding note.
    pub fn all_notes_off<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        sink.all_notes_off();
        self.sounding = None;
    }

    /// Advance gate and step timing. Call once per control-loop tick.
    pub fn poll<S, R>(
        &mut self,
        now_us: u64,
        settings: &impl ArpSettings,
        sink: &mut S,
        recorder: &mut R,
    ) where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        if settings.pattern().is_off() || self.held.is_empty() {
            return;
        }

        let now_ms = now_us / 1000;
        let interval = interval_ms(settings) as u64;
        let gate = interval * settings.gate_percent().clamp(1, 100) as u64 / 100;

        if let Some(sounding) = self.sounding {
            if now_ms.saturating_sub(sounding.started_ms) >= gate {
                self.stop_current_note(now_us, sink, recorder);
            }
        }

        if now_ms.saturating_sub(self.last_step_ms) >= interval {
            self.last_step_ms = now_ms;
            self.play_next_step(now_us, settings, sink, recorder);
        }
    }

    pub fn is_enabled(&self, settings: &impl ArpSettings) -> bool {
        !settings.pattern().is_off()
    }

    pub fn is_active(&self, settings: &impl ArpSettings) -> bool {
        self.is_enabled(settings) && !self.held.is_empty()
    }

    pub fn held_pads(&self) -> &HeldPads {
        &self.held
    }

    pub fn sounding_note(&self) -> Option<SoundingNote> {
        self.sounding
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    fn play_next_step<S, R>(
        &mut self,
        now_us: u64,
        settings: &impl ArpSettings,
        sink: &mut S,
        recorder: &mut R,
    ) where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        let Some((pad, octave)) = self.next_step(settings) else {
            return;
        };

        self.stop_current_note(now_us, sink, recorder);

        let note = transpose(settings.note_for_pad(pad), octave);
        sink.note_on(note, self.velocity);
        self.sounding = Some(SoundingNote {
            note,
            pad,
            started_ms: now_us / 1000,
        });
        recorder.record_note(note, self.velocity, true, now_us);
        log::trace!(target: "arp", "step pad {} octave {} -> note {}", pad, octave, note);
    }

    fn stop_current_note<S, R>(&mut self, now_us: u64, sink: &mut S, recorder: &mut R)
    where
        S: NoteSink + ?Sized,
        R: NoteRecorder + ?Sized,
    {
        if let Some(sounding) = self.sounding.take() {
            sink.note_off(sounding.note);
            recorder.record_note(sounding.note, 0, false, now_us);
        }
    }

    /// Pick the next (pad, octave) and advance the cursor.
    fn next_step(&mut self, settings: &impl ArpSettings) -> Option<(PadId, u8)> {
        if self.held.is_empty() {
            return None;
        }

        let mut sorted = [PadId::new(0)?; PAD_COUNT];
        let count = self
            .held
            .sorted_by_pitch(&mut sorted, |p| settings.note_for_pad(p));
        if count == 0 {
            return None;
        }
        let sorted = &sorted[..count];
        let octaves = settings.octave_span().clamp(1, ARP_MAX_OCTAVES);

        // Pads may have been released, or the span shrunk, since the last step.
        if self.cursor.step >= count {
            self.cursor.step = 0;
        }
        if self.cursor.octave >= octaves {
            self.cursor.octave = 0;
        }

        let cur = &mut self.cursor;
        let step = match settings.pattern() {
            ArpPattern::Off => return None,
            ArpPattern::Up => {
                let step = (sorted[cur.step], cur.octave);
                advance_wrapping(cur, count, octaves);
                step
            }
            ArpPattern::Down => {
                let step = (sorted[count - 1 - cur.step], (octaves - 1) - cur.octave);
                advance_wrapping(cur, count, octaves);
                step
            }
            ArpPattern::UpDown => {
                let step = (sorted[cur.step], cur.octave);
                match cur.direction {
                    Direction::Ascending => {
                        cur.step += 1;
                        if cur.step >= count {
                            cur.step = 0;
                            cur.octave += 1;
                            if cur.octave >= octaves {
                                // Top reached: turn around, skipping the note just played.
                                cur.direction = Direction::Descending;
                                cur.octave = octaves - 1;
                                cur.step = if count > 1 { count - 2 } else { 0 };
                            }
                        }
                    }
                    Direction::Descending => {
                        if cur.step == 0 {
                            if cur.octave == 0 {
                                // Bottom reached: turn around, skipping the repeat.
                                cur.direction = Direction::Ascending;
                                cur.step = if count > 1 { 1 } else { 0 };
                            } else {
                                cur.octave -= 1;
                                cur.step = count - 1;
                            }
                        } else {
                            cur.step -= 1;
                        }
                    }
                }
                step
            }
            ArpPattern::Random => {
                let pad = sorted[self.rng.gen_range(0..count)];
                (pad, self.rng.gen_range(0..octaves))
            }
        };
        Some(step)
    }
}

fn advance_wrapping(cur: &mut Cursor, count: usize, octaves: u8) {
    cur.step += 1;
    if cur.step >= count {
        cur.step = 0;
        cur.octave += 1;
        if cur.octave >= octaves {
            cur.octave = 0;
        }
    }
}

/// Step interval clamped into the configured floor and ceiling.
pub fn interval_ms(settings: &impl ArpSettings) -> u32 {
    let (floor, ceiling) = settings.speed_bounds_ms();
    let floor = floor.max(1);
    settings.speed_ms().clamp(floor, ceiling.max(floor))
}

/// Raise a base pitch by whole octaves, saturating at the top of the MIDI range.
pub fn transpose(base: u8, octave: u8) -> u8 {
    (base as u16 + octave as u16 * 12).min(MIDI_NOTE_MAX as u16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{SinkOp, TestSink};

    const PITCHES: [u8; 12] = [60, 64, 67, 72, 48, 50, 52, 53, 55, 57, 59, 62];

    struct FixedSettings {
        pattern: ArpPattern,
        speed_ms: u32,
        octaves: u8,
        pitches: [u8; 12],
    }

    impl FixedSettings {
        fn new(pattern: ArpPattern) -> Self {
            Self {
                pattern,
                speed_ms: 100,
                octaves: 1,
                pitches: PITCHES,
            }
        }
    }

    impl ArpSettings for FixedSettings {
        fn pattern(&self) -> ArpPattern {
            self.pattern
        }
        fn speed_ms(&self) -> u32 {
            self.speed_ms
        }
        fn octave_span(&self) -> u8 {
            self.octaves
        }
        fn note_for_pad(&self, pad: PadId) -> u8 {
            self.pitches[pad.index()]
        }
    }

    #[derive(Default)]
    struct Recorded(Vec<(u8, u8, bool, u64)>);

    impl NoteRecorder for Recorded {
        fn record_note(&mut self, note: u8, velocity: u8, is_on: bool, now_us: u64) {
            self.0.push((note, velocity, is_on, now_us));
        }
    }

    fn ms(t: u64) -> u64 {
        t * 1000
    }

    /// Press `pads` at t=0 and poll once per step interval for `steps` steps.
    fn run(settings: &FixedSettings, pads: &[u8], steps: u64) -> (Arpeggiator, TestSink, Recorded) {
        let mut arp = Arpeggiator::with_seed(7);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        for &p in pads {
            arp.pad_on(p, 100, 0, settings, &mut sink, &mut rec);
        }
        let interval = interval_ms(settings) as u64;
        for k in 1..=steps {
            arp.poll(ms(k * interval), settings, &mut sink, &mut rec);
        }
        (arp, sink, rec)
    }

    #[test]
    fn first_pad_plays_immediately() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let (arp, sink, rec) = run(&settings, &[0], 0);
        assert_eq!(sink.notes_on(), vec![60]);
        assert_eq!(rec.0, vec![(60, 100, true, 0)]);
        assert_eq!(arp.sounding_note().map(|s| s.note), Some(60));
    }

    #[test]
    fn up_cycles_low_to_high() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let (_, sink, _) = run(&settings, &[0, 1, 2], 6);
        assert_eq!(sink.notes_on()[1..], [60, 64, 67, 60, 64, 67]);
    }

    #[test]
    fn down_cycles_high_to_low() {
        let settings = FixedSettings::new(ArpPattern::Down);
        let (_, sink, _) = run(&settings, &[0, 1, 2], 6);
        assert_eq!(sink.notes_on()[1..], [67, 64, 60, 67, 64, 60]);
    }

    #[test]
    fn up_down_does_not_repeat_turnaround_notes() {
        let settings = FixedSettings::new(ArpPattern::UpDown);
        let (_, sink, _) = run(&settings, &[0, 1, 2], 9);
        assert_eq!(sink.notes_on()[1..], [60, 64, 67, 64, 60, 64, 67, 64, 60]);
    }

    #[test]
    fn up_spans_octaves_then_wraps() {
        let settings = FixedSettings {
            octaves: 2,
            ..FixedSettings::new(ArpPattern::Up)
        };
        let (_, sink, _) = run(&settings, &[0, 1, 2], 7);
        assert_eq!(sink.notes_on()[1..], [72, 76, 79, 60, 64, 67, 72]);
    }

    #[test]
    fn down_starts_in_top_octave() {
        let settings = FixedSettings {
            octaves: 2,
            ..FixedSettings::new(ArpPattern::Down)
        };
        let (_, sink, _) = run(&settings, &[2, 1, 0], 6);
        // First press (pad 2 alone) consumed octave 1; the full set starts at octave 0.
        assert_eq!(sink.notes_on()[0], 79);
        assert_eq!(sink.notes_on()[1..4], [67, 64, 60]);
        assert_eq!(sink.notes_on()[4..], [79, 76, 72]);
    }

    #[test]
    fn up_down_spans_octaves() {
        let settings = FixedSettings {
            octaves: 2,
            ..FixedSettings::new(ArpPattern::UpDown)
        };
        let (_, sink, _) = run(&settings, &[0, 1], 10);
        // The single-pad first press leaves the cursor in the upper octave.
        assert_eq!(sink.notes_on()[..2], [60, 72]);
        assert_eq!(sink.notes_on()[2..], [76, 72, 64, 60, 64, 72, 76, 72, 64]);
    }

    #[test]
    fn random_stays_within_held_pads_and_span() {
        let settings = FixedSettings {
            octaves: 3,
            ..FixedSettings::new(ArpPattern::Random)
        };
        let (_, sink, _) = run(&settings, &[0, 1, 2], 200);
        let allowed: Vec<u8> = [60u8, 64, 67]
            .iter()
            .flat_map(|&n| (0..3).map(move |o| n + 12 * o))
            .collect();
        for note in sink.notes_on() {
            assert!(allowed.contains(&note), "unexpected note {note}");
        }
    }

    #[test]
    fn notes_saturate_at_127() {
        let mut pitches = PITCHES;
        pitches[0] = 120;
        let settings = FixedSettings {
            octaves: 3,
            pitches,
            ..FixedSettings::new(ArpPattern::Up)
        };
        let (_, sink, _) = run(&settings, &[0], 3);
        assert_eq!(sink.notes_on(), vec![120, 127, 127, 120]);
    }

    #[test]
    fn gate_closes_at_eighty_percent() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        arp.pad_on(0, 90, 0, &settings, &mut sink, &mut rec);

        arp.poll(ms(79), &settings, &mut sink, &mut rec);
        assert!(arp.sounding_note().is_some());
        arp.poll(ms(80), &settings, &mut sink, &mut rec);
        assert!(arp.sounding_note().is_none());
        assert_eq!(sink.notes_off(), vec![60]);
        assert_eq!(rec.0.last(), Some(&(60, 0, false, ms(80))));
    }

    #[test]
    fn zero_speed_is_clamped_to_floor() {
        let settings = FixedSettings {
            speed_ms: 0,
            ..FixedSettings::new(ArpPattern::Up)
        };
        assert_eq!(interval_ms(&settings), ARP_SPEED_MIN_MS);

        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        arp.pad_on(0, 100, 0, &settings, &mut sink, &mut rec);
        arp.poll(ms(ARP_SPEED_MIN_MS as u64 - 1), &settings, &mut sink, &mut rec);
        assert_eq!(sink.notes_on().len(), 1);
        arp.poll(ms(ARP_SPEED_MIN_MS as u64), &settings, &mut sink, &mut rec);
        assert_eq!(sink.notes_on().len(), 2);
    }

    #[test]
    fn absurd_speed_is_clamped_to_ceiling() {
        let settings = FixedSettings {
            speed_ms: u32::MAX,
            ..FixedSettings::new(ArpPattern::Up)
        };
        assert_eq!(interval_ms(&settings), ARP_SPEED_MAX_MS);
    }

    #[test]
    fn releasing_only_pad_silences_in_same_call() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        arp.pad_on(3, 100, 0, &settings, &mut sink, &mut rec);
        arp.pad_off(3, ms(10), &mut sink, &mut rec);

        assert!(sink.sounding().is_empty());
        assert!(arp.sounding_note().is_none());
        assert!(arp.held_pads().is_empty());
        assert_eq!(rec.0.last(), Some(&(72, 0, false, ms(10))));

        // Nothing more happens afterwards.
        arp.poll(ms(500), &settings, &mut sink, &mut rec);
        assert_eq!(sink.notes_on(), vec![72]);
    }

    #[test]
    fn releasing_pad_mid_cycle_reclamps_cursor() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let (mut arp, mut sink, mut rec) = run(&settings, &[0, 1, 2], 2);
        // Played 60 (press), 60, 64; cursor now points at the third pad.
        arp.pad_off(2, ms(250), &mut sink, &mut rec);
        arp.pad_off(1, ms(260), &mut sink, &mut rec);
        arp.poll(ms(300), &settings, &mut sink, &mut rec);
        arp.poll(ms(400), &settings, &mut sink, &mut rec);
        assert_eq!(sink.notes_on()[3..], [60, 60]);
    }

    #[test]
    fn out_of_range_pads_are_ignored() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        arp.pad_on(12, 100, 0, &settings, &mut sink, &mut rec);
        arp.pad_on(200, 100, 0, &settings, &mut sink, &mut rec);
        arp.pad_off(12, 0, &mut sink, &mut rec);
        assert!(arp.held_pads().is_empty());
        assert!(sink.operations().is_empty());
        assert!(rec.0.is_empty());
    }

    #[test]
    fn last_pressed_velocity_applies_to_all_steps() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        let mut rec = Recorded::default();
        arp.pad_on(0, 40, 0, &settings, &mut sink, &mut rec);
        arp.pad_on(1, 110, ms(5), &settings, &mut sink, &mut rec);
        arp.poll(ms(100), &settings, &mut sink, &mut rec);
        arp.poll(ms(200), &settings, &mut sink, &mut rec);

        let velocities: Vec<u8> = sink
            .operations()
            .iter()
            .filter_map(|op| match op {
                SinkOp::NoteOn { velocity, .. } => Some(*velocity),
                _ => None,
            })
            .collect();
        assert_eq!(velocities, vec![40, 110, 110]);
        assert_eq!(arp.velocity(), 110);
    }

    #[test]
    fn off_pattern_does_nothing() {
        let settings = FixedSettings::new(ArpPattern::Off);
        let (arp, sink, rec) = run(&settings, &[0, 1], 5);
        assert!(sink.operations().is_empty());
        assert!(rec.0.is_empty());
        assert!(!arp.is_enabled(&settings));
        assert!(!arp.is_active(&settings));
    }

    #[test]
    fn stop_clears_everything() {
        let settings = FixedSettings::new(ArpPattern::Up);
        let (mut arp, mut sink, mut rec) = run(&settings, &[0, 1, 2], 1);
        assert!(arp.is_active(&settings));
        arp.stop(ms(150), &mut sink, &mut rec);
        assert!(!arp.is_active(&settings));
        assert!(arp.is_enabled(&settings));
        assert!(sink.sounding().is_empty());
        assert!(arp.held_pads().is_empty());
    }

    #[test]
    fn all_notes_off_is_unconditional() {
        let mut arp = Arpeggiator::with_seed(1);
        let mut sink = TestSink::new();
        arp.all_notes_off(&mut sink);
        assert_eq!(sink.operations(), &[SinkOp::AllNotesOff]);
    }
}
