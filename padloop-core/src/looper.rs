//! Event looper.
//!
//! Records timestamped note, CC and pitch-bend events into a buffer reserved
//! once at construction, then replays them in a fixed-length cycle. All work
//! happens inside `poll` and the input handlers; nothing blocks.

use padloop_types::{LoopEvent, LoopEventKind, LooperState};

use crate::arpeggiator::NoteRecorder;
use crate::refresh::RefreshSignal;
use crate::sink::NoteSink;

pub const LOOPER_MAX_EVENTS: usize = 2048;
pub const LOOPER_MAX_LENGTH_MS: u32 = 60_000;
/// Display refresh rate while recording or playing.
pub const LOOPER_REFRESH_MS: u32 = 100;

/// Sizing fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LooperLimits {
    pub max_events: usize,
    pub max_length_ms: u32,
    pub refresh_interval_ms: u32,
}

impl Default for LooperLimits {
    fn default() -> Self {
        Self {
            max_events: LOOPER_MAX_EVENTS,
            max_length_ms: LOOPER_MAX_LENGTH_MS,
            refresh_interval_ms: LOOPER_REFRESH_MS,
        }
    }
}

/// Internal state, carrying the clock anchor of the states that need one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disabled,
    Idle,
    Recording { started_us: u64 },
    Playing { started_us: u64 },
    Paused,
}

impl Phase {
    fn state(self) -> LooperState {
        match self {
            Phase::Disabled => LooperState::Disabled,
            Phase::Idle => LooperState::Idle,
            Phase::Recording { .. } => LooperState::Recording,
            Phase::Playing { .. } => LooperState::Playing,
            Phase::Paused => LooperState::Paused,
        }
    }
}

pub struct Looper {
    phase: Phase,
    events: Vec<LoopEvent>,
    /// False when the event buffer could not be reserved. Permanent.
    has_storage: bool,
    max_events: usize,
    max_length_ms: u32,
    refresh_interval_ms: u32,
    loop_length_ms: u32,
    play_index: usize,
    last_refresh_ms: Option<u64>,
    dropped_in_take: u32,
    refresh: RefreshSignal,
}

impl Looper {
    /// Reserve the event buffer. If that fails the looper stays disabled for
    /// its whole lifetime.
    pub fn new(limits: LooperLimits, refresh: RefreshSignal) -> Self {
        let max_events = limits.max_events.max(1);
        let mut events = Vec::new();
        let has_storage = match events.try_reserve_exact(max_events) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    target: "looper",
                    "cannot reserve {} events ({}), looper disabled",
                    max_events,
                    e
                );
                false
            }
        };

        Self {
            phase: Phase::Disabled,
            events,
            has_storage,
            max_events: if has_storage { max_events } else { 0 },
            max_length_ms: if has_storage { limits.max_length_ms.max(1) } else { 0 },
            refresh_interval_ms: limits.refresh_interval_ms.max(1),
            loop_length_ms: 0,
            play_index: 0,
            last_refresh_ms: None,
            dropped_in_take: 0,
            refresh,
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    pub fn enable(&mut self) {
        if self.has_storage && self.phase == Phase::Disabled {
            self.phase = Phase::Idle;
            log::debug!(target: "looper", "enabled");
        }
    }

    /// Drop everything and go silent. The buffer allocation is kept.
    pub fn disable<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        self.phase = Phase::Disabled;
        self.clear_take();
        sink.all_notes_off();
        log::debug!(target: "looper", "disabled");
    }

    /// Forget the recorded loop but stay enabled.
    pub fn clear(&mut self) {
        self.clear_take();
        if !self.is_disabled() {
            self.phase = Phase::Idle;
        }
    }

    /// Record button: Idle/Paused record, Recording commits, Playing pauses.
    pub fn on_press<S: NoteSink + ?Sized>(&mut self, now_us: u64, sink: &mut S) {
        match self.phase {
            Phase::Disabled => {}
            Phase::Idle | Phase::Paused => self.start_record(now_us),
            Phase::Recording { .. } => self.stop_record_and_play(now_us),
            Phase::Playing { .. } => self.stop(sink),
        }
    }

    /// Begin a fresh take, discarding any previous loop.
    pub fn start_record(&mut self, now_us: u64) {
        if self.is_disabled() {
            return;
        }
        self.clear_take();
        self.last_refresh_ms = None;
        self.phase = Phase::Recording { started_us: now_us };
        log::debug!(target: "looper", "recording");
    }

    /// Commit the current take and start playing it. Empty or zero-length
    /// takes are discarded.
    pub fn stop_record_and_play(&mut self, now_us: u64) {
        let Phase::Recording { started_us } = self.phase else {
            return;
        };

        let elapsed = elapsed_ms(started_us, now_us);
        if elapsed == 0 || self.events.is_empty() {
            log::debug!(
                target: "looper",
                "discarding take ({} ms, {} events)",
                elapsed,
                self.events.len()
            );
            self.clear_take();
            self.phase = Phase::Idle;
            return;
        }

        self.loop_length_ms = elapsed.min(self.max_length_ms);
        if self.dropped_in_take > 0 {
            log::warn!(
                target: "looper",
                "take committed with {} events dropped (capacity {})",
                self.dropped_in_take,
                self.max_events
            );
        }
        log::debug!(
            target: "looper",
            "committed {} events over {} ms",
            self.events.len(),
            self.loop_length_ms
        );
        self.restart_playback(now_us);
    }

    /// Leave Recording or Playing. A take in progress is discarded; a
    /// committed loop is kept and paused.
    pub fn stop<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        match self.phase {
            Phase::Disabled => {}
            Phase::Recording { .. } => {
                self.clear_take();
                self.phase = Phase::Idle;
            }
            Phase::Playing { .. } => {
                sink.all_notes_off();
                self.phase = Phase::Paused;
                log::debug!(target: "looper", "paused at event {}", self.play_index);
            }
            Phase::Idle | Phase::Paused => {
                self.phase = if self.has_loop() {
                    Phase::Paused
                } else {
                    Phase::Idle
                };
            }
        }
    }

    /// Play the committed loop from its first event.
    pub fn restart_from_start<S: NoteSink + ?Sized>(&mut self, now_us: u64, sink: &mut S) {
        if self.is_disabled() || !self.has_loop() {
            return;
        }
        sink.all_notes_off();
        self.restart_playback(now_us);
    }

    // ─── Recording ──────────────────────────────────────────────────

    /// A note starts a take on its own when nothing is being recorded.
    pub fn record_note(&mut self, note: u8, velocity: u8, is_on: bool, now_us: u64) {
        if self.is_disabled() {
            return;
        }
        if matches!(self.phase, Phase::Idle | Phase::Paused) {
            self.start_record(now_us);
        }
        let kind = if is_on {
            LoopEventKind::NoteOn { note, velocity }
        } else {
            LoopEventKind::NoteOff { note }
        };
        self.append(kind, now_us);
    }

    pub fn record_cc(&mut self, controller: u8, value: u8, now_us: u64) {
        self.append(LoopEventKind::ControlChange { controller, value }, now_us);
    }

    pub fn record_pitch(&mut self, value: i16, now_us: u64) {
        self.append(LoopEventKind::PitchBend { value }, now_us);
    }

    fn append(&mut self, kind: LoopEventKind, now_us: u64) {
        let Phase::Recording { started_us } = self.phase else {
            return;
        };
        if self.events.len() >= self.max_events {
            if self.dropped_in_take == 0 {
                log::warn!(
                    target: "looper",
                    "event buffer full ({}), dropping further events",
                    self.max_events
                );
            }
            self.dropped_in_take = self.dropped_in_take.saturating_add(1);
            return;
        }

        let timestamp_ms = elapsed_ms(started_us, now_us);
        if timestamp_ms >= self.max_length_ms {
            log::debug!(target: "looper", "maximum length reached while recording");
            self.stop_record_and_play(now_us);
            return;
        }

        log::trace!(target: "looper", "append {:?} at {} ms", kind, timestamp_ms);
        self.events.push(LoopEvent::new(timestamp_ms, kind));
    }

    // ─── Playback ───────────────────────────────────────────────────

    /// Drive recording timeout, playback dispatch, and display refresh.
    pub fn poll<S: NoteSink + ?Sized>(&mut self, now_us: u64, sink: &mut S) {
        match self.phase {
            Phase::Recording { started_us } => {
                if elapsed_ms(started_us, now_us) >= self.max_length_ms {
                    log::debug!(target: "looper", "maximum length reached, auto-commit");
                    self.stop_record_and_play(now_us);
                }
                self.maybe_request_refresh(now_us);
            }
            Phase::Playing { started_us } => {
                if !self.has_loop() {
                    return;
                }
                self.dispatch_due(started_us, now_us, sink);
                self.maybe_request_refresh(now_us);
            }
            Phase::Disabled | Phase::Idle | Phase::Paused => {}
        }
    }

    fn dispatch_due<S: NoteSink + ?Sized>(&mut self, started_us: u64, now_us: u64, sink: &mut S) {
        let length = self.loop_length_ms;
        let mut elapsed = elapsed_ms(started_us, now_us);

        if elapsed >= length {
            // Flush the tail of the cycle before wrapping.
            while let Some(event) = self.events.get(self.play_index) {
                dispatch(event, sink);
                self.play_index += 1;
            }

            // The next cycle starts at this poll, not at the computed loop end.
            log::trace!(target: "looper", "wrap, {} ms past loop end", elapsed - length);
            self.phase = Phase::Playing { started_us: now_us };
            self.play_index = 0;
            elapsed = 0;
        }

        while let Some(event) = self.events.get(self.play_index) {
            if event.timestamp_ms > elapsed {
                break;
            }
            dispatch(event, sink);
            self.play_index += 1;
        }
    }

    fn maybe_request_refresh(&mut self, now_us: u64) {
        let now_ms = now_us / 1000;
        let due = match self.last_refresh_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.refresh_interval_ms as u64,
            None => true,
        };
        if due {
            self.refresh.request();
            self.last_refresh_ms = Some(now_ms);
        }
    }

    fn restart_playback(&mut self, now_us: u64) {
        self.play_index = 0;
        self.last_refresh_ms = None;
        self.phase = Phase::Playing { started_us: now_us };
    }

    fn clear_take(&mut self) {
        self.events.clear();
        self.play_index = 0;
        self.loop_length_ms = 0;
        self.dropped_in_take = 0;
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn state(&self) -> LooperState {
        self.phase.state()
    }

    pub fn is_disabled(&self) -> bool {
        !self.has_storage || self.phase == Phase::Disabled
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, Phase::Recording { .. })
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing { .. })
    }

    /// A committed loop with a length and at least one event.
    pub fn has_loop(&self) -> bool {
        self.loop_length_ms > 0 && !self.events.is_empty()
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn loop_length_ms(&self) -> u32 {
        self.loop_length_ms
    }

    /// Time into the current take or cycle; zero when neither is running.
    pub fn elapsed_ms(&self, now_us: u64) -> u32 {
        match self.phase {
            Phase::Playing { started_us } if self.loop_length_ms > 0 => {
                elapsed_ms(started_us, now_us)
            }
            Phase::Recording { started_us } => elapsed_ms(started_us, now_us),
            _ => 0,
        }
    }

    pub fn max_length_ms(&self) -> u32 {
        self.max_length_ms
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn play_index(&self) -> usize {
        self.play_index
    }

    pub fn events(&self) -> &[LoopEvent] {
        &self.events
    }
}

impl NoteRecorder for Looper {
    fn record_note(&mut self, note: u8, velocity: u8, is_on: bool, now_us: u64) {
        Looper::record_note(self, note, velocity, is_on, now_us);
    }
}

fn elapsed_ms(started_us: u64, now_us: u64) -> u32 {
    (now_us.saturating_sub(started_us) / 1000).min(u32::MAX as u64) as u32
}

fn dispatch<S: NoteSink + ?Sized>(event: &LoopEvent, sink: &mut S) {
    match event.kind {
        LoopEventKind::NoteOn { note, velocity } => sink.note_on(note, velocity),
        LoopEventKind::NoteOff { note } => sink.note_off(note),
        LoopEventKind::ControlChange { controller, value } => {
            sink.control_change(controller, value)
        }
        LoopEventKind::PitchBend { value } => sink.pitch_bend(value),
    }
}
