//! The playable instrument: pads, record button and controllers wired to the
//! arpeggiator, the looper and one sound sink.

use padloop_types::{ArpPattern, Key, LooperState, PadId, Scale, PAD_COUNT};

use crate::arpeggiator::{Arpeggiator, ARP_MAX_OCTAVES};
use crate::clock::Clock;
use crate::config::Config;
use crate::looper::{Looper, LooperLimits};
use crate::refresh::RefreshSignal;
use crate::settings::{ArpSettings, InstrumentSettings};
use crate::sink::NoteSink;

/// Snapshot of everything the front panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentStatus {
    pub looper_state: LooperState,
    pub loop_elapsed_ms: u32,
    pub loop_length_ms: u32,
    pub loop_max_length_ms: u32,
    pub loop_event_count: usize,
    pub arp_pattern: ArpPattern,
    pub arp_active: bool,
    pub key: Key,
    pub scale: Scale,
}

pub struct Instrument<C: Clock, S: NoteSink> {
    clock: C,
    sink: S,
    settings: InstrumentSettings,
    arp: Arpeggiator,
    looper: Looper,
    refresh: RefreshSignal,
    /// Note started by each pad while the arpeggiator was off, so the
    /// release stops the same pitch even if the scale changed meanwhile.
    direct_notes: [Option<u8>; PAD_COUNT],
}

impl<C: Clock, S: NoteSink> Instrument<C, S> {
    /// Build with the looper enabled.
    pub fn new(settings: InstrumentSettings, limits: LooperLimits, clock: C, sink: S) -> Self {
        let refresh = RefreshSignal::new();
        let mut looper = Looper::new(limits, refresh.clone());
        looper.enable();
        Self {
            clock,
            sink,
            settings,
            arp: Arpeggiator::new(),
            looper,
            refresh,
            direct_notes: [None; PAD_COUNT],
        }
    }

    pub fn from_config(config: &Config, clock: C, sink: S) -> Self {
        let mut instrument = Self::new(config.settings(), config.looper_limits(), clock, sink);
        if !config.looper_enabled() {
            instrument.looper.disable(&mut instrument.sink);
        }
        instrument
    }

    /// Replace the arpeggiator, e.g. with a seeded one.
    pub fn with_arpeggiator(mut self, arp: Arpeggiator) -> Self {
        self.arp = arp;
        self
    }

    // ─── Input handlers ─────────────────────────────────────────────

    pub fn pad_down(&mut self, pad: u8, velocity: u8) {
        let now = self.clock.now_us();
        if self.arp.is_enabled(&self.settings) {
            self.arp.pad_on(
                pad,
                velocity,
                now,
                &self.settings,
                &mut self.sink,
                &mut self.looper,
            );
            return;
        }

        let Some(id) = PadId::new(pad) else {
            return;
        };
        let note = self.settings.note_for_pad(id);
        if let Some(prev) = self.direct_notes[id.index()].replace(note) {
            self.sink.note_off(prev);
            self.looper.record_note(prev, 0, false, now);
        }
        self.sink.note_on(note, velocity);
        self.looper.record_note(note, velocity, true, now);
    }

    pub fn pad_up(&mut self, pad: u8) {
        let now = self.clock.now_us();
        let Some(id) = PadId::new(pad) else {
            return;
        };

        // A pad pressed before the arpeggiator was switched on still owns its note.
        if let Some(note) = self.direct_notes[id.index()].take() {
            self.sink.note_off(note);
            self.looper.record_note(note, 0, false, now);
        }
        if self.arp.is_enabled(&self.settings) {
            self.arp.pad_off(pad, now, &mut self.sink, &mut self.looper);
        }
    }

    pub fn control_change(&mut self, controller: u8, value: u8) {
        let now = self.clock.now_us();
        self.sink.control_change(controller, value);
        self.looper.record_cc(controller, value, now);
    }

    pub fn pitch_bend(&mut self, value: i16) {
        let now = self.clock.now_us();
        self.sink.pitch_bend(value);
        self.looper.record_pitch(value, now);
    }

    pub fn record_button(&mut self) {
        let now = self.clock.now_us();
        self.looper.on_press(now, &mut self.sink);
    }

    pub fn restart_loop(&mut self) {
        let now = self.clock.now_us();
        self.looper.restart_from_start(now, &mut self.sink);
    }

    pub fn clear_loop(&mut self) {
        self.looper.clear();
    }

    pub fn enable_looper(&mut self) {
        self.looper.enable();
    }

    pub fn disable_looper(&mut self) {
        self.looper.disable(&mut self.sink);
    }

    /// Stop everything that sounds and forget held pads. The looper keeps
    /// its state: a take in progress goes on recording and a playing loop
    /// sounds again on its next event.
    pub fn panic(&mut self) {
        let now = self.clock.now_us();
        self.arp.stop(now, &mut self.sink, &mut self.looper);
        self.direct_notes = [None; PAD_COUNT];
        self.arp.all_notes_off(&mut self.sink);
        log::debug!(target: "arp", "panic");
    }

    // ─── Front panel ────────────────────────────────────────────────

    pub fn set_arp_pattern(&mut self, pattern: ArpPattern) {
        let was_enabled = self.arp.is_enabled(&self.settings);
        self.settings.arp_pattern = pattern;
        if was_enabled && pattern.is_off() {
            let now = self.clock.now_us();
            self.arp.stop(now, &mut self.sink, &mut self.looper);
        }
        log::debug!(target: "arp", "pattern {}", pattern.name());
    }

    pub fn cycle_arp_pattern(&mut self) -> ArpPattern {
        let next = self.settings.arp_pattern.next();
        self.set_arp_pattern(next);
        next
    }

    /// Clamped into the configured bounds.
    pub fn set_arp_speed_ms(&mut self, speed_ms: u32) {
        let (floor, ceiling) = self.settings.speed_bounds_ms();
        self.settings.arp_speed_ms = speed_ms.clamp(floor, ceiling);
    }

    pub fn set_arp_octaves(&mut self, octaves: u8) {
        self.settings.arp_octaves = octaves.clamp(1, ARP_MAX_OCTAVES);
    }

    pub fn set_key(&mut self, key: Key) {
        self.settings.key = key;
    }

    pub fn cycle_scale(&mut self) -> Scale {
        self.settings.cycle_scale()
    }

    // ─── Real-time loop ─────────────────────────────────────────────

    /// One control-loop tick: arpeggiator steps first so the looper sees them.
    pub fn poll(&mut self) {
        let now = self.clock.now_us();
        self.arp
            .poll(now, &self.settings, &mut self.sink, &mut self.looper);
        self.looper.poll(now, &mut self.sink);
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn arp_enabled(&self) -> bool {
        self.arp.is_enabled(&self.settings)
    }

    pub fn arp_active(&self) -> bool {
        self.arp.is_active(&self.settings)
    }

    pub fn looper_state(&self) -> LooperState {
        self.looper.state()
    }

    pub fn has_loop(&self) -> bool {
        self.looper.has_loop()
    }

    pub fn loop_length_ms(&self) -> u32 {
        self.looper.loop_length_ms()
    }

    pub fn loop_elapsed_ms(&self) -> u32 {
        self.looper.elapsed_ms(self.clock.now_us())
    }

    pub fn loop_max_length_ms(&self) -> u32 {
        self.looper.max_length_ms()
    }

    pub fn loop_event_count(&self) -> usize {
        self.looper.event_count()
    }

    pub fn loop_play_index(&self) -> usize {
        self.looper.play_index()
    }

    pub fn status(&self) -> InstrumentStatus {
        InstrumentStatus {
            looper_state: self.looper_state(),
            loop_elapsed_ms: self.loop_elapsed_ms(),
            loop_length_ms: self.loop_length_ms(),
            loop_max_length_ms: self.loop_max_length_ms(),
            loop_event_count: self.loop_event_count(),
            arp_pattern: self.settings.arp_pattern,
            arp_active: self.arp_active(),
            key: self.settings.key,
            scale: self.settings.scale,
        }
    }

    pub fn settings(&self) -> &InstrumentSettings {
        &self.settings
    }

    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    pub fn arpeggiator(&self) -> &Arpeggiator {
        &self.arp
    }

    /// Handle for the display side; requests coalesce.
    pub fn refresh_signal(&self) -> RefreshSignal {
        self.refresh.clone()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
