//! Text status line drawn over the shared bus.
//!
//! A "sensor" thread also uses the bus. The display never waits for it:
//! a refresh that finds the bus busy stays pending and is retried on the
//! next loop tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use padloop_core::{DeferredTask, InstrumentStatus, RefreshSignal, SharedBus};
use padloop_types::LooperState;

pub struct StatusDisplay {
    refresh: RefreshSignal,
    task: DeferredTask,
    frames: u64,
    deferrals: u64,
}

impl StatusDisplay {
    pub fn new(refresh: RefreshSignal) -> Self {
        Self {
            refresh,
            task: DeferredTask::new(),
            frames: 0,
            deferrals: 0,
        }
    }

    /// Force a redraw on the next `service` call.
    pub fn invalidate(&self) {
        self.task.mark_pending();
    }

    /// Called once per loop tick. Draws if a refresh is pending and the bus
    /// is free.
    pub fn service(&mut self, status: &InstrumentStatus, bus: &SharedBus) {
        if self.refresh.take() {
            self.task.mark_pending();
        }
        if !self.task.is_pending() {
            return;
        }

        let line = render(status);
        if self.task.run_or_defer(bus, || println!("{}", line)) {
            self.frames += 1;
        } else {
            self.deferrals += 1;
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn deferrals(&self) -> u64 {
        self.deferrals
    }
}

pub fn render(status: &InstrumentStatus) -> String {
    let looper = match status.looper_state {
        LooperState::Recording => format!(
            "REC  {:>5.1}s / {:.0}s",
            status.loop_elapsed_ms as f32 / 1000.0,
            status.loop_max_length_ms as f32 / 1000.0
        ),
        LooperState::Playing => format!(
            "PLAY {:>5.1}s / {:.1}s",
            status.loop_elapsed_ms as f32 / 1000.0,
            status.loop_length_ms as f32 / 1000.0
        ),
        other => format!("{:<4}", other.name()),
    };
    let arp = if status.arp_active {
        format!("{}*", status.arp_pattern.name())
    } else {
        status.arp_pattern.name().to_string()
    };
    let scale = if status.scale.is_song() {
        format!("song {} in {}", status.scale.name(), status.key.name())
    } else {
        format!("{} {}", status.key.name(), status.scale.name())
    };
    format!(
        "[{}] {} events | arp {} | {}",
        looper, status.loop_event_count, arp, scale
    )
}

/// Background reader that grabs the bus for a few milliseconds at a time.
pub struct SensorThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorThread {
    pub fn spawn(bus: SharedBus) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("sensor".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    {
                        let _bus = bus.enter();
                        thread::sleep(Duration::from_millis(3));
                    }
                    thread::sleep(Duration::from_millis(17));
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!(target: "bus", "sensor thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padloop_types::{ArpPattern, Key, Scale};

    fn status(state: LooperState) -> InstrumentStatus {
        InstrumentStatus {
            looper_state: state,
            loop_elapsed_ms: 1_500,
            loop_length_ms: 4_000,
            loop_max_length_ms: 60_000,
            loop_event_count: 12,
            arp_pattern: ArpPattern::UpDown,
            arp_active: true,
            key: Key::C,
            scale: Scale::Major,
        }
    }

    #[test]
    fn render_shows_playhead_and_arp() {
        let line = render(&status(LooperState::Playing));
        assert!(line.contains("PLAY   1.5s / 4.0s"), "{line}");
        assert!(line.contains("arp Up/Down*"), "{line}");
        assert!(line.contains("12 events"), "{line}");
    }

    #[test]
    fn render_labels_song_scales() {
        let line = render(&status(LooperState::Idle));
        assert!(line.ends_with(&format!("| C {}", Scale::Major.name())), "{line}");

        let mut song = status(LooperState::Idle);
        song.scale = Scale::TwinkleTwinkle;
        let line = render(&song);
        assert!(
            line.ends_with(&format!("| song {} in C", Scale::TwinkleTwinkle.name())),
            "{line}"
        );
    }

    #[test]
    fn busy_bus_defers_refresh() {
        let refresh = RefreshSignal::new();
        let mut display = StatusDisplay::new(refresh.clone());
        let bus = SharedBus::new();

        refresh.request();
        let held = bus.enter();
        display.service(&status(LooperState::Idle), &bus);
        assert_eq!(display.frames(), 0);
        assert_eq!(display.deferrals(), 1);
        drop(held);

        // No new request, but the deferred one is still owed.
        display.service(&status(LooperState::Idle), &bus);
        assert_eq!(display.frames(), 1);

        display.service(&status(LooperState::Idle), &bus);
        assert_eq!(display.frames(), 1);
    }
}
