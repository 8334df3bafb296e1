//! # padloop-core
//!
//! Control core of a pad instrument: a step arpeggiator and an event looper,
//! both driven from a non-blocking real-time loop. Nothing here blocks,
//! sleeps or allocates after construction.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use padloop_core::{Config, Instrument, MonotonicClock, NullSink};
//!
//! let config = Config::load();
//! let mut instrument = Instrument::from_config(&config, MonotonicClock::new(), NullSink);
//!
//! // Input handlers, from whatever scans the pads:
//! instrument.pad_down(0, 100);
//! instrument.record_button();
//!
//! // Outer loop, as often as possible:
//! loop {
//!     instrument.poll();
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`arpeggiator`]: held pads to stepped notes (up, down, up-down, random)
//! - [`looper`]: record, commit and replay timestamped events
//! - [`instrument`]: routes pads, controllers and the record button
//! - [`sink`]: the `NoteSink` output seam and its test double
//! - [`config`]: embedded defaults plus user overrides from TOML
//! - [`bus`]: try-or-defer access to a bus shared with the display
//! - [`clock`], [`refresh`], [`telemetry`]: loop plumbing

pub mod arpeggiator;
pub mod bus;
pub mod clock;
pub mod config;
pub mod held_pads;
pub mod instrument;
pub mod looper;
pub mod refresh;
pub mod settings;
pub mod sink;
pub mod telemetry;

pub use arpeggiator::{Arpeggiator, NoteRecorder};
pub use bus::{DeferredTask, SharedBus};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, ConfigError};
pub use instrument::{Instrument, InstrumentStatus};
pub use looper::{Looper, LooperLimits};
pub use refresh::RefreshSignal;
pub use settings::{ArpSettings, InstrumentSettings};
pub use sink::{NoteSink, NullSink, SinkOp, TestSink};
pub use telemetry::{PollSummary, PollTelemetry};
