mod display;
mod log_sink;
mod performer;

use std::fs::File;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use padloop_core::{
    Arpeggiator, Clock, Config, Instrument, MonotonicClock, PollTelemetry, SharedBus,
};

use display::{SensorThread, StatusDisplay};
use log_sink::LogSink;
use performer::InputEvent;

/// A poll pass slower than this counts as an overrun.
const POLL_BUDGET: Duration = Duration::from_micros(500);
const TELEMETRY_EVERY: Duration = Duration::from_secs(2);
const DEFAULT_SECONDS: u64 = 8;

type Sim = Instrument<MonotonicClock, LogSink>;

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("padloop")
        .join("padloop-sim.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/padloop-sim.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("padloop-sim: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("padloop-sim: logger already initialized: {}", e);
        return;
    }

    log::info!("padloop-sim starting (log level: {:?})", log_level);
}

fn arg_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let seconds = arg_value(&args, "--seconds").unwrap_or(DEFAULT_SECONDS);
    let seed: Option<u64> = arg_value(&args, "--seed");

    let config = Config::load();
    let mut instrument = Instrument::from_config(&config, MonotonicClock::new(), LogSink::default());
    if let Some(seed) = seed {
        instrument = instrument.with_arpeggiator(Arpeggiator::with_seed(seed));
    }

    let bus = SharedBus::new();
    let sensor = SensorThread::spawn(bus.clone())?;
    let mut display = StatusDisplay::new(instrument.refresh_signal());
    display.invalidate();

    let (tx, rx) = crossbeam_channel::unbounded();
    let performer = performer::spawn(tx)?;

    run(&mut instrument, &rx, &mut display, &bus, Duration::from_secs(seconds));

    instrument.panic();
    sensor.shutdown();
    drop(rx);
    if performer.join().is_err() {
        log::warn!("performer thread panicked");
    }

    println!(
        "done: {} notes, {} panics, {} frames drawn, {} deferred, {} bus contentions",
        instrument.sink().notes_started(),
        instrument.sink().panics(),
        display.frames(),
        display.deferrals(),
        bus.contention_count()
    );
    Ok(())
}

fn run(
    instrument: &mut Sim,
    rx: &Receiver<InputEvent>,
    display: &mut StatusDisplay,
    bus: &SharedBus,
    duration: Duration,
) {
    let started = Instant::now();
    let mut telemetry = PollTelemetry::new(POLL_BUDGET);
    let mut last_report = Instant::now();
    let mut input_open = true;

    while started.elapsed() < duration {
        let tick = Instant::now();

        if input_open {
            input_open = drain_input(instrument, rx, display);
        }
        instrument.poll();
        telemetry.record(tick.elapsed());

        display.service(&instrument.status(), bus);

        if last_report.elapsed() >= TELEMETRY_EVERY {
            let s = telemetry.take_summary();
            log::info!(
                target: "telemetry",
                "poll avg={}us max={}us p95={}us overruns={} (t={}ms)",
                s.avg_us,
                s.max_us,
                s.p95_us,
                s.overruns,
                instrument.clock().now_ms()
            );
            last_report = Instant::now();
        }

        std::thread::sleep(Duration::from_micros(200));
    }
}

/// Apply every queued input event. Returns false once the performer is gone.
fn drain_input(instrument: &mut Sim, rx: &Receiver<InputEvent>, display: &StatusDisplay) -> bool {
    loop {
        match rx.try_recv() {
            Ok(event) => {
                apply(instrument, event);
                display.invalidate();
            }
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}

fn apply(instrument: &mut Sim, event: InputEvent) {
    match event {
        InputEvent::PadDown { pad, velocity } => instrument.pad_down(pad, velocity),
        InputEvent::PadUp { pad } => instrument.pad_up(pad),
        InputEvent::RecordButton => instrument.record_button(),
        InputEvent::ControlChange { controller, value } => {
            instrument.control_change(controller, value)
        }
        InputEvent::PitchBend { value } => instrument.pitch_bend(value),
        InputEvent::CycleArpPattern => {
            let pattern = instrument.cycle_arp_pattern();
            log::info!(target: "arp", "pattern -> {}", pattern.name());
        }
        InputEvent::RestartLoop => instrument.restart_loop(),
    }
}
