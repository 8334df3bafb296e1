//! Outer-loop health: how long each poll pass takes.
//!
//! Samples live in a fixed ring so recording never allocates.

use std::time::Duration;

const WINDOW: usize = 512;

/// Figures for one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub samples: usize,
    pub avg_us: u32,
    pub max_us: u32,
    pub p95_us: u32,
    /// Passes over budget since the collector was created.
    pub overruns: u64,
}

pub struct PollTelemetry {
    samples_us: [u32; WINDOW],
    next: usize,
    filled: usize,
    window_max_us: u32,
    budget_us: u32,
    overruns: u64,
}

impl PollTelemetry {
    pub fn new(budget: Duration) -> Self {
        Self {
            samples_us: [0; WINDOW],
            next: 0,
            filled: 0,
            window_max_us: 0,
            budget_us: duration_us(budget),
            overruns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        let us = duration_us(elapsed);
        self.samples_us[self.next] = us;
        self.next = (self.next + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);
        self.window_max_us = self.window_max_us.max(us);
        if us > self.budget_us {
            self.overruns += 1;
        }
    }

    /// Summarize the ring and start a new max window. Overruns are cumulative.
    pub fn take_summary(&mut self) -> PollSummary {
        let n = self.filled;
        if n == 0 {
            return PollSummary {
                overruns: self.overruns,
                ..PollSummary::default()
            };
        }

        let total: u64 = self.samples_us[..n].iter().map(|&us| us as u64).sum();
        let mut ordered = self.samples_us;
        ordered[..n].sort_unstable();
        let p95 = ordered[(n * 95 / 100).clamp(1, n) - 1];

        let summary = PollSummary {
            samples: n,
            avg_us: (total / n as u64) as u32,
            max_us: self.window_max_us,
            p95_us: p95,
            overruns: self.overruns,
        };
        self.window_max_us = 0;
        summary
    }
}

fn duration_us(d: Duration) -> u32 {
    d.as_micros().min(u32::MAX as u128) as u32
}
