//! Per-phase elapsed time accounting for a single run.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Search,
    Download,
    Unpack,
}

impl Phase {
    pub fn label(self: &Self) -> &'static str {
        match self {
            Phase::Search => "search",
            Phase::Download => "download",
            Phase::Unpack => "unpack",
        }
    }
}

const PHASES: [Phase; 3] = [Phase::Search, Phase::Download, Phase::Unpack];

/// Accumulates wall-clock durations per phase. One instance lives for the
/// whole run and is passed by mutable reference into each phase; repeated
/// measurements of the same phase add up (e.g. every per-product download
/// contributes to the single "download" total).
#[derive(Debug, Default)]
pub struct TimingRecorder {
    search: Duration,
    download: Duration,
    unpack: Duration,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a scoped measurement. The elapsed time is added to the phase
    /// total when the returned guard is dropped, on every exit path.
    pub fn start(self: &mut Self, phase: Phase) -> PhaseTimer<'_> {
        PhaseTimer {
            recorder: self,
            phase,
            started: Instant::now(),
        }
    }

    pub fn add(self: &mut Self, phase: Phase, elapsed: Duration) {
        let slot = match phase {
            Phase::Search => &mut self.search,
            Phase::Download => &mut self.download,
            Phase::Unpack => &mut self.unpack,
        };
        *slot += elapsed;
    }

    pub fn total(self: &Self, phase: Phase) -> Duration {
        match phase {
            Phase::Search => self.search,
            Phase::Download => self.download,
            Phase::Unpack => self.unpack,
        }
    }

    /// One line per phase, e.g. `search: 1.42s`.
    pub fn report(self: &Self) -> String {
        PHASES
            .iter()
            .map(|phase| {
                format!(
                    "{}: {:.2}s",
                    phase.label(),
                    self.total(*phase).as_secs_f64()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct PhaseTimer<'a> {
    recorder: &'a mut TimingRecorder,
    phase: Phase,
    started: Instant,
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.recorder.add(self.phase, elapsed);
    }
}
