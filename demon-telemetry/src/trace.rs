//! Per-request explanation traces.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use demon_primitives::RequestId;
use serde::Serialize;

/// Elapsed time of one pipeline stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageTiming {
    /// Stage name such as `analyze` or `route`.
    pub stage: &'static str,
    /// Wall-clock milliseconds spent in the stage.
    pub elapsed_ms: f64,
}

/// What happened while serving one request, for callers that asked to explain.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExplanationTrace {
    /// Request being explained.
    pub request_id: RequestId,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Stage timings in execution order.
    pub stages: Vec<StageTiming>,
    /// Routes, directives and techniques that matched, as readable lines.
    pub matched_entries: Vec<String>,
}

impl ExplanationTrace {
    /// Empty trace stamped with the current time.
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Utc::now(),
            stages: Vec::new(),
            matched_entries: Vec::new(),
        }
    }

    /// Appends a stage timing.
    pub fn record(&mut self, stage: &'static str, elapsed: Duration) {
        self.stages.push(StageTiming {
            stage,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        });
    }

    /// Runs `f` and records how long it took under `stage`.
    pub fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let timer = StageTimer::start(stage);
        let value = f();
        timer.finish(self);
        value
    }

    /// Appends a matched entry line.
    pub fn matched(&mut self, entry: impl Into<String>) {
        self.matched_entries.push(entry.into());
    }

    /// Sum of recorded stage timings.
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.stages.iter().map(|stage| stage.elapsed_ms).sum()
    }

    /// Timing recorded for `stage`, if any.
    #[must_use]
    pub fn stage(&self, stage: &str) -> Option<&StageTiming> {
        self.stages.iter().find(|timing| timing.stage == stage)
    }
}

/// Measures one stage; works across `.await` points unlike [`ExplanationTrace::time`].
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    /// Starts timing `stage`.
    #[must_use]
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    /// Records the elapsed time into `trace` and returns it.
    pub fn finish(self, trace: &mut ExplanationTrace) -> Duration {
        let elapsed = self.started.elapsed();
        trace.record(self.stage, elapsed);
        elapsed
    }
}
