//! Progress reporting and cooperative pausing for bulk jobs.

use std::sync::atomic::{AtomicBool, Ordering};

use strum::Display;

use crate::config::PROGRESS_COMPLETE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    EncryptingFiles,
    EncryptingManifest,
    Packaging,
    DecryptingFiles,
    Complete,
}

/// One progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Items finished so far.
    pub current: usize,
    pub total: usize,
    /// 0 to 100, never decreasing within one job.
    pub percentage: f64,
    /// Name of the file being worked on, if any.
    pub current_file: Option<String>,
    pub phase: Phase,
}

/// Receives progress updates.
pub trait ProgressSink {
    fn report(&mut self, progress: &Progress);
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn report(&mut self, progress: &Progress) {
        self(progress);
    }
}

/// Polled between files. A paused job finishes its current file first.
pub trait PauseSignal {
    fn is_paused(&self) -> bool;
}

impl<F: Fn() -> bool> PauseSignal for F {
    fn is_paused(&self) -> bool {
        self()
    }
}

impl PauseSignal for AtomicBool {
    fn is_paused(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// A pause signal that never fires.
pub struct NeverPaused;

impl PauseSignal for NeverPaused {
    fn is_paused(&self) -> bool {
        false
    }
}

/// Wraps a sink and keeps percentages monotonic.
pub(crate) struct Tracker<'a, S: ProgressSink + ?Sized> {
    sink: &'a mut S,
    total: usize,
    last: f64,
}

impl<'a, S: ProgressSink + ?Sized> Tracker<'a, S> {
    pub(crate) fn new(sink: &'a mut S, total: usize) -> Self {
        Self { sink, total, last: 0.0 }
    }

    /// Reports `current` of `total` items done, mapped linearly into `start..end`.
    pub(crate) fn step(&mut self, phase: Phase, current: usize, start: f64, end: f64, current_file: Option<&str>) {
        let fraction = if self.total == 0 { 1.0 } else { current as f64 / self.total as f64 };
        self.emit(phase, current, start + (end - start) * fraction, current_file);
    }

    pub(crate) fn emit(&mut self, phase: Phase, current: usize, percentage: f64, current_file: Option<&str>) {
        self.last = percentage.clamp(self.last, PROGRESS_COMPLETE);
        self.sink.report(&Progress {
            current,
            total: self.total,
            percentage: self.last,
            current_file: current_file.map(str::to_owned),
            phase,
        });
    }

    pub(crate) fn complete(&mut self) {
        self.emit(Phase::Complete, self.total, PROGRESS_COMPLETE, None);
    }
}
