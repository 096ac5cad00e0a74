//! Per-instruction telemetry hook.
//!
//! The dispatch loop reports every executed instruction to the EVM's
//! observer when statistics are enabled. The default observer does nothing;
//! [`StatsObserver`] aggregates counts and durations in memory and emits a
//! summary through `tracing` when the top-level frame completes. Anything
//! fancier (persistent sinks, sampling) belongs to the host.

use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::opcodes::OpCode;

pub trait Observer: Send {
    fn observe(&mut self, opcode: OpCode, elapsed: Duration);

    /// Called once when the top-level frame reaches a terminal status.
    fn finish(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&mut self, _opcode: OpCode, _elapsed: Duration) {}
}

#[derive(Debug, Default)]
pub struct StatsObserver {
    records: FxHashMap<OpCode, (u64, Duration)>,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-opcode (count, cumulative duration), most dispatched first.
    pub fn summary(&self) -> Vec<(OpCode, u64, Duration)> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .map(|(op, (count, total))| (*op, *count, *total))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }
}

impl Observer for StatsObserver {
    fn observe(&mut self, opcode: OpCode, elapsed: Duration) {
        let record = self.records.entry(opcode).or_default();
        record.0 += 1;
        record.1 += elapsed;
    }

    fn finish(&mut self) {
        for (opcode, count, total) in self.summary() {
            debug!(%opcode, count, total_ns = total.as_nanos() as u64, "opcode statistics");
        }
    }
}
