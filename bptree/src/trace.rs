//! Pluggable diagnostic trace sink.
//!
//! The workspace carries no structured logging dependency, so rather than
//! writing to a process-global logger this crate accepts a `TraceSink` at
//! tree construction. A caller who wants real structured logging can bridge
//! this to `tracing`, `log`, or anything else without the library imposing
//! a choice.

/// Receives diagnostic events emitted by a `Tree` during structural
/// mutations (splits, merges, redistributes, root collapses).
pub trait TraceSink: Send + Sync {
    fn trace(&self, event: &str);
}

/// Default sink: discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn trace(&self, _event: &str) {}
}
