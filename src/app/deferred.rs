//! Continuations that fire after the current work completes: the display
//! delay before a picker is built, and the startup sort-by-level.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    RebuildUi { generation: u64 },
    SortByLevel,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    entries: Vec<(Instant, u64, Deferred)>,
    seq: u64,
}

impl DeferredQueue {
    pub fn schedule_after(&mut self, now: Instant, delay: Duration, task: Deferred) {
        self.schedule_at(now + delay, task);
    }

    pub fn schedule_at(&mut self, deadline: Instant, task: Deferred) {
        self.seq += 1;
        self.entries.push((deadline, self.seq, task));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(at, _, _)| *at).min()
    }

    /// Everything due by `now`, earliest first; ties keep scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Deferred> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(at, _, _)| *at <= now);
        self.entries = rest;
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, task)| task).collect()
    }

    pub fn cancel_rebuilds(&mut self) {
        self.entries
            .retain(|(_, _, task)| !matches!(task, Deferred::RebuildUi { .. }));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_schedule_order() {
        let now = Instant::now();
        let mut q = DeferredQueue::default();
        q.schedule_after(now, Duration::from_millis(30), Deferred::RebuildUi { generation: 1 });
        q.schedule_after(now, Duration::ZERO, Deferred::SortByLevel);
        q.schedule_after(now, Duration::ZERO, Deferred::RebuildUi { generation: 0 });

        assert_eq!(q.next_deadline(), Some(now));
        assert_eq!(
            q.pop_due(now),
            vec![Deferred::SortByLevel, Deferred::RebuildUi { generation: 0 }]
        );
        assert!(q.pop_due(now + Duration::from_millis(10)).is_empty());
        assert_eq!(
            q.pop_due(now + Duration::from_millis(30)),
            vec![Deferred::RebuildUi { generation: 1 }]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_rebuilds_keeps_other_work() {
        let now = Instant::now();
        let mut q = DeferredQueue::default();
        q.schedule_after(now, Duration::from_millis(5), Deferred::RebuildUi { generation: 3 });
        q.schedule_at(now, Deferred::SortByLevel);
        q.cancel_rebuilds();
        assert_eq!(q.pop_due(now + Duration::from_secs(1)), vec![Deferred::SortByLevel]);
    }
}
