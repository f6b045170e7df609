//! Single-shot deferred actions on an explicit millisecond clock.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Pending<A> {
    id: TimerId,
    due_ms: u64,
    action: A,
}

#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    next_id: u64,
    pending: Vec<Pending<A>>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due_ms: now_ms.saturating_add(delay_ms),
            action,
        });
        id
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.id != id);
        before != self.pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|pending| pending.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Removes and returns every action due at `now_ms`, ordered by due time
    /// and then by scheduling order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<(TimerId, A)> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.due_ms <= now_ms);
        self.pending = rest;
        due.sort_by_key(|pending| (pending.due_ms, pending.id.0));
        due.into_iter()
            .map(|pending| (pending.id, pending.action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_actions_come_out_in_order() {
        let mut timers = Scheduler::new();
        timers.schedule(0, 300, "third");
        timers.schedule(0, 100, "first");
        timers.schedule(0, 100, "second");

        assert!(timers.take_due(50).is_empty());
        let fired: Vec<_> = timers.take_due(300).into_iter().map(|(_, a)| a).collect();
        assert_eq!(fired, vec!["first", "second", "third"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = Scheduler::new();
        let id = timers.schedule(10, 10, 1);
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(timers.take_due(100).is_empty());
    }
}
