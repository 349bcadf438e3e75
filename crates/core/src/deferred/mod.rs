//! Cancellable "do X at time T" table.
//!
//! Deadlines are expressed in game-clock milliseconds rather than wall time,
//! so a paused clock also pauses every pending action.

/// Actions a play session schedules for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// A Drag note the cursor reached early lands its Perfect at its time.
    ResolveDrag { index: usize },
    /// Autoplay presses for a Tap note at its time.
    SyntheticTap { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeferredId(u64);

#[derive(Debug, Clone)]
struct Entry<A> {
    id: DeferredId,
    deadline_ms: f64,
    action: A,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue<A> {
    entries: Vec<Entry<A>>,
    next_id: u64,
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<A> DeferredQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline_ms: f64, action: A) -> DeferredId {
        let id = DeferredId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline_ms,
            action,
        });
        id
    }

    /// Returns `false` if the action already fired or was cancelled.
    pub fn cancel(&mut self, id: DeferredId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(cancelled = self.entries.len(), "dropping deferred actions");
        }
        self.entries.clear();
    }

    /// Removes and returns every action whose deadline is at or before
    /// `now_ms`, earliest deadline first, ties in scheduling order.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<A> {
        let mut due = Vec::new();
        let mut pending = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.deadline_ms <= now_ms {
                due.push(entry);
            } else {
                pending.push(entry);
            }
        }
        self.entries = pending;

        due.sort_by(|a, b| {
            a.deadline_ms
                .total_cmp(&b.deadline_ms)
                .then(a.id.cmp(&b.id))
        });
        due.into_iter().map(|entry| entry.action).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only the actions matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&A) -> bool) {
        self.entries.retain(|entry| keep(&entry.action));
    }
}
