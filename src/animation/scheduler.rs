use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::binding::Surface;
use crate::error::VizResult;

/// Anything whose running transitions follow the scheduler clock.
pub trait Tick {
    fn tick(&mut self, now_ms: f64);
}

impl Tick for Surface {
    fn tick(&mut self, now_ms: f64) {
        Surface::tick(self, now_ms);
    }
}

/// Visual target a set of timers belongs to (one chart, one series).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Opaque handle of one scheduled mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub target: TargetId,
    pub token: u64,
    /// Target generation the timer was issued under.
    pub generation: u64,
}

/// Outcome of one `advance_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceReport {
    pub ran: usize,
    pub failed: usize,
}

type Mutation<C> = Box<dyn FnOnce(&mut C) -> VizResult<()>>;

struct Task<C> {
    target: TargetId,
    generation: u64,
    mutation: Mutation<C>,
}

/// Cooperative single-threaded timer queue over a virtual clock.
///
/// Tasks run in `(due, submission)` order. Before each task the context is
/// ticked to the task's due time so entity transitions advance in step with
/// scheduled mutations.
pub struct Scheduler<C> {
    now_ms: f64,
    next_token: u64,
    tasks: BTreeMap<(OrderedFloat<f64>, u64), Task<C>>,
    generations: HashMap<TargetId, u64>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            next_token: 0,
            tasks: BTreeMap::new(),
            generations: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now_ms", &self.now_ms)
            .field("pending", &self.tasks.len())
            .finish()
    }
}

impl<C: Tick> Scheduler<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    #[must_use]
    pub fn generation(&self, target: &TargetId) -> u64 {
        self.generations.get(target).copied().unwrap_or(0)
    }

    /// Queues `mutation` to run `delay_ms` from now. Negative or non-finite
    /// delays run at the current instant.
    pub fn schedule(
        &mut self,
        target: &TargetId,
        delay_ms: f64,
        mutation: impl FnOnce(&mut C) -> VizResult<()> + 'static,
    ) -> TimerHandle {
        let delay = if delay_ms.is_finite() {
            delay_ms.max(0.0)
        } else {
            0.0
        };
        let token = self.next_token;
        self.next_token += 1;
        let generation = self.generation(target);
        self.tasks.insert(
            (OrderedFloat(self.now_ms + delay), token),
            Task {
                target: target.clone(),
                generation,
                mutation: Box::new(mutation),
            },
        );
        TimerHandle {
            target: target.clone(),
            token,
            generation,
        }
    }

    /// Cancels one timer; `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: &TimerHandle) -> bool {
        let key = self
            .tasks
            .keys()
            .find(|(_, token)| *token == handle.token)
            .copied();
        key.and_then(|key| self.tasks.remove(&key)).is_some()
    }

    /// Drops every pending timer of `target` and revokes its generation.
    ///
    /// Returns the number of dropped timers.
    pub fn cancel_target(&mut self, target: &TargetId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| &task.target != target);
        *self.generations.entry(target.clone()).or_insert(0) += 1;
        let dropped = before - self.tasks.len();
        if dropped > 0 {
            trace!(target = %target, dropped, "cancelled pending timers");
        }
        dropped
    }

    /// `true` while `handle` is queued under the target's current generation.
    #[must_use]
    pub fn is_pending(&self, handle: &TimerHandle) -> bool {
        handle.generation == self.generation(&handle.target)
            && self.tasks.keys().any(|(_, token)| *token == handle.token)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn pending_for(&self, target: &TargetId) -> usize {
        self.tasks
            .values()
            .filter(|task| &task.target == target)
            .count()
    }

    /// Due time of the last queued task, if any.
    #[must_use]
    pub fn last_due_ms(&self) -> Option<f64> {
        self.tasks.keys().next_back().map(|(due, _)| due.0)
    }

    pub fn advance_by(&mut self, dt_ms: f64, ctx: &mut C) -> AdvanceReport {
        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.advance_to(self.now_ms + dt, ctx)
    }

    /// Runs every task due at or before `until_ms`, then ticks the context to
    /// `until_ms`.
    ///
    /// A failing task is logged and skipped; the rest still run.
    pub fn advance_to(&mut self, until_ms: f64, ctx: &mut C) -> AdvanceReport {
        let until = until_ms.max(self.now_ms);
        let mut report = AdvanceReport::default();

        while let Some(entry) = self.tasks.first_entry() {
            let due = entry.key().0.0;
            if due > until {
                break;
            }
            let task = entry.remove();
            if task.generation != self.generation(&task.target) {
                continue;
            }
            self.now_ms = due;
            ctx.tick(due);
            report.ran += 1;
            if let Err(err) = (task.mutation)(ctx) {
                report.failed += 1;
                warn!(target = %task.target, due_ms = due, error = %err, "scheduled step failed");
            }
        }

        self.now_ms = until;
        ctx.tick(until);
        report
    }

    /// Advances until no task is left.
    pub fn run_to_idle(&mut self, ctx: &mut C) -> AdvanceReport {
        let until = self.last_due_ms().unwrap_or(self.now_ms);
        self.advance_to(until, ctx)
    }
}
