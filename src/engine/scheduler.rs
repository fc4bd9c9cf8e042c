use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Scheduled<T> {
    id: TaskId,
    due: Instant,
    epoch: u64,
    task: T,
}

/// Delayed work keyed by the epoch that scheduled it.
///
/// Nothing runs on its own: the owner calls [`Scheduler::pop_due`] from its
/// event loop and decides what to do with each expired task. Tasks are never
/// fired early, and a cancelled task is never returned.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    tasks: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, epoch: u64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled {
            id,
            due,
            epoch,
            task,
        });
        id
    }

    /// Returns true if the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        self.tasks.retain(|t| !predicate(&t.task));
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn deadline(&self, id: TaskId) -> Option<Instant> {
        self.tasks.iter().find(|t| t.id == id).map(|t| t.due)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.due).min()
    }

    pub fn contains(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.tasks.iter().any(|t| predicate(&t.task))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove and return the earliest task due at or before `now` as
    /// `(epoch, task)`. Ties go to the task scheduled first.
    pub fn pop_due(&mut self, now: Instant) -> Option<(u64, T)> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;
        let task = self.tasks.swap_remove(index);
        Some((task.epoch, task.task))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn tasks_fire_at_deadline_not_before() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + ms(100), 1, "a");

        assert_eq!(scheduler.pop_due(t0 + ms(99)), None);
        assert_eq!(scheduler.pop_due(t0 + ms(100)), Some((1, "a")));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn due_tasks_come_out_in_deadline_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + ms(30), 0, "late");
        scheduler.schedule(t0 + ms(10), 0, "early");
        scheduler.schedule(t0 + ms(10), 0, "early-second");
        scheduler.schedule(t0 + ms(50), 0, "pending");

        let fired: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(t0 + ms(40)))
            .map(|(_, t)| t)
            .collect();
        assert_eq!(fired, ["early", "early-second", "late"]);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn a_running_task_can_cancel_the_next_due_one() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + ms(10), 0, "first");
        scheduler.schedule(t0 + ms(10), 0, "second");

        assert_eq!(scheduler.pop_due(t0 + ms(20)), Some((0, "first")));
        scheduler.cancel_where(|&t| t == "second");
        assert_eq!(scheduler.pop_due(t0 + ms(20)), None);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(t0 + ms(10), 0, 1);
        scheduler.schedule(t0 + ms(10), 0, 2);
        scheduler.schedule(t0 + ms(10), 0, 3);

        assert!(scheduler.cancel(a));
        assert!(!scheduler.cancel(a));
        scheduler.cancel_where(|&n| n == 3);

        assert_eq!(scheduler.pop_due(t0 + ms(10)), Some((0, 2)));
        assert_eq!(scheduler.pop_due(t0 + ms(10)), None);
    }

    #[test]
    fn deadlines_are_queryable() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(t0 + ms(300), 0, ());
        scheduler.schedule(t0 + ms(200), 0, ());
        assert_eq!(scheduler.deadline(a), Some(t0 + ms(300)));
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(200)));
        scheduler.cancel_all();
        assert_eq!(scheduler.deadline(a), None);
        assert_eq!(scheduler.next_deadline(), None);
    }
}
