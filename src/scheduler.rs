use crate::checker::CheckReply;
use crate::page::Page;
use crate::sanitizer::Username;
use crate::{Error, Result};

/// A reply waiting on the timer queue.
#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) username: Username,
    pub(crate) reply: CheckReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    pub(crate) task_queue: Vec<ScheduledTask>,
    pub(crate) now_ms: i64,
    pub(crate) timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl SchedulerState {
    fn allocate_timer_id(&mut self) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    /// Queues `reply` for delivery `delay_ms` from now. There is no cancel.
    pub(crate) fn schedule(&mut self, delay_ms: i64, username: Username, reply: CheckReply) -> i64 {
        let id = self.allocate_timer_id();
        let order = self.allocate_task_order();
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            username,
            reply,
        });
        id
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }
}

impl Page {
    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .scheduler
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer("timer step limit must be at least 1".into()));
        }
        self.scheduler.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_timers_internal()?;
        self.trace_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.scheduler.now_ms {
            return Err(Error::Timer(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms
            )));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = target_ms;
        let ran = self.run_due_timers_internal()?;
        self.trace_line(format!(
            "[timer] advance_to from={} to={} ran_due={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    /// Runs every queued timer, moving the clock forward to each due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        self.trace_line(format!(
            "[timer] flush from={} to={} ran={}",
            from, self.scheduler.now_ms, ran
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_due_timers_internal()?;
        self.trace_line(format!(
            "[timer] run_due now_ms={} ran={}",
            self.scheduler.now_ms, ran
        ));
        Ok(ran)
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(next_idx) = self.scheduler.next_task_index(None) else {
            self.trace_line("[timer] run_next none".into());
            return Ok(false);
        };
        let task = self.scheduler.task_queue.remove(next_idx);
        if task.due_at > self.scheduler.now_ms {
            self.scheduler.now_ms = task.due_at;
        }
        self.execute_timer_task(task)?;
        Ok(true)
    }

    fn run_due_timers_internal(&mut self) -> Result<usize> {
        self.run_timer_queue(Some(self.scheduler.now_ms), false)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let task = self.scheduler.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        Error::Timer(format!(
            "timer queue exceeded max task steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}",
            self.scheduler.timer_step_limit,
            self.scheduler.now_ms,
            self.scheduler.task_queue.len(),
        ))
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.trace_line(format!(
            "[timer] run id={} due_at={} now_ms={}",
            task.id, task.due_at, self.scheduler.now_ms
        ));
        tracing::debug!(
            timer_id = task.id,
            due_at = task.due_at,
            now_ms = self.scheduler.now_ms,
            "delivering availability reply"
        );
        self.deliver_reply(task.username, task.reply)
    }
}
