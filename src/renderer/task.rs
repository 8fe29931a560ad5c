//! Attach-point tasks.
//!
//! Tasks are one-shot units of work run at a named point of the frame or
//! pass life cycle. Each point keeps two lists: tasks attached while the
//! point is being drained land in the store list and run on the next cycle,
//! never in the current one.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::context::RenderContext;
use crate::errors::{AsterError, Result};

/// Named moment where attached tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachPoint {
    /// Before a pass clears its buffers.
    BeforePassPrep,
    /// After a pass has rendered its bin.
    AfterPassFinish,
    /// Before anything else in a frame.
    StartFrame,
    /// After every pass of a frame.
    EndFrame,
}

/// Work run once at an attach point.
pub trait Task: Send + Sync {
    fn perform_task(&self, ctx: &mut TaskContext<'_>) -> Result<()>;
}

impl<F> Task for F
where
    F: Fn(&mut TaskContext<'_>) -> Result<()> + Send + Sync,
{
    fn perform_task(&self, ctx: &mut TaskContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Notified after each task completes successfully.
pub trait TaskCompleteListener: Send + Sync {
    fn task_complete(&self, task: &Arc<dyn Task>, point: AttachPoint);
}

/// What a running task can reach.
pub struct TaskContext<'a> {
    context: &'a mut RenderContext,
    tasks: &'a mut AttachedTasks,
    point: AttachPoint,
}

impl TaskContext<'_> {
    pub fn context(&mut self) -> &mut RenderContext {
        self.context
    }

    /// The point currently being drained.
    #[must_use]
    pub fn attach_point(&self) -> AttachPoint {
        self.point
    }

    /// Attaches a task to the owner of the running task. A task attached
    /// to the point being drained runs on the next cycle.
    pub fn attach_task(&mut self, task: Arc<dyn Task>, point: AttachPoint) -> Result<()> {
        self.tasks.attach(task, point)
    }
}

/// Double-buffered task lists for a fixed set of attach points.
pub struct AttachedTasks {
    store: SmallVec<[(AttachPoint, Vec<Arc<dyn Task>>); 2]>,
    active: Vec<Arc<dyn Task>>,
    listeners: Vec<Arc<dyn TaskCompleteListener>>,
}

impl fmt::Debug for AttachedTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: SmallVec<[(AttachPoint, usize); 2]> =
            self.store.iter().map(|(point, tasks)| (*point, tasks.len())).collect();
        f.debug_struct("AttachedTasks")
            .field("pending", &pending)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AttachedTasks {
    #[must_use]
    pub fn new(points: &[AttachPoint]) -> Self {
        Self {
            store: points.iter().map(|point| (*point, Vec::new())).collect(),
            active: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn list_mut(&mut self, point: AttachPoint) -> Result<&mut Vec<Arc<dyn Task>>> {
        self.store
            .iter_mut()
            .find(|(p, _)| *p == point)
            .map(|(_, tasks)| tasks)
            .ok_or(AsterError::InvalidAttachPoint(point))
    }

    /// Queues `task` for the next drain of `point`. Attaching the same task
    /// twice before it runs has no effect.
    pub fn attach(&mut self, task: Arc<dyn Task>, point: AttachPoint) -> Result<()> {
        let tasks = self.list_mut(point)?;
        if !tasks.iter().any(|t| Arc::ptr_eq(t, &task)) {
            tasks.push(task);
        }
        Ok(())
    }

    /// Removes a queued task. Returns whether it was queued.
    pub fn detach(&mut self, task: &Arc<dyn Task>, point: AttachPoint) -> Result<bool> {
        let tasks = self.list_mut(point)?;
        let before = tasks.len();
        tasks.retain(|t| !Arc::ptr_eq(t, task));
        Ok(tasks.len() != before)
    }

    #[must_use]
    pub fn pending(&self, point: AttachPoint) -> usize {
        self.store
            .iter()
            .find(|(p, _)| *p == point)
            .map_or(0, |(_, tasks)| tasks.len())
    }

    pub fn add_listener(&mut self, listener: Arc<dyn TaskCompleteListener>) {
        if !self.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    pub fn remove_listener(&mut self, listener: &Arc<dyn TaskCompleteListener>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Runs every task queued for `point` before this call.
    ///
    /// The first failing task stops the drain; tasks after it are dropped
    /// with the rest of the cycle.
    pub fn drain(&mut self, point: AttachPoint, ctx: &mut RenderContext) -> Result<()> {
        let mut active = std::mem::take(&mut self.active);
        std::mem::swap(&mut active, self.list_mut(point)?);

        let mut result = Ok(());
        for (i, task) in active.iter().enumerate() {
            let mut task_ctx = TaskContext {
                context: &mut *ctx,
                tasks: &mut *self,
                point,
            };
            if let Err(err) = task.perform_task(&mut task_ctx) {
                let dropped = active.len() - i - 1;
                if dropped > 0 {
                    log::warn!("Dropping {dropped} task(s) at {point:?} after a failure");
                }
                result = Err(err);
                break;
            }
            for listener in &self.listeners {
                listener.task_complete(task, point);
            }
        }

        active.clear();
        self.active = active;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_rejects_foreign_points_and_dedups() {
        let mut tasks = AttachedTasks::new(&[AttachPoint::StartFrame]);
        let task: Arc<dyn Task> = Arc::new(|_: &mut TaskContext<'_>| -> Result<()> { Ok(()) });

        assert!(matches!(
            tasks.attach(Arc::clone(&task), AttachPoint::EndFrame),
            Err(AsterError::InvalidAttachPoint(AttachPoint::EndFrame))
        ));
        tasks.attach(Arc::clone(&task), AttachPoint::StartFrame).unwrap();
        tasks.attach(Arc::clone(&task), AttachPoint::StartFrame).unwrap();
        assert_eq!(tasks.pending(AttachPoint::StartFrame), 1);

        assert!(tasks.detach(&task, AttachPoint::StartFrame).unwrap());
        assert_eq!(tasks.pending(AttachPoint::StartFrame), 0);
    }
}
