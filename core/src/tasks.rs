//! Task reward state machine: `Locked -> Available -> Completed -> Claimed`.
//!
//! Everything here is pure; persistence lives in [`crate::sync`].

use crate::models::{TaskReward, TaskStatus, TaskType};

pub const SIGN_IN_TASK_ID: i64 = 14;

/// The built-in task catalog, before any persisted progress is applied.
#[must_use]
pub fn default_tasks() -> Vec<TaskReward> {
    vec![
        task(2, "Sync steps", "Sync today's steps once", 88, 1, TaskType::Step, TaskStatus::Available),
        task(5, "Walk 1500 steps", "Reach 1500 steps today", 66, 1500, TaskType::Step, TaskStatus::Locked),
        task(23, "Walk 3000 steps", "Reach 3000 steps today", 88, 3000, TaskType::Step, TaskStatus::Locked),
        task(24, "Walk 6000 steps", "Reach 6000 steps today", 128, 6000, TaskType::Step, TaskStatus::Locked),
        task(
            SIGN_IN_TASK_ID,
            "Sign in 7 days",
            "Sign in seven days in a row",
            188,
            7,
            TaskType::Daily,
            TaskStatus::Available,
        ),
    ]
}

fn task(
    id: i64,
    title: &str,
    description: &str,
    reward: i64,
    target: i64,
    task_type: TaskType,
    status: TaskStatus,
) -> TaskReward {
    TaskReward {
        id,
        title: title.to_string(),
        description: description.to_string(),
        reward,
        progress: 0,
        target,
        task_type,
        status,
    }
}

/// Applies today's step count to every step task.
///
/// `Completed` never regresses and `Claimed` is left untouched.
#[must_use]
pub fn recalculate_step_tasks(tasks: &[TaskReward], steps: i64) -> Vec<TaskReward> {
    tasks
        .iter()
        .map(|t| {
            if t.task_type != TaskType::Step || t.status == TaskStatus::Claimed {
                return t.clone();
            }
            let mut next = t.clone();
            next.progress = steps.min(t.target);
            next.status = if steps >= t.target || t.status == TaskStatus::Completed {
                TaskStatus::Completed
            } else if steps > 0 {
                TaskStatus::Available
            } else {
                t.status
            };
            next
        })
        .collect()
}

/// Sets progress, clamped to the target. Reaching the target completes the task.
#[must_use]
pub fn apply_progress(task: &TaskReward, progress: i64) -> TaskReward {
    let mut next = task.clone();
    if task.status == TaskStatus::Claimed {
        return next;
    }
    next.progress = progress.clamp(0, task.target);
    if next.progress >= task.target {
        next.status = TaskStatus::Completed;
    }
    next
}

/// `Completed -> Claimed`. Any other status yields `None`.
#[must_use]
pub fn claim(task: &TaskReward) -> Option<TaskReward> {
    if task.status != TaskStatus::Completed {
        return None;
    }
    let mut next = task.clone();
    next.status = TaskStatus::Claimed;
    Some(next)
}
