use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::task::{Priority, Task, TaskId};

/// Result of applying an action to a set of display positions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Number of distinct tasks the action touched.
    pub applied: usize,
    /// Positions that did not refer to any task.
    pub ignored: Vec<usize>,
}

/// The authoritative task list.
///
/// `tasks` is kept in insertion order; that is what gets saved. The sorted
/// view shown to the user is derived on demand by [`TaskStore::display_order`].
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add(
        &mut self,
        title: &str,
        priority: Priority,
        due_date: &str,
    ) -> Result<&Task, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let task = Task::new(title, priority, due_date.trim());
        debug!(id = %task.id, priority = %task.priority, "task added");
        self.tasks.push(task);
        let Some(task) = self.tasks.last() else {
            unreachable!("a task was just pushed");
        };
        Ok(task)
    }

    /// Pending before completed, then by ascending priority. Ties keep
    /// insertion order.
    pub fn display_order(&self) -> impl Iterator<Item = &Task> + '_ {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by_key(|&i| self.tasks[i].sort_key());
        order.into_iter().map(move |i| &self.tasks[i])
    }

    /// Maps display positions to task ids against the current display order.
    /// Returns the ids (deduplicated, first occurrence wins) and the positions
    /// that were out of range.
    pub fn resolve(&self, positions: &[usize]) -> (Vec<TaskId>, Vec<usize>) {
        let snapshot: Vec<TaskId> = self.display_order().map(|t| t.id).collect();
        let mut ids = Vec::with_capacity(positions.len());
        let mut ignored = Vec::new();
        for &pos in positions {
            match snapshot.get(pos) {
                Some(id) if !ids.contains(id) => ids.push(*id),
                Some(_) => {}
                None => ignored.push(pos),
            }
        }
        if !ignored.is_empty() {
            warn!(?ignored, len = snapshot.len(), "ignoring out-of-range selection");
        }
        (ids, ignored)
    }

    pub fn complete(&mut self, positions: &[usize]) -> SelectionOutcome {
        let (ids, ignored) = self.resolve(positions);
        SelectionOutcome {
            applied: self.complete_ids(&ids),
            ignored,
        }
    }

    pub fn delete(&mut self, positions: &[usize]) -> SelectionOutcome {
        let (ids, ignored) = self.resolve(positions);
        SelectionOutcome {
            applied: self.delete_ids(&ids),
            ignored,
        }
    }

    /// Marks the given tasks completed. Unknown ids are skipped.
    pub fn complete_ids(&mut self, ids: &[TaskId]) -> usize {
        let wanted: HashSet<TaskId> = ids.iter().copied().collect();
        let mut n = 0;
        for task in self.tasks.iter_mut().filter(|t| wanted.contains(&t.id)) {
            task.completed = true;
            n += 1;
        }
        n
    }

    /// Removes the given tasks. Unknown ids are skipped.
    pub fn delete_ids(&mut self, ids: &[TaskId]) -> usize {
        let wanted: HashSet<TaskId> = ids.iter().copied().collect();
        let mut positions: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| wanted.contains(&t.id))
            .map(|(i, _)| i)
            .collect();
        // Highest first so earlier removals never shift a pending index.
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for &i in &positions {
            self.tasks.remove(i);
        }
        positions.len()
    }
}
