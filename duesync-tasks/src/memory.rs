//! In-process [`TaskService`] for tests and offline previews.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::error::TaskServiceError;
use crate::service::TaskService;
use crate::types::{NewTask, RemoteTask, TaskList, TaskStatus};

/// Lists and tasks held in memory, with call counters and failure switches.
#[derive(Debug, Default)]
pub struct MemoryTaskService {
    lists: RefCell<Vec<TaskList>>,
    /// list id → tasks in insertion order
    tasks: RefCell<BTreeMap<String, Vec<RemoteTask>>>,
    next_id: Cell<u64>,
    get_calls: Cell<usize>,
    insert_calls: Cell<usize>,
    list_calls: Cell<usize>,
    fail_gets: Cell<bool>,
    fail_inserts: Cell<bool>,
}

impl MemoryTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing list.
    pub fn with_list(self, id: &str, title: &str) -> Self {
        self.lists.borrow_mut().push(TaskList {
            id: id.to_string(),
            title: title.to_string(),
        });
        self
    }

    /// Seed an existing open task.
    pub fn with_task(self, list_id: &str, task_id: &str) -> Self {
        self.tasks
            .borrow_mut()
            .entry(list_id.to_string())
            .or_default()
            .push(RemoteTask {
                id: task_id.to_string(),
                title: String::new(),
                status: TaskStatus::NeedsAction,
                notes: None,
                due: None,
            });
        self
    }

    /// Mark a task completed, as a user ticking it off would.
    pub fn complete(&self, task_id: &str) -> bool {
        self.update(task_id, |t| t.status = TaskStatus::Completed)
    }

    /// Delete a task remotely. Later `get_task` calls report not-found.
    pub fn remove(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.borrow_mut();
        for list in tasks.values_mut() {
            if let Some(pos) = list.iter().position(|t| t.id == task_id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Make every `get_task` fail with a transient error.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.set(fail);
    }

    /// Make every `insert_task` fail with a transient error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.set(fail);
    }

    pub fn tasks(&self, list_id: &str) -> Vec<RemoteTask> {
        self.tasks.borrow().get(list_id).cloned().unwrap_or_default()
    }

    pub fn lists(&self) -> Vec<TaskList> {
        self.lists.borrow().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.get()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.get()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    fn update(&self, task_id: &str, f: impl FnOnce(&mut RemoteTask)) -> bool {
        let mut tasks = self.tasks.borrow_mut();
        match tasks
            .values_mut()
            .flat_map(|l| l.iter_mut())
            .find(|t| t.id == task_id)
        {
            Some(task) => {
                f(task);
                true
            }
            None => false,
        }
    }

    fn mint_id(&self, prefix: &str) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("{prefix}-{n}")
    }

    fn unavailable() -> TaskServiceError {
        TaskServiceError::Http {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

impl TaskService for MemoryTaskService {
    fn get_task(&self, list_id: &str, task_id: &str) -> Result<RemoteTask, TaskServiceError> {
        self.get_calls.set(self.get_calls.get() + 1);
        if self.fail_gets.get() {
            return Err(Self::unavailable());
        }
        self.tasks
            .borrow()
            .get(list_id)
            .and_then(|l| l.iter().find(|t| t.id == task_id))
            .cloned()
            .ok_or_else(|| TaskServiceError::NotFound(format!("task {task_id}")))
    }

    fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<RemoteTask, TaskServiceError> {
        self.insert_calls.set(self.insert_calls.get() + 1);
        if self.fail_inserts.get() {
            return Err(Self::unavailable());
        }
        let created = RemoteTask {
            id: self.mint_id("task"),
            title: task.title.clone(),
            status: TaskStatus::NeedsAction,
            notes: Some(task.notes.clone()),
            due: Some(task.due.clone()),
        };
        self.tasks
            .borrow_mut()
            .entry(list_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    fn list_task_lists(&self) -> Result<Vec<TaskList>, TaskServiceError> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.lists.borrow().clone())
    }

    fn insert_task_list(&self, title: &str) -> Result<TaskList, TaskServiceError> {
        let list = TaskList {
            id: self.mint_id("list"),
            title: title.to_string(),
        };
        self.lists.borrow_mut().push(list.clone());
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            due: "2024-05-01T14:59:00.000Z".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn inserted_task_is_open_and_retrievable() {
        let svc = MemoryTaskService::new();
        let task = svc.insert_task("L", &new_task("a")).unwrap();
        assert!(!task.id.is_empty());
        let fetched = svc.get_task("L", &task.id).unwrap();
        assert_eq!(fetched.status, TaskStatus::NeedsAction);
        assert_eq!(svc.insert_calls(), 1);
        assert_eq!(svc.get_calls(), 1);
    }

    #[test]
    fn complete_and_remove() {
        let svc = MemoryTaskService::new().with_task("L", "t1").with_task("L", "t2");
        assert!(svc.complete("t1"));
        assert!(svc.get_task("L", "t1").unwrap().is_completed());
        assert!(svc.remove("t2"));
        assert!(svc.get_task("L", "t2").unwrap_err().is_not_found());
    }

    #[test]
    fn injected_failures_are_not_not_found() {
        let svc = MemoryTaskService::new().with_task("L", "t1");
        svc.fail_gets(true);
        let err = svc.get_task("L", "t1").unwrap_err();
        assert!(!err.is_not_found());
        svc.fail_inserts(true);
        assert!(svc.insert_task("L", &new_task("x")).is_err());
        assert!(svc.tasks("L").len() == 1);
    }
}
