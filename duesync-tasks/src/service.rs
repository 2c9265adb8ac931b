//! The [`TaskService`] seam and task-list resolution.

use crate::error::TaskServiceError;
use crate::types::{NewTask, RemoteTask, TaskList};

/// The external task tracker.
///
/// Every call is blocking. Implementations map "no such task" to
/// [`TaskServiceError::NotFound`] and nothing else.
pub trait TaskService {
    fn get_task(&self, list_id: &str, task_id: &str) -> Result<RemoteTask, TaskServiceError>;

    fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<RemoteTask, TaskServiceError>;

    /// Every task list visible to the caller, across all pages.
    fn list_task_lists(&self) -> Result<Vec<TaskList>, TaskServiceError>;

    fn insert_task_list(&self, title: &str) -> Result<TaskList, TaskServiceError>;
}

impl<S: TaskService + ?Sized> TaskService for &S {
    fn get_task(&self, list_id: &str, task_id: &str) -> Result<RemoteTask, TaskServiceError> {
        (**self).get_task(list_id, task_id)
    }

    fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<RemoteTask, TaskServiceError> {
        (**self).insert_task(list_id, task)
    }

    fn list_task_lists(&self) -> Result<Vec<TaskList>, TaskServiceError> {
        (**self).list_task_lists()
    }

    fn insert_task_list(&self, title: &str) -> Result<TaskList, TaskServiceError> {
        (**self).insert_task_list(title)
    }
}

/// Id of the first list titled exactly `name`, creating the list if none
/// exists.
pub fn resolve_task_list_id<S: TaskService + ?Sized>(
    service: &S,
    name: &str,
) -> Result<String, TaskServiceError> {
    let lists = service.list_task_lists()?;
    if let Some(found) = lists.into_iter().find(|l| l.title == name) {
        log::debug!("task list '{name}' resolved to {}", found.id);
        return Ok(found.id);
    }
    let created = service.insert_task_list(name)?;
    log::info!("created task list '{name}' ({})", created.id);
    Ok(created.id)
}
