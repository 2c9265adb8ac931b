//! # duesync-tasks
//!
//! The external task tracker behind a [`TaskService`] trait, with a blocking
//! Google Tasks client, an in-memory implementation, and
//! [`resolve_task_list_id`].

pub mod error;
pub mod google;
pub mod memory;
pub mod service;
pub mod types;

pub use error::TaskServiceError;
pub use google::GoogleTasksClient;
pub use memory::MemoryTaskService;
pub use service::{resolve_task_list_id, TaskService};
pub use types::{NewTask, RemoteTask, TaskList, TaskStatus};
