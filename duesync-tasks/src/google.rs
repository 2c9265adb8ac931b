//! Blocking Google Tasks REST client.
//!
//! | Operation          | Request                                   |
//! |--------------------|-------------------------------------------|
//! | `get_task`         | `GET  /lists/{list}/tasks/{task}`         |
//! | `insert_task`      | `POST /lists/{list}/tasks`                |
//! | `list_task_lists`  | `GET  /users/@me/lists?maxResults=100`    |
//! | `insert_task_list` | `POST /users/@me/lists`                   |

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::TaskServiceError;
use crate::service::TaskService;
use crate::types::{NewTask, Page, RemoteTask, TaskList};

pub const DEFAULT_BASE_URL: &str = "https://tasks.googleapis.com/tasks/v1";

/// Environment variable holding the OAuth bearer token.
pub const TOKEN_ENV: &str = "GOOGLE_TASKS_ACCESS_TOKEN";

const PAGE_SIZE: &str = "100";
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct GoogleTasksClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl GoogleTasksClient {
    pub fn new(token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
        Self {
            agent,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Token from [`TOKEN_ENV`].
    pub fn from_env() -> Result<Self, TaskServiceError> {
        Self::from_env_var(TOKEN_ENV)
    }

    pub(crate) fn from_env_var(var: &'static str) -> Result<Self, TaskServiceError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(TaskServiceError::MissingToken(var)),
        }
    }

    /// Point the client at another server (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/lists/{list}/tasks[/{task}]` with each id percent-encoded as one
    /// path segment.
    fn tasks_path(list_id: &str, task_id: Option<&str>) -> String {
        let mut path = format!("/lists/{}/tasks", urlencoding::encode(list_id));
        if let Some(task_id) = task_id {
            path.push('/');
            path.push_str(&urlencoding::encode(task_id));
        }
        path
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request.set("Authorization", &format!("Bearer {}", self.token))
    }

    fn decode<T: DeserializeOwned>(
        result: Result<ureq::Response, ureq::Error>,
        what: &str,
    ) -> Result<T, TaskServiceError> {
        match result {
            Ok(response) => response.into_json().map_err(TaskServiceError::Decode),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                if status == 404 || status == 410 {
                    Err(TaskServiceError::NotFound(what.to_string()))
                } else {
                    Err(TaskServiceError::Http { status, body })
                }
            }
            Err(ureq::Error::Transport(t)) => Err(TaskServiceError::Transport(t.to_string())),
        }
    }
}

impl TaskService for GoogleTasksClient {
    fn get_task(&self, list_id: &str, task_id: &str) -> Result<RemoteTask, TaskServiceError> {
        let url = self.url(&Self::tasks_path(list_id, Some(task_id)));
        let result = self.authorized(self.agent.get(&url)).call();
        Self::decode(result, &format!("task {task_id}"))
    }

    fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<RemoteTask, TaskServiceError> {
        let url = self.url(&Self::tasks_path(list_id, None));
        let body = json!({
            "title": task.title,
            "notes": task.notes,
            "due": task.due,
            "status": "needsAction",
        });
        let result = self.authorized(self.agent.post(&url)).send_json(body);
        Self::decode(result, &format!("task list {list_id}"))
    }

    fn list_task_lists(&self) -> Result<Vec<TaskList>, TaskServiceError> {
        let url = self.url("/users/@me/lists");
        let mut lists = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.authorized(self.agent.get(&url)).query("maxResults", PAGE_SIZE);
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }
            let page: Page<TaskList> = Self::decode(request.call(), "task lists")?;
            lists.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(lists)
    }

    fn insert_task_list(&self, title: &str) -> Result<TaskList, TaskServiceError> {
        let url = self.url("/users/@me/lists");
        let result = self
            .authorized(self.agent.post(&url))
            .send_json(json!({ "title": title }));
        Self::decode(result, "task lists")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_reported() {
        let err = GoogleTasksClient::from_env_var("DUESYNC_TEST_TOKEN_THAT_IS_NEVER_SET")
            .err()
            .expect("no token");
        assert!(matches!(err, TaskServiceError::MissingToken(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GoogleTasksClient::new("t").with_base_url("http://localhost:1234/");
        assert_eq!(client.url("/users/@me/lists"), "http://localhost:1234/users/@me/lists");
    }

    #[test]
    fn ids_stay_within_their_path_segment() {
        assert_eq!(GoogleTasksClient::tasks_path("L1", None), "/lists/L1/tasks");
        assert_eq!(
            GoogleTasksClient::tasks_path("a/b", Some("t?x=1#f")),
            "/lists/a%2Fb/tasks/t%3Fx%3D1%23f"
        );
    }
}
