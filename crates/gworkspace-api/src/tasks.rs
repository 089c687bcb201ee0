//! Google Tasks: task lists and their tasks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::transport::{Request, Service, Transport, decode, drain_pages, segment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `needsAction` or `completed`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }
}

/// Client for the Tasks API.
pub struct TasksClient {
    transport: Arc<dyn Transport>,
}

impl TasksClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list_tasklists(&self) -> ApiResult<Vec<TaskList>> {
        let request = Request::new(Service::Tasks, "users/@me/lists");
        drain_pages(self.transport.as_ref(), &request)
            .await?
            .into_iter()
            .map(|item| decode(item, "task list"))
            .collect()
    }

    /// Finds a task list by exact title.
    pub async fn get_tasklist(&self, title: &str) -> ApiResult<TaskList> {
        self.list_tasklists()
            .await?
            .into_iter()
            .find(|list| list.title == title)
            .ok_or_else(|| ApiError::not_found(format!("task list {:?} not found", title)))
    }

    pub async fn create_tasklist(&self, title: &str) -> ApiResult<TaskList> {
        let request = Request::new(Service::Tasks, "users/@me/lists");
        let created = self
            .transport
            .create(&request, json!({"title": title}))
            .await?;
        decode(created, "task list")
    }

    pub async fn list_tasks(&self, tasklist_id: &str) -> ApiResult<Vec<Task>> {
        let request = Request::new(
            Service::Tasks,
            format!("lists/{}/tasks", segment(tasklist_id)),
        );
        drain_pages(self.transport.as_ref(), &request)
            .await?
            .into_iter()
            .map(|item| decode(item, "task"))
            .collect()
    }

    pub async fn insert_task(&self, tasklist_id: &str, title: &str) -> ApiResult<Task> {
        let request = Request::new(
            Service::Tasks,
            format!("lists/{}/tasks", segment(tasklist_id)),
        );
        let created = self
            .transport
            .create(&request, json!({"title": title}))
            .await?;
        decode(created, "task")
    }

    pub async fn delete_task(&self, tasklist_id: &str, task_id: &str) -> ApiResult<()> {
        let request = Request::new(
            Service::Tasks,
            format!("lists/{}/tasks/{}", segment(tasklist_id), segment(task_id)),
        );
        self.transport.delete(&request).await?;
        Ok(())
    }

    /// Deletes every task in a list, one request per task.
    ///
    /// The API's own `clear` only removes completed tasks. Returns the number
    /// of deleted tasks.
    pub async fn clear_tasklist(&self, tasklist_id: &str) -> ApiResult<usize> {
        let tasks = self.list_tasks(tasklist_id).await?;
        for task in &tasks {
            self.delete_task(tasklist_id, &task.id).await?;
        }
        info!(tasklist = tasklist_id, deleted = tasks.len(), "cleared task list");
        Ok(tasks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::{FakeTransport, Op};
    use serde_json::Value;

    fn setup() -> (Arc<FakeTransport>, TasksClient) {
        let fake = Arc::new(FakeTransport::new());
        (fake.clone(), TasksClient::new(fake))
    }

    fn lists() -> Value {
        json!({"items": [
            {"id": "l1", "title": "Groceries"},
            {"id": "l2", "title": "Work", "updated": "2024-05-01T10:00:00.000Z"},
        ]})
    }

    #[tokio::test]
    async fn get_tasklist_by_exact_title() {
        let (fake, client) = setup();
        fake.push_page(Service::Tasks, "users/@me/lists", lists());
        let list = client.get_tasklist("Work").await.unwrap();
        assert_eq!(list.id, "l2");
    }

    #[tokio::test]
    async fn missing_tasklist_is_not_found() {
        let (fake, client) = setup();
        fake.push_page(Service::Tasks, "users/@me/lists", lists());
        let err = client.get_tasklist("work").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_transport());
        insta::assert_snapshot!(err.to_string(), @r#"not_found: task list "work" not found"#);
    }

    #[tokio::test]
    async fn create_tasklist_sends_title() {
        let (fake, client) = setup();
        fake.push_response(
            Service::Tasks,
            "users/@me/lists",
            json!({"id": "l3", "title": "Errands"}),
        );
        let list = client.create_tasklist("Errands").await.unwrap();
        assert_eq!(list.id, "l3");

        let call = &fake.calls()[0];
        assert_eq!(call.op, Op::Create);
        assert_eq!(call.body, Some(json!({"title": "Errands"})));
    }

    #[tokio::test]
    async fn insert_and_list_tasks() {
        let (fake, client) = setup();
        fake.push_response(
            Service::Tasks,
            "lists/l1/tasks",
            json!({"id": "t9", "title": "Milk", "status": "needsAction"}),
        );
        fake.push_page(
            Service::Tasks,
            "lists/l1/tasks",
            json!({"items": [
                {"id": "t9", "title": "Milk", "status": "needsAction"},
                {"id": "t8", "title": "Eggs", "status": "completed"},
            ]}),
        );

        let task = client.insert_task("l1", "Milk").await.unwrap();
        assert_eq!(task.id, "t9");
        assert!(!task.is_completed());

        let tasks = client.list_tasks("l1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[1].is_completed());
    }

    #[tokio::test]
    async fn clear_deletes_each_task() {
        let (fake, client) = setup();
        fake.push_page(
            Service::Tasks,
            "lists/l1/tasks",
            json!({"items": [{"id": "a"}, {"id": "b"}]}),
        );
        fake.push_response(Service::Tasks, "lists/l1/tasks/a", Value::Null);
        fake.push_response(Service::Tasks, "lists/l1/tasks/b", Value::Null);

        assert_eq!(client.clear_tasklist("l1").await.unwrap(), 2);

        let deleted: Vec<_> = fake
            .calls()
            .into_iter()
            .filter(|c| c.op == Op::Delete)
            .map(|c| c.request.path)
            .collect();
        assert_eq!(deleted, ["lists/l1/tasks/a", "lists/l1/tasks/b"]);
    }

    #[tokio::test]
    async fn clear_empty_list() {
        let (fake, client) = setup();
        fake.push_page(Service::Tasks, "lists/l1/tasks", json!({}));
        assert_eq!(client.clear_tasklist("l1").await.unwrap(), 0);
    }
}
