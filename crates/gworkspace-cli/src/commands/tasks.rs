//! Tasks commands.

use std::sync::Arc;

use gworkspace_api::tasks::{Task, TaskList, TasksClient};
use gworkspace_api::transport::Transport;
use tracing::info;

use crate::error::CliResult;

pub async fn lists(transport: Arc<dyn Transport>) -> CliResult<()> {
    let lists = TasksClient::new(transport).list_tasklists().await?;
    print!("{}", render_tasklists(&lists));
    Ok(())
}

pub async fn show(transport: Arc<dyn Transport>, title: &str) -> CliResult<()> {
    let client = TasksClient::new(transport);
    let list = client.get_tasklist(title).await?;
    let tasks = client.list_tasks(&list.id).await?;
    print!("{}", render_tasks(&tasks));
    Ok(())
}

/// Adds a task to the list titled `list`, creating the list when missing.
pub async fn add(transport: Arc<dyn Transport>, list: &str, task: &str) -> CliResult<()> {
    let client = TasksClient::new(transport);
    let tasklist = match client.get_tasklist(list).await {
        Ok(tasklist) => tasklist,
        Err(e) if e.is_not_found() => {
            info!(list, "creating task list");
            client.create_tasklist(list).await?
        }
        Err(e) => return Err(e.into()),
    };
    let created = client.insert_task(&tasklist.id, task).await?;
    println!("{}  {}", created.id, created.title);
    Ok(())
}

pub async fn clear(transport: Arc<dyn Transport>, title: &str) -> CliResult<()> {
    let client = TasksClient::new(transport);
    let list = client.get_tasklist(title).await?;
    let deleted = client.clear_tasklist(&list.id).await?;
    println!("Deleted {} tasks from {}", deleted, list.title);
    Ok(())
}

pub fn render_tasklists(lists: &[TaskList]) -> String {
    lists
        .iter()
        .map(|list| format!("{}  {}\n", list.id, list.title))
        .collect()
}

pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks\n".to_string();
    }
    tasks
        .iter()
        .map(|task| {
            let mark = if task.is_completed() { 'x' } else { ' ' };
            match &task.due {
                Some(due) => format!("[{}] {}  (due {})\n", mark, task.title, due.get(..10).unwrap_or(due)),
                None => format!("[{}] {}\n", mark, task.title),
            }
        })
        .collect()
}
