//! `duesync tasklist [--name <title>]`

use anyhow::{Context, Result};
use clap::Args;

use duesync_core::{props, Settings};
use duesync_tasks::{resolve_task_list_id, GoogleTasksClient};

/// Find the task list by title, creating it when absent, and save its id.
#[derive(Args, Debug)]
pub struct TasklistArgs {
    /// List title (default: TASKS_LIST_NAME from settings).
    #[arg(long)]
    pub name: Option<String>,
}

impl TasklistArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let name = match self.name {
            Some(name) => name,
            None => {
                Settings::load_at(&home)
                    .context("failed to read settings")?
                    .tasks_list_name
            }
        };

        let client = GoogleTasksClient::from_env().context("cannot reach the task service")?;
        let id = resolve_task_list_id(&client, &name)
            .with_context(|| format!("failed to resolve task list '{name}'"))?;
        props::update_at(&home, |p| p.task_list_id = Some(id.clone()))
            .context("failed to save task list id")?;

        println!("✓ Task list '{name}' → {id}");
        Ok(())
    }
}
