//! Export subcommand for task-manager
//!
//! Writes the task list, in listing order, as the same JSON array served by
//! `GET /api/tasks`.

use crate::repository::TaskRepository;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only export tasks that are not completed
    #[arg(long)]
    pub pending_only: bool,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

/// Render the export document.
pub fn render(repo: &dyn TaskRepository, args: &ExportArgs) -> Result<String> {
    let mut tasks = repo.get_all()?;
    if args.pending_only {
        tasks.retain(|task| !task.completed);
    }

    let json = if args.compact {
        serde_json::to_string(&tasks)?
    } else {
        serde_json::to_string_pretty(&tasks)?
    };
    Ok(json)
}

/// Render and write to the chosen output. Returns the number of bytes written.
pub fn run(repo: &dyn TaskRepository, args: &ExportArgs) -> Result<usize> {
    let mut json = render(repo, args)?;
    json.push('\n');

    match &args.output {
        Some(path) => std::fs::write(path, &json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(json.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryTaskRepository;
    use crate::types::Task;

    fn args(pending_only: bool, compact: bool) -> ExportArgs {
        ExportArgs {
            output: None,
            pending_only,
            compact,
        }
    }

    fn seeded() -> MemoryTaskRepository {
        let repo = MemoryTaskRepository::new();
        repo.create(Task::new("open").with_priority(2)).unwrap();
        let done = repo.create(Task::new("done").with_priority(1)).unwrap();
        repo.mark_completed(done.id.unwrap(), true).unwrap();
        repo
    }

    #[test]
    fn exports_all_in_listing_order() {
        let json = render(&seeded(), &args(false, true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let titles: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["open", "done"]);
        assert!(!json.contains('\n'));
    }

    #[test]
    fn pending_only_drops_completed() {
        let json = render(&seeded(), &args(true, false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["title"], "open");
    }

    #[test]
    fn writes_to_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out.json");
        let export = ExportArgs {
            output: Some(path.clone()),
            pending_only: false,
            compact: true,
        };

        let written = run(&seeded(), &export).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.len(), written);
        assert!(content.ends_with('\n'));
    }
}
