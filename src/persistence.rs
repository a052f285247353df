//! Reading and writing the task list.
//!
//! The data file is a JSON array of objects with the keys `title`,
//! `completed`, `priority`, `due_date` and `created_at`, written in that
//! order with four-space indentation. Exports reuse the same JSON layout
//! or produce a CSV table.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::PersistenceError;
use crate::task::{now_timestamp, Priority, Task, TaskId};

pub const DEFAULT_DATA_FILE: &str = "tasks.json";

pub const CSV_HEADER: [&str; 5] = ["Title", "Completed", "Priority", "Due Date", "Created At"];

/// Target format for a one-off export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Guesses the format from the file extension; anything but `.csv` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportFormat::Json => "tasks_export.json",
            ExportFormat::Csv => "tasks_export.csv",
        }
    }
}

/// Tasks read from a data file plus the number of entries that could not
/// be turned into a task. Skipped entries are gone after the next save.
#[derive(Debug, Default)]
pub struct Loaded {
    pub tasks: Vec<Task>,
    pub skipped: usize,
}

impl Loaded {
    /// User-facing notice about skipped entries, if there were any.
    pub fn skipped_notice(&self, path: &Path) -> Option<String> {
        (self.skipped > 0).then(|| {
            format!(
                "Skipped {} invalid entries in {}",
                self.skipped,
                path.display()
            )
        })
    }
}

/// Loads tasks from `path`. A missing file is an empty list.
pub fn load(path: &Path) -> Result<Vec<Task>, PersistenceError> {
    load_with_report(path).map(|loaded| loaded.tasks)
}

/// Like [`load`], but also reports how many entries were skipped.
pub fn load_with_report(path: &Path) -> Result<Loaded, PersistenceError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no data file yet");
            return Ok(Loaded::default());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let doc: Value = serde_json::from_str(&data).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = doc else {
        return Err(PersistenceError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let mut loaded = Loaded {
        tasks: Vec::with_capacity(items.len()),
        skipped: 0,
    };
    for (i, item) in items.iter().enumerate() {
        match item.as_object().and_then(task_from_object) {
            Some(task) => loaded.tasks.push(task),
            None => {
                warn!(index = i, path = %path.display(), "skipping entry without a title");
                loaded.skipped += 1;
            }
        }
    }
    info!(
        count = loaded.tasks.len(),
        skipped = loaded.skipped,
        path = %path.display(),
        "tasks loaded"
    );
    Ok(loaded)
}

/// Startup variant of [`load`]: any failure yields an empty list and the
/// error is handed back for display.
pub fn load_or_empty(path: &Path) -> (Loaded, Option<PersistenceError>) {
    match load_with_report(path) {
        Ok(loaded) => (loaded, None),
        Err(e) => {
            error!(error = %e, "load failed, starting with an empty list");
            (Loaded::default(), Some(e))
        }
    }
}

fn task_from_object(obj: &Map<String, Value>) -> Option<Task> {
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?;
    let completed = obj
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let priority = obj
        .get("priority")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
        .map(Priority::clamped)
        .unwrap_or_default();
    let due_date = obj
        .get("due_date")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let created_at = obj
        .get("created_at")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(now_timestamp);

    Some(Task {
        title: title.to_string(),
        completed,
        priority,
        due_date: due_date.to_string(),
        created_at,
        id: TaskId::new(),
    })
}

/// Overwrites `path` with the full canonical list.
pub fn save(tasks: &[Task], path: &Path) -> Result<(), PersistenceError> {
    write_json(tasks, path)?;
    info!(count = tasks.len(), path = %path.display(), "tasks saved");
    Ok(())
}

pub fn export_json(tasks: &[Task], path: &Path) -> Result<(), PersistenceError> {
    write_json(tasks, path)?;
    info!(count = tasks.len(), path = %path.display(), "exported JSON");
    Ok(())
}

pub fn export_csv(tasks: &[Task], path: &Path) -> Result<(), PersistenceError> {
    let csv_err = |source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for task in tasks {
        let priority = task.priority.to_string();
        writer
            .write_record([
                task.title.as_str(),
                if task.completed { "True" } else { "False" },
                priority.as_str(),
                task.due_date.as_str(),
                task.created_at.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(count = tasks.len(), path = %path.display(), "exported CSV");
    Ok(())
}

pub fn export(format: ExportFormat, tasks: &[Task], path: &Path) -> Result<(), PersistenceError> {
    match format {
        ExportFormat::Json => export_json(tasks, path),
        ExportFormat::Csv => export_csv(tasks, path),
    }
}

fn write_json(tasks: &[Task], path: &Path) -> Result<(), PersistenceError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    tasks
        .serialize(&mut ser)
        .map_err(|source| PersistenceError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    buf.push(b'\n');
    fs::write(path, buf).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })
}
