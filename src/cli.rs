use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::error::{PersistenceError, ValidationError};
use crate::persistence::{self, ExportFormat, DEFAULT_DATA_FILE};
use crate::store::TaskStore;
use crate::task::Priority;

#[derive(Debug, Parser)]
#[command(name = "tasklist", version, about = "A small to-do list manager")]
pub struct Cli {
    /// Task data file
    #[arg(long, env = "TASKLIST_DATA", default_value = DEFAULT_DATA_FILE)]
    pub data: PathBuf,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "tasklist.log")]
    pub log: PathBuf,

    /// Run a single command instead of the interactive UI
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a task
    Add {
        title: String,
        /// 1 (highest) to 5
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: u8,
        /// Free-form due date, e.g. 2024-12-31
        #[arg(short, long, default_value = "")]
        due: String,
    },
    /// Print tasks in display order
    List,
    /// Mark tasks completed by their position in `list`
    Done {
        #[arg(required = true)]
        positions: Vec<usize>,
    },
    /// Delete tasks by their position in `list`
    Rm {
        #[arg(required = true)]
        positions: Vec<usize>,
    },
    /// Write a snapshot of all tasks to a file
    Export {
        path: PathBuf,
        /// Defaults to the file extension
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

/// `--format` values for `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Runs one non-interactive command against the data file. Normal output
/// goes to `out`, skipped positions are reported on `err`.
pub fn run(
    command: &Command,
    data: &Path,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<(), CommandError> {
    let loaded = persistence::load_with_report(data)?;
    if let Some(notice) = loaded.skipped_notice(data) {
        writeln!(err, "warning: {notice}")?;
    }
    let mut store = TaskStore::from_tasks(loaded.tasks);

    match command {
        Command::Add {
            title,
            priority,
            due,
        } => {
            let priority = Priority::new(*priority).unwrap_or_default();
            let task = store.add(title, priority, due)?;
            writeln!(out, "Added \"{}\" (priority {})", task.title, task.priority)?;
            persistence::save(store.tasks(), data)?;
        }
        Command::List => {
            for (i, t) in store.display_order().enumerate() {
                let due = if t.due_date.is_empty() {
                    String::new()
                } else {
                    format!("  due {}", t.due_date)
                };
                writeln!(
                    out,
                    "{:>3}. {} [p{}] {}{}",
                    i + 1,
                    t.status_glyph(),
                    t.priority,
                    t.title,
                    due
                )?;
            }
        }
        Command::Done { positions } => {
            let indices = to_indices(positions, err)?;
            let outcome = store.complete(&indices);
            report_ignored(&outcome.ignored, err)?;
            writeln!(out, "Completed {} task(s)", outcome.applied)?;
            if outcome.applied > 0 {
                persistence::save(store.tasks(), data)?;
            }
        }
        Command::Rm { positions } => {
            let indices = to_indices(positions, err)?;
            let outcome = store.delete(&indices);
            report_ignored(&outcome.ignored, err)?;
            writeln!(out, "Deleted {} task(s)", outcome.applied)?;
            if outcome.applied > 0 {
                persistence::save(store.tasks(), data)?;
            }
        }
        Command::Export { path, format } => {
            let format = format.map_or_else(|| ExportFormat::from_path(path), ExportFormat::from);
            persistence::export(format, store.tasks(), path)?;
            writeln!(out, "Tasks exported to {}", path.display())?;
        }
    }
    Ok(())
}

/// 1-based positions to display indices. Position 0 never matches a task.
fn to_indices(positions: &[usize], err: &mut impl Write) -> io::Result<Vec<usize>> {
    let mut indices = Vec::with_capacity(positions.len());
    for &p in positions {
        match p.checked_sub(1) {
            Some(i) => indices.push(i),
            None => writeln!(err, "warning: no task at position 0, skipped")?,
        }
    }
    Ok(indices)
}

fn report_ignored(ignored: &[usize], err: &mut impl Write) -> io::Result<()> {
    for i in ignored {
        writeln!(err, "warning: no task at position {}, skipped", i + 1)?;
    }
    Ok(())
}
