use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::error;

use crate::persistence::{self, ExportFormat};
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskId};

pub const DUE_DATE_PLACEHOLDER: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Title,
    Priority,
    DueDate,
    List,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Title => Focus::Priority,
            Focus::Priority => Focus::DueDate,
            Focus::DueDate => Focus::List,
            Focus::List => Focus::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Title => Focus::List,
            Focus::Priority => Focus::Title,
            Focus::DueDate => Focus::Priority,
            Focus::List => Focus::DueDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Info,
    Warning,
    Error,
}

/// Modal message; the next key press dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl Dialog {
    fn new(kind: DialogKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub priority: Priority,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPrompt {
    pub format: ExportFormat,
    pub path: String,
}

/// Owns the task store and everything the terminal UI shows.
///
/// Every successful mutation is written to `data_file` before the handler
/// returns.
#[derive(Debug)]
pub struct App {
    store: TaskStore,
    data_file: PathBuf,
    pub form: Form,
    pub focus: Focus,
    pub cursor: usize,
    selected: HashSet<TaskId>,
    pub export_prompt: Option<ExportPrompt>,
    pub dialog: Option<Dialog>,
    pub status: Option<String>,
    should_quit: bool,
}

impl App {
    /// Loads the data file. A load failure leaves the list empty; it and
    /// any skipped entries are reported on the status line.
    pub fn load(data_file: impl Into<PathBuf>) -> Self {
        let data_file = data_file.into();
        let (loaded, err) = persistence::load_or_empty(&data_file);
        let notice = match err {
            Some(e) => Some(format!("Load error: {e}")),
            None => loaded.skipped_notice(&data_file),
        };
        let mut app = Self::new(TaskStore::from_tasks(loaded.tasks), data_file);
        app.status = notice;
        app
    }

    pub fn new(store: TaskStore, data_file: PathBuf) -> Self {
        Self {
            store,
            data_file,
            form: Form::default(),
            focus: Focus::Title,
            cursor: 0,
            selected: HashSet::new(),
            export_prompt: None,
            dialog: None,
            status: None,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn rows(&self) -> Vec<&Task> {
        self.store.display_order().collect()
    }

    pub fn is_selected(&self, id: TaskId) -> bool {
        self.selected.contains(&id)
    }

    pub fn toggle_selection(&mut self) {
        let Some(id) = self.store.display_order().nth(self.cursor).map(|t| t.id) else {
            return;
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.store.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    pub fn submit_form(&mut self) {
        let added = self
            .store
            .add(&self.form.title, self.form.priority, &self.form.due_date)
            .map(|t| t.title.clone());
        match added {
            Ok(title) => {
                self.form.title.clear();
                self.status = Some(format!("Added \"{title}\""));
                self.flush();
            }
            Err(e) => {
                self.dialog = Some(Dialog::new(DialogKind::Warning, "Input Error", e.to_string()));
            }
        }
    }

    /// Ids the list actions apply to: the marked rows, or the row under the
    /// cursor when nothing is marked.
    fn targets(&self) -> Vec<TaskId> {
        if self.selected.is_empty() {
            return self
                .store
                .display_order()
                .nth(self.cursor)
                .map(|t| vec![t.id])
                .unwrap_or_default();
        }
        self.store
            .display_order()
            .map(|t| t.id)
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    pub fn complete_selected(&mut self) {
        let ids = self.targets();
        if ids.is_empty() {
            return;
        }
        let n = self.store.complete_ids(&ids);
        self.selected.clear();
        self.status = Some(format!("Marked {n} task(s) completed"));
        self.flush();
    }

    pub fn delete_selected(&mut self) {
        let ids = self.targets();
        if ids.is_empty() {
            return;
        }
        let n = self.store.delete_ids(&ids);
        self.selected.clear();
        self.move_cursor(0);
        self.status = Some(format!("Deleted {n} task(s)"));
        self.flush();
    }

    pub fn export(&mut self, format: ExportFormat, path: &Path) {
        match persistence::export(format, self.store.tasks(), path) {
            Ok(()) => {
                self.dialog = Some(Dialog::new(
                    DialogKind::Info,
                    "Exported",
                    format!("Tasks exported to {}", path.display()),
                ));
            }
            Err(e) => {
                error!(error = %e, "export failed");
                self.dialog = Some(Dialog::new(DialogKind::Error, "Export Error", e.to_string()));
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = persistence::save(self.store.tasks(), &self.data_file) {
            error!(error = %e, "save failed");
            self.dialog = Some(Dialog::new(DialogKind::Error, "Save Error", e.to_string()));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.dialog.take().is_some() {
            return;
        }
        if self.export_prompt.is_some() {
            self.handle_export_key(key.code);
            return;
        }
        match self.focus {
            Focus::List => self.handle_list_key(key.code),
            Focus::Priority => self.handle_priority_key(key.code),
            Focus::Title | Focus::DueDate => self.handle_text_key(key.code),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Char(' ') => self.toggle_selection(),
            KeyCode::Char('c') => self.complete_selected(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('a') => self.focus = Focus::Title,
            KeyCode::Char('j') => self.open_export_prompt(ExportFormat::Json),
            KeyCode::Char('v') => self.open_export_prompt(ExportFormat::Csv),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => {}
        }
    }

    fn handle_priority_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c @ '1'..='5') => {
                if let Some(p) = c.to_digit(10).and_then(|d| Priority::new(d as u8)) {
                    self.form.priority = p;
                }
            }
            KeyCode::Char('+') | KeyCode::Up => self.form.priority = self.form.priority.raise(),
            KeyCode::Char('-') | KeyCode::Down => self.form.priority = self.form.priority.lower(),
            other => self.handle_form_nav(other),
        }
    }

    fn handle_text_key(&mut self, code: KeyCode) {
        let field = match self.focus {
            Focus::Title => &mut self.form.title,
            _ => &mut self.form.due_date,
        };
        match code {
            KeyCode::Char(c) => field.push(c),
            KeyCode::Backspace => {
                field.pop();
            }
            other => self.handle_form_nav(other),
        }
    }

    fn handle_form_nav(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => self.submit_form(),
            KeyCode::Esc => self.focus = Focus::List,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => {}
        }
    }

    fn open_export_prompt(&mut self, format: ExportFormat) {
        self.export_prompt = Some(ExportPrompt {
            format,
            path: format.default_file_name().to_string(),
        });
    }

    fn handle_export_key(&mut self, code: KeyCode) {
        let Some(prompt) = self.export_prompt.as_mut() else {
            return;
        };
        match code {
            KeyCode::Char(c) => prompt.path.push(c),
            KeyCode::Backspace => {
                prompt.path.pop();
            }
            KeyCode::Esc => self.export_prompt = None,
            KeyCode::Enter => {
                if let Some(prompt) = self.export_prompt.take() {
                    let path = prompt.path.trim();
                    if !path.is_empty() {
                        self.export(prompt.format, Path::new(path));
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::fs;
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn fresh(dir: &TempDir) -> App {
        App::load(dir.path().join("tasks.json"))
    }

    fn add(app: &mut App, title: &str, priority: char) {
        app.focus = Focus::Title;
        type_str(app, title);
        press(app, KeyCode::Tab);
        press(app, KeyCode::Char(priority));
        press(app, KeyCode::Enter);
    }

    #[test]
    fn empty_title_raises_warning_and_keeps_input() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        type_str(&mut app, "   ");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "2030-01-01");
        press(&mut app, KeyCode::Enter);

        let dialog = app.dialog.clone().unwrap();
        assert_eq!(dialog.kind, DialogKind::Warning);
        assert_eq!(app.form.title, "   ");
        assert_eq!(app.form.due_date, "2030-01-01");
        assert!(app.store().is_empty());
        assert!(!app.data_file().exists());

        // any key dismisses without side effects
        press(&mut app, KeyCode::Char('x'));
        assert!(app.dialog.is_none());
        assert_eq!(app.form.title, "   ");
    }

    #[test]
    fn valid_add_clears_title_and_writes_file() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        add(&mut app, "Pay rent", '4');
        assert!(app.dialog.is_none());
        assert_eq!(app.form.title, "");
        assert_eq!(app.form.priority.get(), 4);
        assert_eq!(app.store().len(), 1);

        let reloaded = persistence::load(app.data_file()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].title, "Pay rent");
        assert_eq!(reloaded[0].priority.get(), 4);
    }

    #[test]
    fn complete_uses_marked_rows_in_display_order() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        add(&mut app, "A", '3');
        add(&mut app, "B", '1');
        add(&mut app, "C", '2');
        press(&mut app, KeyCode::Esc);
        // display: B, C, A
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('c'));

        let done: Vec<_> = app
            .store()
            .tasks()
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(done, vec!["A", "C"]);
        let saved = persistence::load(app.data_file()).unwrap();
        assert_eq!(saved.iter().filter(|t| t.completed).count(), 2);
    }

    #[test]
    fn delete_without_marks_uses_cursor_row() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        add(&mut app, "A", '3');
        add(&mut app, "B", '1');
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('d'));
        let titles: Vec<_> = app.rows().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["B"]);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn list_actions_on_empty_store_do_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        app.focus = Focus::List;
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('d'));
        assert!(app.dialog.is_none());
        assert!(!app.data_file().exists());
    }

    #[test]
    fn load_error_is_reported_on_status_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "garbage").unwrap();
        let app = App::load(&path);
        assert!(app.store().is_empty());
        assert!(app.dialog.is_none());
        assert!(app.status.as_deref().unwrap().starts_with("Load error"));
    }

    #[test]
    fn skipped_entries_are_reported_on_status_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"[{"title":"keep"},{"title":"","priority":2,"due_date":"2030-01-01"},{"priority":3}]"#,
        )
        .unwrap();
        let app = App::load(&path);
        assert_eq!(app.store().len(), 1);
        assert!(app.dialog.is_none());
        let status = app.status.as_deref().unwrap();
        assert!(status.starts_with("Skipped 2 invalid entries"), "{status}");
    }

    #[test]
    fn clean_load_leaves_status_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"[{"title":"keep"}]"#).unwrap();
        let app = App::load(&path);
        assert_eq!(app.store().len(), 1);
        assert!(app.status.is_none());
    }

    #[test]
    fn save_failure_shows_error_dialog() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(TaskStore::new(), dir.path().join("missing/tasks.json"));
        add(&mut app, "A", '1');
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.dialog.as_ref().map(|d| d.kind), Some(DialogKind::Error));
    }

    #[test]
    fn export_prompt_writes_csv() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        add(&mut app, "A", '1');
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('v'));
        let target = dir.path().join("out.csv");
        app.export_prompt.as_mut().unwrap().path = target.display().to_string();
        press(&mut app, KeyCode::Enter);

        assert!(app.export_prompt.is_none());
        assert_eq!(app.dialog.as_ref().map(|d| d.kind), Some(DialogKind::Info));
        let text = fs::read_to_string(target).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn priority_field_stays_in_range() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        app.focus = Focus::Priority;
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.form.priority, Priority::MIN);
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.form.priority, Priority::MAX);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.form.priority.get(), 2);
    }

    #[test]
    fn q_quits_only_from_list() {
        let dir = TempDir::new().unwrap();
        let mut app = fresh(&dir);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit());
        assert_eq!(app.form.title, "q");
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
