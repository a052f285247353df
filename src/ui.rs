use crate::app::{App, DialogKind, Focus, DUE_DATE_PLACEHOLDER};
use crate::persistence::ExportFormat;
use crossterm::event::{self, Event};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if let Event::Key(key) = event::read()? {
            app.handle_key(key);
        }
        if app.should_quit() {
            return Ok(());
        }
    }
}

pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_form(f, app, chunks[0]);
    render_tasks(f, app, chunks[1]);
    render_status(f, app, chunks[2]);

    if let Some(prompt) = &app.export_prompt {
        let title = match prompt.format {
            ExportFormat::Json => "Export JSON to",
            ExportFormat::Csv => "Export CSV to",
        };
        let area = centered(f.area(), 60, 3);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(prompt.path.as_str()).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            ),
            area,
        );
    }

    if let Some(dialog) = &app.dialog {
        let color = match dialog.kind {
            DialogKind::Info => Color::Cyan,
            DialogKind::Warning => Color::Yellow,
            DialogKind::Error => Color::Red,
        };
        let area = centered(f.area(), 60, 5);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(dialog.message.as_str())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .title(dialog.title.as_str())
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            area,
        );
    }
}

fn field_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
}

fn render_form(f: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(55),
            Constraint::Percentage(15),
            Constraint::Percentage(30),
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(app.form.title.as_str()).block(field_block("Task", app.focus == Focus::Title)),
        cols[0],
    );
    f.render_widget(
        Paragraph::new(app.form.priority.to_string())
            .block(field_block("Priority", app.focus == Focus::Priority)),
        cols[1],
    );
    let due = if app.form.due_date.is_empty() && app.focus != Focus::DueDate {
        Span::styled(DUE_DATE_PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.form.due_date.as_str())
    };
    f.render_widget(
        Paragraph::new(Line::from(due)).block(field_block("Due Date", app.focus == Focus::DueDate)),
        cols[2],
    );
}

fn render_tasks(f: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["", "Title", "Status", "Priority", "Due Date"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .rows()
        .into_iter()
        .map(|t| {
            let color = if t.completed { Color::Green } else { Color::Red };
            let mark = if app.is_selected(t.id) { "●" } else { " " };
            Row::new(vec![
                Cell::from(mark),
                Cell::from(t.title.as_str()),
                Cell::from(t.status_glyph()),
                Cell::from(t.priority.to_string()),
                Cell::from(t.due_date.as_str()),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(field_block("Tasks", app.focus == Focus::List))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !app.store().is_empty() {
        state.select(Some(app.cursor));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let help = match app.focus {
        Focus::List => "↑/↓ move  space mark  c complete  d delete  a add  j/v export  q quit",
        _ => "tab next field  enter add  esc list",
    };
    let line = match &app.status {
        Some(msg) => Line::from(vec![
            Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)),
            Span::raw("  |  "),
            Span::raw(help),
        ]),
        None => Line::from(help),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::task::Priority;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for line in buffer.content.chunks(buffer.area.width as usize) {
            for cell in line {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app_with(tasks: &[(&str, u8, bool)]) -> App {
        let mut store = TaskStore::new();
        for &(title, p, _) in tasks {
            store.add(title, Priority::new(p).unwrap(), "2030-01-01").unwrap();
        }
        let done: Vec<_> = store
            .tasks()
            .iter()
            .zip(tasks)
            .filter(|(_, row)| row.2)
            .map(|(t, _)| t.id)
            .collect();
        store.complete_ids(&done);
        App::new(store, PathBuf::from("unused.json"))
    }

    #[test]
    fn rows_follow_display_order_with_glyphs() {
        let app = app_with(&[("Alpha", 3, false), ("Bravo", 1, false), ("Charlie", 1, true)]);
        let text = screen(&app);
        let b = text.find("Bravo").unwrap();
        let a = text.find("Alpha").unwrap();
        let c = text.find("Charlie").unwrap();
        assert!(b < a && a < c);
        assert!(text.contains('✔'));
        assert!(text.contains('✘'));
    }

    #[test]
    fn placeholder_shows_until_due_date_is_focused() {
        let mut app = app_with(&[]);
        assert!(screen(&app).contains(DUE_DATE_PLACEHOLDER));
        app.focus = Focus::DueDate;
        assert!(!screen(&app).contains(DUE_DATE_PLACEHOLDER));
    }

    #[test]
    fn dialog_is_drawn_over_the_list() {
        let mut app = app_with(&[("Alpha", 1, false)]);
        app.focus = Focus::Title;
        app.submit_form();
        let text = screen(&app);
        assert!(text.contains("Input Error"));
        assert!(text.contains("Task title cannot be empty"));
    }
}
