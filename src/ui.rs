use crate::app::{ActiveInput, App, InputMode, Screen};
use crate::config::Theme;
use crate::files::human_size;
use crate::models::{Priority, Task};
use crate::store::RemoteStore;
use crate::views::{
    classify, completion_stats, group_by_due_date, status_counts, Classification,
};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            text: Color::White,
            muted: Color::DarkGray,
            accent: Color::Cyan,
        },
        Theme::Light => Palette {
            text: Color::Reset,
            muted: Color::Gray,
            accent: Color::Blue,
        },
    }
}

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn status_color(status: Classification) -> Color {
    match status {
        Classification::Completed => Color::DarkGray,
        Classification::Overdue => Color::Red,
        Classification::DueToday => Color::Yellow,
        Classification::Upcoming => Color::Green,
    }
}

fn key_hint(key: &'static str, what: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!(" {} ", key), Style::default().fg(Color::Red)),
        Span::raw(format!(": {} ", what)),
    ]
}

fn get_legend(app: &App) -> Text<'static> {
    let hints: Vec<(&'static str, &'static str)> = match app.input_mode {
        InputMode::Normal => {
            let mut hints = vec![("q", "Quit"), ("j/k", "Move"), ("Tab", "Screen"), ("/", "Search")];
            match app.screen {
                Screen::Tasks | Screen::Reminders => hints.extend([
                    ("f", "Filter"),
                    ("p", "Priority"),
                    ("a", "Add"),
                    ("e", "Edit"),
                    ("Enter", "Details"),
                    ("Space", "Done"),
                    ("d", "Delete"),
                ]),
                Screen::Files => hints.extend([("u", "Upload"), ("d", "Delete")]),
                Screen::Profile => hints.extend([("T", "Theme"), ("S", "Sign out")]),
            }
            hints.push(("r", "Refresh"));
            hints
        }
        InputMode::Editing => vec![
            ("i", "Insert"),
            ("Tab", "Switch Field"),
            ("Enter", "Submit"),
            ("Esc", "Cancel"),
        ],
        InputMode::Insert => vec![("Esc", "Normal Mode")],
        InputMode::Search => vec![("Enter", "Keep"), ("Esc", "Clear")],
        InputMode::Upload => vec![("Enter", "Upload"), ("Esc", "Cancel")],
    };

    let spans: Vec<Span<'static>> = hints
        .into_iter()
        .flat_map(|(key, what)| key_hint(key, what))
        .collect();
    Text::from(Line::from(spans))
}

fn task_line(task: &Task, status: Classification, with_status: bool) -> Line<'static> {
    let mut spans = Vec::new();
    let mark = if task.completed { "[x] " } else { "[ ] " };
    spans.push(Span::raw(mark));
    spans.push(Span::styled(
        "● ",
        Style::default().fg(priority_color(task.priority)),
    ));
    let title_style = if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    spans.push(Span::styled(task.title.clone(), title_style));
    if let Some(time) = task.due_time {
        spans.push(Span::styled(
            format!("  {}", time.format("%H:%M")),
            Style::default().fg(Color::Gray),
        ));
    }
    if let Some(category) = &task.category {
        spans.push(Span::styled(
            format!("  #{}", category),
            Style::default().fg(Color::Magenta),
        ));
    }
    if with_status && status != Classification::Upcoming {
        spans.push(Span::styled(
            format!("  {}", status.label()),
            Style::default()
                .fg(status_color(status))
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect, pal: &Palette) {
    let now = app.now();
    let stats = completion_stats(&app.tasks);
    let counts = status_counts(&app.tasks, now);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let summary = Line::from(vec![
        Span::styled(
            format!(" {}% done ", stats.rate),
            Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("{}/{}  ", stats.completed, stats.total)),
        Span::styled(format!("{} today  ", counts.due_today), Style::default().fg(Color::Yellow)),
        Span::styled(format!("{} overdue  ", counts.overdue), Style::default().fg(Color::Red)),
        Span::styled(format!("{} upcoming", counts.upcoming), Style::default().fg(Color::Green)),
    ]);
    let header = Paragraph::new(summary).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Dashboard · {}", app.session.display_name())),
    );
    f.render_widget(header, chunks[0]);

    let visible = app.visible_tasks();
    let title = list_title(app, visible.len());

    // date headers are not selectable, so the list holds task rows only and
    // each row carries its group date when it starts a new group
    let items: Vec<ListItem> = if app.screen == Screen::Tasks {
        group_by_due_date(&visible)
            .into_iter()
            .flat_map(|(date, tasks)| {
                tasks.into_iter().enumerate().map(move |(i, task)| {
                    let status = classify(&task, now);
                    let mut lines = Vec::new();
                    if i == 0 {
                        lines.push(Line::from(Span::styled(
                            date.clone(),
                            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
                        )));
                    }
                    lines.push(task_line(&task, status, false));
                    ListItem::new(lines)
                })
            })
            .collect()
    } else {
        visible
            .iter()
            .map(|task| {
                let status = classify(task, now);
                let mut line = task_line(task, status, true);
                line.spans.push(Span::styled(
                    format!("  {}", task.due_date.format("%b %-d, %Y")),
                    Style::default().fg(pal.muted),
                ));
                ListItem::new(line).style(Style::default().fg(status_color(status)))
            })
            .collect()
    };

    let empty = if app.tasks.is_empty() {
        "No tasks yet. Press a to create your first task!"
    } else {
        "No tasks match"
    };
    let list = if items.is_empty() {
        List::new(vec![ListItem::new(empty)])
    } else {
        List::new(items)
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    }
    .block(Block::default().borders(Borders::ALL).title(title));

    f.render_stateful_widget(list, chunks[1], &mut app.state);
}

fn list_title(app: &App, count: usize) -> String {
    let mut title = format!("{} ({}) · {}", app.screen.title(), app.filter.label(), count);
    if let Some(priority) = app.priority {
        title.push_str(&format!(" · {}", priority));
    }
    if !app.search.is_empty() {
        title.push_str(&format!(" · \"{}\"", app.search));
    }
    title
}

fn render_files(f: &mut Frame, app: &mut App, area: Rect, pal: &Palette) {
    let files = app.visible_files();
    let items: Vec<ListItem> = files
        .iter()
        .map(|file| {
            ListItem::new(Line::from(vec![
                Span::raw(file.name.clone()),
                Span::styled(
                    format!("  {}", human_size(file.size)),
                    Style::default().fg(pal.muted),
                ),
                Span::styled(
                    format!("  {}", file.mime_type),
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(
                    format!("  {}", file.created_at.as_deref().unwrap_or("")),
                    Style::default().fg(pal.muted),
                ),
            ]))
        })
        .collect();

    let title = if app.search.is_empty() {
        format!("Files · {}", files.len())
    } else {
        format!("Files · {} · \"{}\"", files.len(), app.search)
    };
    let list = if items.is_empty() {
        List::new(vec![ListItem::new("No files. Press u to upload one.")])
    } else {
        List::new(items)
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    }
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_stateful_widget(list, area, &mut app.state);
}

fn render_profile(f: &mut Frame, app: &App, area: Rect, pal: &Palette) {
    let stats = completion_stats(&app.tasks);
    let counts = status_counts(&app.tasks, app.now());
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let theme = match app.session.theme {
        Theme::Light => "Light",
        Theme::Dark => "Dark",
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Account: ", bold),
            Span::raw(app.session.display_name().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Tasks: ", bold),
            Span::raw(format!(
                "{} total, {} completed ({}%)",
                stats.total, stats.completed, stats.rate
            )),
        ]),
        Line::from(vec![
            Span::styled("Open: ", bold),
            Span::raw(format!(
                "{} overdue, {} today, {} upcoming",
                counts.overdue, counts.due_today, counts.upcoming
            )),
        ]),
        Line::from(vec![
            Span::styled("Files: ", bold),
            Span::raw(app.files.len().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Theme: ", bold),
            Span::styled(theme, Style::default().fg(pal.accent)),
        ]),
    ];
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Profile"))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_add_popup(f: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_absolute(area.width * 6 / 10, 8, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(5)].as_ref())
        .split(popup_area);

    let field_style = |field: ActiveInput| {
        if app.active_input == field {
            let color = if app.input_mode == InputMode::Insert {
                Color::Yellow
            } else {
                Color::Green
            };
            Style::default().fg(color)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let form_title = if app.editing.is_some() {
        "Edit Task (!high ^tomorrow 09:00 #Work)"
    } else {
        "New Task (!high ^tomorrow 09:00 #Work)"
    };
    let title_input = Paragraph::new(app.new_task_title.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(form_title)
                .style(field_style(ActiveInput::Title)),
        )
        .wrap(Wrap { trim: false });
    let description_input = Paragraph::new(app.new_task_description.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Description")
                .style(field_style(ActiveInput::Description)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(title_input, chunks[0]);
    f.render_widget(description_input, chunks[1]);
}

fn render_detail(f: &mut Frame, task: &Task, status: Classification, area: Rect, pal: &Palette) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let due = match task.due_time {
        Some(time) => format!("{} {}", task.due_date.format("%b %-d, %Y"), time.format("%H:%M")),
        None => task.due_date.format("%b %-d, %Y").to_string(),
    };

    let mut lines = vec![
        Line::from(vec![Span::styled("Due: ", bold), Span::raw(due)]),
        Line::from(vec![
            Span::styled("Priority: ", bold),
            Span::styled(
                task.priority.to_string(),
                Style::default().fg(priority_color(task.priority)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Category: ", bold),
            Span::raw(task.category.clone().unwrap_or_else(|| "None".to_string())),
        ]),
        Line::from(vec![
            Span::styled("Status: ", bold),
            Span::styled(status.label(), Style::default().fg(status_color(status))),
        ]),
        Line::from(Span::styled("Description: ", bold)),
    ];
    if task.description.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            "No description",
            Style::default().fg(pal.muted),
        )));
    } else {
        lines.extend(task.description.lines().map(|l| Line::from(l.to_string())));
    }

    let popup_area = centered_rect_absolute(area.width * 7 / 10, area.height * 7 / 10, area);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(task.title.clone())
                .style(Style::default().fg(pal.text)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, popup_area);
    f.render_widget(paragraph, popup_area);
}

fn render_prompt(f: &mut Frame, title: &str, value: &str, area: Rect) {
    let popup_area = centered_rect_absolute(area.width * 6 / 10, 3, area);
    let input = Paragraph::new(value).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .style(Style::default().fg(Color::Green)),
    );
    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

fn draw(f: &mut Frame, app: &mut App) {
    let pal = palette(app.session.theme);
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    let tabs: Vec<Span> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, screen)| {
            let style = if *screen == app.screen {
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(pal.muted)
            };
            Span::styled(format!(" {} {} ", i + 1, screen.title()), style)
        })
        .collect();
    f.render_widget(
        Paragraph::new(Line::from(tabs)).style(Style::default().fg(pal.text)),
        chunks[0],
    );

    match app.screen {
        Screen::Tasks | Screen::Reminders => render_tasks(f, app, chunks[1], &pal),
        Screen::Files => render_files(f, app, chunks[1], &pal),
        Screen::Profile => render_profile(f, app, chunks[1], &pal),
    }

    match app.input_mode {
        InputMode::Editing | InputMode::Insert => render_add_popup(f, app, chunks[1]),
        InputMode::Search => render_prompt(f, "Search", &app.search, chunks[1]),
        InputMode::Upload => render_prompt(f, "Upload file (local path)", &app.upload_path, chunks[1]),
        InputMode::Normal if app.show_detail => {
            if let Some(task) = app.selected_task() {
                let status = classify(&task, app.now());
                render_detail(f, &task, status, chunks[1], &pal);
            }
        }
        InputMode::Normal => {}
    }

    if let Some(notice) = &app.notice {
        let color = if notice.is_error { Color::Red } else { Color::Green };
        let status = Paragraph::new(notice.text.as_str()).style(Style::default().fg(color));
        f.render_widget(status, chunks[2]);
    }

    let legend = Paragraph::new(get_legend(app))
        .style(Style::default().fg(pal.text))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[3]);
}

pub async fn run_app<B: Backend, S: RemoteStore + ?Sized>(
    terminal: &mut Terminal<B>,
    mut app: App,
    store: &S,
) -> io::Result<()> {
    app.refresh(store).await;
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_input(key, store).await {
                    return Ok(());
                }
            }
        }
    }
}
