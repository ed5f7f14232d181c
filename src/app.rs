use crate::config::Config;
use crate::error::AppError;
use crate::files::filter_files;
use crate::ingest::{ingest, parse_task};
use crate::models::{FileRecord, Priority, Task, TaskPatch};
use crate::parser::{format_task_input, parse_task_input};
use crate::session::Session;
use crate::store::RemoteStore;
use crate::views::{
    filter_by_priority, filter_by_search, filter_by_status, sort_tasks, toggle_completion,
    StatusFilter,
};
use chrono::{Local, NaiveDateTime};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Tasks,
    Reminders,
    Files,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Tasks, Screen::Reminders, Screen::Files, Screen::Profile];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Tasks => "Tasks",
            Screen::Reminders => "Reminders",
            Screen::Files => "Files",
            Screen::Profile => "Profile",
        }
    }

    fn next(self) -> Screen {
        let i = Screen::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Screen::ALL[(i + 1) % Screen::ALL.len()]
    }

    fn shows_tasks(&self) -> bool {
        matches!(self, Screen::Tasks | Screen::Reminders)
    }
}

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Insert,
    Search,
    Upload,
}

#[derive(PartialEq, Debug)]
pub enum ActiveInput {
    Title,
    Description,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    pub tasks: Vec<Task>,
    pub rejected_rows: usize,
    pub files: Vec<FileRecord>,
    pub session: Session,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub screen: Screen,
    pub state: ListState,
    pub filter: StatusFilter,
    pub priority: Option<Priority>,
    pub search: String,
    pub input_mode: InputMode,
    pub active_input: ActiveInput,
    pub new_task_title: String,
    pub new_task_description: String,
    // id of the task the form is editing, None when adding
    pub editing: Option<String>,
    pub show_detail: bool,
    pub upload_path: String,
    pub notice: Option<Notice>,
    pub clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl App {
    pub fn new(session: Session, config: Config, config_path: Option<PathBuf>) -> App {
        App {
            tasks: Vec::new(),
            rejected_rows: 0,
            files: Vec::new(),
            session,
            config,
            config_path,
            screen: Screen::Tasks,
            state: ListState::default(),
            filter: StatusFilter::All,
            priority: None,
            search: String::new(),
            input_mode: InputMode::Normal,
            active_input: ActiveInput::Title,
            new_task_title: String::new(),
            new_task_description: String::new(),
            editing: None,
            show_detail: false,
            upload_path: String::new(),
            notice: None,
            clock: local_now,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Tasks as shown on the task screens: sorted, then status filter,
    /// priority and search.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let sorted = sort_tasks(&self.tasks);
        let mut shown = filter_by_status(&sorted, self.filter, self.now());
        if let Some(priority) = self.priority {
            shown = filter_by_priority(&shown, priority);
        }
        filter_by_search(&shown, &self.search)
    }

    fn cycle_priority(&mut self) {
        self.priority = match self.priority {
            None => Some(Priority::High),
            Some(Priority::High) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::Low),
            Some(Priority::Low) => None,
        };
        self.reset_selection();
    }

    pub fn visible_files(&self) -> Vec<FileRecord> {
        filter_files(&self.files, &self.search)
    }

    fn visible_len(&self) -> usize {
        match self.screen {
            Screen::Tasks | Screen::Reminders => self.visible_tasks().len(),
            Screen::Files => self.visible_files().len(),
            Screen::Profile => 0,
        }
    }

    pub fn selected_task(&self) -> Option<Task> {
        if !self.screen.shows_tasks() {
            return None;
        }
        let i = self.state.selected()?;
        self.visible_tasks().into_iter().nth(i)
    }

    fn selected_file(&self) -> Option<FileRecord> {
        if self.screen != Screen::Files {
            return None;
        }
        let i = self.state.selected()?;
        self.visible_files().into_iter().nth(i)
    }

    fn reset_selection(&mut self) {
        let len = self.visible_len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            Some(_) => {}
        }
    }

    pub fn next(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: false,
        });
    }

    fn fail(&mut self, what: &str, err: &dyn std::fmt::Display) {
        error!("{}: {}", what, err);
        self.notice = Some(Notice {
            text: format!("{}: {}", what, err),
            is_error: true,
        });
    }

    /// Replaces the task snapshot with a fresh fetch. On failure the list
    /// is emptied.
    pub async fn refresh_tasks<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), AppError> {
        let rows = match store.list_tasks(self.session.owner_id()).await {
            Ok(rows) => rows,
            Err(err) => {
                self.tasks.clear();
                self.reset_selection();
                return Err(err.into());
            }
        };
        let ingested = ingest(rows);
        self.rejected_rows = ingested.rejected.len();
        self.tasks = ingested.tasks;
        self.reset_selection();
        info!(count = self.tasks.len(), rejected = self.rejected_rows, "tasks loaded");
        Ok(())
    }

    pub async fn refresh_files<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), AppError> {
        match store.list_files(self.session.owner_id()).await {
            Ok(files) => {
                self.files = files;
                self.reset_selection();
                Ok(())
            }
            Err(err) => {
                self.files.clear();
                self.reset_selection();
                Err(err.into())
            }
        }
    }

    pub async fn refresh<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let result = match self.refresh_tasks(store).await {
            Ok(()) => self.refresh_files(store).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) if self.rejected_rows > 0 => {
                let n = self.rejected_rows;
                self.notify(format!("{} malformed task(s) skipped", n));
            }
            Ok(()) => {}
            Err(err) => self.fail("Could not load data (press r to retry)", &err),
        }
    }

    /// Flips completion locally first and puts the old task back if the
    /// store rejects the change.
    pub async fn toggle_selected<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let Some(selected) = self.selected_task() else {
            return;
        };
        let Some(index) = self.tasks.iter().position(|t| t.id == selected.id) else {
            return;
        };

        let original = self.tasks[index].clone();
        let toggled = toggle_completion(&original);
        let patch = TaskPatch::completed(toggled.completed);
        self.tasks[index] = toggled;

        match store.update_task(&original.id, &patch).await {
            Ok(row) => match parse_task(row) {
                Ok(saved) => self.tasks[index] = saved,
                Err(err) => {
                    warn!(field = err.field(), id = %original.id, "updated row failed validation: {}", err);
                }
            },
            Err(err) => {
                self.tasks[index] = original;
                self.fail("Could not update task", &err);
            }
        }
        self.reset_selection();
    }

    pub async fn delete_selected<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        if let Some(task) = self.selected_task() {
            match store.delete_task(&task.id).await {
                Ok(()) => {
                    self.tasks.retain(|t| t.id != task.id);
                    self.notify(format!("Deleted \"{}\"", task.title));
                }
                Err(err) => self.fail("Could not delete task", &err),
            }
        } else if let Some(file) = self.selected_file() {
            match store.delete_file(&file.id_string(), Some(&file.path)).await {
                Ok(()) => {
                    self.files.retain(|f| f.id != file.id);
                    self.notify(format!("Deleted {}", file.name));
                }
                Err(err) => self.fail("Could not delete file", &err),
            }
        }
        self.reset_selection();
    }

    pub async fn create_from_input<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let parsed = parse_task_input(&self.new_task_title, self.now().date());
        let draft = match parsed.into_draft(&self.new_task_description) {
            Ok(draft) => draft,
            Err(err) => {
                self.fail("Invalid task", &err);
                return;
            }
        };

        let row = match store.create_task(&draft, self.session.owner_id()).await {
            Ok(row) => row,
            Err(err) => {
                self.fail("Could not create task", &err);
                return;
            }
        };
        match parse_task(row) {
            Ok(task) => {
                self.notify(format!("Added \"{}\"", task.title));
                self.tasks.push(task);
            }
            Err(err) => {
                warn!(field = err.field(), "created row failed validation: {}", err);
                self.fail("Task saved but rejected as malformed", &err);
            }
        }
        self.close_form();
        self.reset_selection();
    }

    /// Opens the task form prefilled from the selected task.
    pub fn start_edit(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        self.new_task_title = format_task_input(&task);
        self.new_task_description = task.description.clone();
        self.editing = Some(task.id);
        self.active_input = ActiveInput::Title;
        self.show_detail = false;
        self.input_mode = InputMode::Editing;
    }

    /// Sends the fields changed in the form. The snapshot is only replaced
    /// once the store accepts the update.
    pub async fn save_edit_from_input<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let Some(id) = self.editing.clone() else {
            return;
        };
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            self.fail("Could not update task", &"task is no longer loaded");
            self.close_form();
            return;
        };
        let parsed = parse_task_input(&self.new_task_title, self.now().date());
        let edit = match parsed.into_draft(&self.new_task_description) {
            Ok(edit) => edit,
            Err(err) => {
                self.fail("Invalid task", &err);
                return;
            }
        };

        let patch = TaskPatch::changes(&self.tasks[index], &edit);
        if patch.is_empty() {
            self.notify("No changes");
            self.close_form();
            return;
        }

        match store.update_task(&id, &patch).await {
            Ok(row) => match parse_task(row) {
                Ok(saved) => {
                    self.notify(format!("Updated \"{}\"", saved.title));
                    self.tasks[index] = saved;
                    self.close_form();
                }
                Err(err) => {
                    warn!(field = err.field(), id = %id, "updated row failed validation: {}", err);
                    self.fail("Task saved but rejected as malformed", &err);
                    self.close_form();
                }
            },
            Err(err) => self.fail("Could not update task", &err),
        }
        self.reset_selection();
    }

    fn close_form(&mut self) {
        self.new_task_title.clear();
        self.new_task_description.clear();
        self.editing = None;
        self.input_mode = InputMode::Normal;
    }

    pub async fn upload_from_input<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let path = PathBuf::from(self.upload_path.trim());
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                let raw = self.upload_path.clone();
                self.fail("Invalid path", &raw);
                return;
            }
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.fail("Could not read file", &err);
                return;
            }
        };
        let mime = mime_guess::from_path(&path).first_or_octet_stream();

        match store
            .upload_file(&name, mime.essence_str(), bytes, self.session.owner_id())
            .await
        {
            Ok(record) => {
                self.notify(format!("Uploaded {}", record.name));
                self.files.insert(0, record);
                self.upload_path.clear();
                self.input_mode = InputMode::Normal;
            }
            Err(err) => self.fail("Upload failed", &err),
        }
        self.reset_selection();
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.session.toggle_theme();
        self.config.ui.theme = theme;
        if let Some(path) = self.config_path.clone() {
            if let Err(err) = self.config.save(&path) {
                self.fail("Could not save theme", &err);
            }
        }
    }

    pub async fn sign_out<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let result = self.session.sign_out(store).await;
        self.tasks.clear();
        self.files.clear();
        self.reset_selection();
        match result {
            Ok(()) => self.notify("Signed out"),
            Err(err) => self.fail("Sign out incomplete", &err),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.state.select(None);
        self.reset_selection();
    }

    /// Returns true when the app should quit.
    pub async fn handle_input<S: RemoteStore + ?Sized>(&mut self, key: KeyEvent, store: &S) -> bool {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Tab => self.switch_screen(self.screen.next()),
                KeyCode::Char(c @ '1'..='4') => {
                    let i = c as usize - '1' as usize;
                    self.switch_screen(Screen::ALL[i]);
                }
                KeyCode::Char('f') if self.screen.shows_tasks() => {
                    self.filter = self.filter.next();
                    self.reset_selection();
                }
                KeyCode::Char('p') if self.screen.shows_tasks() => self.cycle_priority(),
                KeyCode::Char('/') => {
                    self.input_mode = InputMode::Search;
                }
                KeyCode::Esc => {
                    self.show_detail = false;
                    self.search.clear();
                    self.notice = None;
                    self.reset_selection();
                }
                KeyCode::Char('r') => self.refresh(store).await,
                KeyCode::Char('a') if self.screen.shows_tasks() => {
                    self.input_mode = InputMode::Editing;
                    self.new_task_title.clear();
                    self.new_task_description.clear();
                    self.editing = None;
                    self.show_detail = false;
                    self.active_input = ActiveInput::Title;
                }
                KeyCode::Char('e') if self.screen.shows_tasks() => self.start_edit(),
                KeyCode::Enter if self.screen.shows_tasks() => {
                    self.show_detail = !self.show_detail && self.selected_task().is_some();
                }
                KeyCode::Char('u') if self.screen == Screen::Files => {
                    self.input_mode = InputMode::Upload;
                    self.upload_path.clear();
                }
                KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(store).await,
                KeyCode::Char('d') => self.delete_selected(store).await,
                KeyCode::Char('T') => self.toggle_theme(),
                KeyCode::Char('S') if self.screen == Screen::Profile => self.sign_out(store).await,
                _ => {}
            },

            InputMode::Editing => match key.code {
                KeyCode::Char('i') => {
                    self.input_mode = InputMode::Insert;
                }
                KeyCode::Tab => {
                    self.active_input = match self.active_input {
                        ActiveInput::Title => ActiveInput::Description,
                        ActiveInput::Description => ActiveInput::Title,
                    };
                }
                KeyCode::Enter => {
                    if self.new_task_title.trim().is_empty() {
                        self.fail("Invalid task", &"title cannot be empty");
                    } else if self.editing.is_some() {
                        self.save_edit_from_input(store).await;
                    } else {
                        self.create_from_input(store).await;
                    }
                }
                KeyCode::Esc => self.close_form(),
                _ => {}
            },
            InputMode::Insert => match key.code {
                KeyCode::Char(c) => match self.active_input {
                    ActiveInput::Title => self.new_task_title.push(c),
                    ActiveInput::Description => self.new_task_description.push(c),
                },
                KeyCode::Backspace => match self.active_input {
                    ActiveInput::Title => {
                        self.new_task_title.pop();
                    }
                    ActiveInput::Description => {
                        self.new_task_description.pop();
                    }
                },
                KeyCode::Esc => {
                    self.input_mode = InputMode::Editing;
                }
                _ => {}
            },
            InputMode::Search => match key.code {
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.reset_selection();
                }
                KeyCode::Backspace => {
                    self.search.pop();
                    self.reset_selection();
                }
                KeyCode::Enter => self.input_mode = InputMode::Normal,
                KeyCode::Esc => {
                    self.search.clear();
                    self.input_mode = InputMode::Normal;
                    self.reset_selection();
                }
                _ => {}
            },
            InputMode::Upload => match key.code {
                KeyCode::Char(c) => self.upload_path.push(c),
                KeyCode::Backspace => {
                    self.upload_path.pop();
                }
                KeyCode::Enter => {
                    if !self.upload_path.trim().is_empty() {
                        self.upload_from_input(store).await;
                    }
                }
                KeyCode::Esc => {
                    self.upload_path.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::models::{TaskRow, User};
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;
    use crossterm::event::KeyModifiers;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn row(id: &str, title: &str, due: &str, completed: bool) -> TaskRow {
        serde_json::from_value(json!({
            "id": id,
            "title": title,
            "due_date": due,
            "priority": "Medium",
            "completed": completed,
            "user_id": "u-1"
        }))
        .unwrap()
    }

    fn app() -> App {
        let user = User {
            id: "u-1".to_string(),
            email: None,
        };
        let mut app = App::new(Session::new(Some(user), Theme::Light), Config::default(), None);
        app.clock = fixed_now;
        app
    }

    fn store() -> MemoryStore {
        MemoryStore::with_tasks(vec![
            row("1", "Later", "2026-10-20", false),
            row("2", "Overdue", "2026-10-17", false),
            row("3", "Done", "2026-10-18", true),
        ])
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn titles(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_refresh_loads_sorted_snapshot_and_skips_bad_rows() {
        let store = store();
        store
            .tasks
            .lock()
            .unwrap()
            .push(row("4", "Broken", "not-a-date", false));
        let mut app = app();
        app.refresh(&store).await;

        assert_eq!(app.tasks.len(), 3);
        assert_eq!(app.rejected_rows, 1);
        assert_eq!(titles(&app.visible_tasks()), vec!["Overdue", "Done", "Later"]);
        assert_eq!(app.state.selected(), Some(0));
        assert!(app.notice.as_ref().is_some_and(|n| !n.is_error));
    }

    #[tokio::test]
    async fn test_failed_fetch_empties_list_and_reports() {
        let store = store();
        store.fail_reads.store(true, Ordering::SeqCst);
        let mut app = app();
        app.tasks = vec![parse_task(row("9", "Stale", "2026-10-18", false)).unwrap()];
        app.refresh(&store).await;

        assert!(app.tasks.is_empty());
        assert_eq!(app.state.selected(), None);
        assert!(app.notice.as_ref().is_some_and(|n| n.is_error));
    }

    #[tokio::test]
    async fn test_toggle_persists_on_success() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        app.state.select(Some(0));
        app.toggle_selected(&store).await;

        let task = app.tasks.iter().find(|t| t.id == "2").unwrap();
        assert!(task.completed);
        let rows = store.tasks.lock().unwrap();
        assert_eq!(rows[1].completed, Some(true));
    }

    #[tokio::test]
    async fn test_toggle_rolls_back_on_failure() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        let before = app.tasks.clone();
        store.fail_writes.store(true, Ordering::SeqCst);

        app.state.select(Some(0));
        app.toggle_selected(&store).await;
        assert_eq!(app.tasks, before);
        assert!(app.notice.as_ref().is_some_and(|n| n.is_error));
    }

    #[tokio::test]
    async fn test_filter_key_cycles_status_filter() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Char('f')), &store).await;
        assert_eq!(app.filter, StatusFilter::Today);
        // the only task due today is completed
        assert!(app.visible_tasks().is_empty());
        assert_eq!(app.state.selected(), None);

        app.handle_input(key(KeyCode::Char('f')), &store).await;
        app.handle_input(key(KeyCode::Char('f')), &store).await;
        assert_eq!(app.filter, StatusFilter::Overdue);
        assert_eq!(titles(&app.visible_tasks()), vec!["Overdue"]);
    }

    #[tokio::test]
    async fn test_priority_key_narrows_list() {
        let store = store();
        store.tasks.lock().unwrap()[0].priority = Some("High".to_string());
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Char('p')), &store).await;
        assert_eq!(app.priority, Some(Priority::High));
        assert_eq!(titles(&app.visible_tasks()), vec!["Later"]);

        for _ in 0..3 {
            app.handle_input(key(KeyCode::Char('p')), &store).await;
        }
        assert_eq!(app.priority, None);
        assert_eq!(app.visible_tasks().len(), 3);
    }

    #[tokio::test]
    async fn test_search_mode_narrows_list() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Char('/')), &store).await;
        for c in "LAT".chars() {
            app.handle_input(key(KeyCode::Char(c)), &store).await;
        }
        app.handle_input(key(KeyCode::Enter), &store).await;
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(titles(&app.visible_tasks()), vec!["Later"]);

        app.handle_input(key(KeyCode::Esc), &store).await;
        assert_eq!(app.visible_tasks().len(), 3);
    }

    #[tokio::test]
    async fn test_add_task_through_form() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Char('a')), &store).await;
        app.handle_input(key(KeyCode::Char('i')), &store).await;
        for c in "Call mom !high ^tomorrow".chars() {
            app.handle_input(key(KeyCode::Char(c)), &store).await;
        }
        app.handle_input(key(KeyCode::Esc), &store).await;
        app.handle_input(key(KeyCode::Enter), &store).await;

        assert_eq!(app.input_mode, InputMode::Normal);
        let added = app.tasks.iter().find(|t| t.title == "Call mom").unwrap();
        assert_eq!(added.due_date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(added.owner_id.as_deref(), Some("u-1"));
        assert_eq!(store.tasks.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_add_with_only_markers_is_rejected_locally() {
        let store = store();
        let mut app = app();
        app.new_task_title = "!high #Work".to_string();
        app.create_from_input(&store).await;

        assert!(app.notice.as_ref().is_some_and(|n| n.is_error));
        assert_eq!(store.tasks.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_snapshot_and_form() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        let before = app.tasks.clone();
        store.fail_writes.store(true, Ordering::SeqCst);

        app.handle_input(key(KeyCode::Char('a')), &store).await;
        app.new_task_title = "Book flights !high".to_string();
        app.handle_input(key(KeyCode::Enter), &store).await;

        assert_eq!(app.tasks, before);
        assert!(app.notice.as_ref().is_some_and(|n| n.is_error));
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.new_task_title, "Book flights !high");
        assert_eq!(store.tasks.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_created_row_is_reported_as_saved() {
        let store = store();
        store.garble_writes.store(true, Ordering::SeqCst);
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Char('a')), &store).await;
        app.new_task_title = "Book flights".to_string();
        app.handle_input(key(KeyCode::Enter), &store).await;

        assert_eq!(app.tasks.len(), 3);
        assert_eq!(store.tasks.lock().unwrap().len(), 4);
        let notice = app.notice.clone().unwrap();
        assert!(notice.is_error);
        assert!(notice.text.starts_with("Task saved but rejected as malformed"));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.new_task_title.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_after_toggle_keeps_local_change() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        store.garble_writes.store(true, Ordering::SeqCst);

        app.state.select(Some(0));
        app.toggle_selected(&store).await;

        let task = app.tasks.iter().find(|t| t.id == "2").unwrap();
        assert!(task.completed);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_edit_sends_changed_fields_and_replaces_task() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        // "Later" sorts last
        app.state.select(Some(2));

        app.handle_input(key(KeyCode::Char('e')), &store).await;
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.editing.as_deref(), Some("1"));
        assert_eq!(app.new_task_title, "Later !medium ^2026-10-20");

        app.new_task_title = "Later today !high ^2026-10-18 18:30 #Errands".to_string();
        app.new_task_description = "bring receipt".to_string();
        app.handle_input(key(KeyCode::Enter), &store).await;

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.editing, None);
        let task = app.tasks.iter().find(|t| t.id == "1").unwrap();
        assert_eq!(task.title, "Later today");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(task.due_time, chrono::NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(task.category.as_deref(), Some("Errands"));
        assert_eq!(task.description, "bring receipt");

        let rows = store.tasks.lock().unwrap();
        assert_eq!(rows[0].title.as_deref(), Some("Later today"));
        assert_eq!(rows[0].due_time.as_deref(), Some("18:30:00"));
        assert_eq!(rows[0].description.as_deref(), Some("bring receipt"));
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_task_and_form() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        let before = app.tasks.clone();
        app.state.select(Some(2));
        app.start_edit();
        app.new_task_title = "Renamed !low ^2026-10-20".to_string();
        store.fail_writes.store(true, Ordering::SeqCst);

        app.save_edit_from_input(&store).await;

        assert_eq!(app.tasks, before);
        assert!(app.notice.as_ref().is_some_and(|n| n.is_error));
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.editing.as_deref(), Some("1"));
        assert_eq!(store.tasks.lock().unwrap()[0].title.as_deref(), Some("Later"));
    }

    #[tokio::test]
    async fn test_edit_without_changes_skips_store() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        app.state.select(Some(2));
        app.start_edit();
        store.fail_writes.store(true, Ordering::SeqCst);

        app.save_edit_from_input(&store).await;

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.notice.as_ref().is_some_and(|n| !n.is_error));
    }

    #[tokio::test]
    async fn test_enter_toggles_detail_view() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;

        app.handle_input(key(KeyCode::Enter), &store).await;
        assert!(app.show_detail);
        // Enter no longer completes the task
        assert!(app.tasks.iter().all(|t| t.id != "2" || !t.completed));

        app.handle_input(key(KeyCode::Esc), &store).await;
        assert!(!app.show_detail);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_snapshot() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        store.fail_writes.store(true, Ordering::SeqCst);
        app.handle_input(key(KeyCode::Char('d')), &store).await;
        assert_eq!(app.tasks.len(), 3);

        store.fail_writes.store(false, Ordering::SeqCst);
        app.handle_input(key(KeyCode::Char('d')), &store).await;
        assert_eq!(app.tasks.len(), 2);
        assert!(app.tasks.iter().all(|t| t.id != "2"));
    }

    #[tokio::test]
    async fn test_upload_and_delete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let store = store();
        let mut app = app();
        app.handle_input(key(KeyCode::Char('3')), &store).await;
        assert_eq!(app.screen, Screen::Files);
        app.handle_input(key(KeyCode::Char('u')), &store).await;
        app.upload_path = path.display().to_string();
        app.handle_input(key(KeyCode::Enter), &store).await;

        assert_eq!(app.files.len(), 1);
        assert_eq!(app.files[0].mime_type, "text/plain");
        assert_eq!(app.files[0].size, 5);

        app.handle_input(key(KeyCode::Char('d')), &store).await;
        assert!(app.files.is_empty());
        assert!(store.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_from_profile_clears_state() {
        let store = store();
        let mut app = app();
        app.refresh(&store).await;
        app.handle_input(key(KeyCode::Char('4')), &store).await;
        app.handle_input(key(KeyCode::Char('S')), &store).await;

        assert!(app.session.user.is_none());
        assert!(app.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_theme_toggle_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = store();
        let mut app = app();
        app.config_path = Some(path.clone());
        app.handle_input(key(KeyCode::Char('T')), &store).await;

        assert_eq!(app.session.theme, Theme::Dark);
        assert_eq!(Config::from_file(&path).unwrap().ui.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_quit_key() {
        let store = store();
        let mut app = app();
        assert!(app.handle_input(key(KeyCode::Char('q')), &store).await);
    }
}
