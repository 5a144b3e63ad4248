//! Terminal browser: code pane, annotation pane and the event loop tying them to a session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::runtime::Runtime;

use crate::app::annotations::{AnnotationCoordinator, Resolution};
use crate::app::detect::{LanguageHint, StructureDetector};
use crate::app::history::{HistorySnapshot, HistoryStore};
use crate::app::service::AnnotationService;
use crate::app::session::{AnnotationRequest, AnnotatorSession};
use crate::app::view::{SourceView, ViewRequest, ViewService};
use crate::app::watch::SourceWatcher;
use crate::domain::errors::{DomainError, ServiceError};
use crate::domain::model::FileRecord;
use crate::infra::config::Config;
use crate::infra::highlight::HighlightMode;
use crate::ui::components::annotation_panel::{AnnotationPanel, PanelText};
use crate::ui::components::code_view::CodeView;
use crate::ui::components::split::{DragGuard, SplitLayout};

const TICK_RATE: Duration = Duration::from_millis(120);
const SCROLL_STEP: usize = 3;

/// What to open in the browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub path: PathBuf,
    /// Remote file id to annotate against; falls back to the id remembered from an upload.
    pub file_id: Option<String>,
    pub language: LanguageHint,
    /// Directory holding `.spanlens/`.
    pub state_root: PathBuf,
    pub watch: bool,
}

/// Result of background work, sent back to the event loop.
#[derive(Debug)]
enum TaskOutcome {
    Annotation {
        request: AnnotationRequest,
        result: Result<Resolution, ServiceError>,
    },
    Detail {
        request: AnnotationRequest,
        result: Result<Resolution, ServiceError>,
    },
    Upload {
        result: Result<FileRecord, ServiceError>,
    },
}

/// Interactive browser over one source file.
pub struct BrowserApp {
    config: Config,
    path: PathBuf,
    session: AnnotatorSession,
    view_service: ViewService,
    view: SourceView,
    panel: AnnotationPanel,
    split: SplitLayout,
    drag: Option<DragGuard>,
    scroll: usize,
    main_area: Rect,
    code_area: Rect,
    runtime: Runtime,
    outcomes_tx: Sender<TaskOutcome>,
    outcomes_rx: Receiver<TaskOutcome>,
    watcher: Option<SourceWatcher>,
    history_store: HistoryStore,
    history: HistorySnapshot,
    status: Option<StatusMessage>,
    should_quit: bool,
}

impl BrowserApp {
    pub fn new(
        config: Config,
        options: BrowserOptions,
        service: Arc<dyn AnnotationService>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let history_store = HistoryStore::new(&options.state_root);
        let history = history_store.load_or_default()?;
        let split_percent = history
            .split_percent
            .unwrap_or(config.display.split_percent);

        let detector = StructureDetector::new(config.detector.options());
        let session = AnnotatorSession::new(
            detector,
            options.language,
            AnnotationCoordinator::new(service),
        );
        let watcher = if options.watch {
            SourceWatcher::new(&options.path)
                .inspect_err(|err| tracing::warn!(error = %err, "file watching disabled"))
                .ok()
        } else {
            None
        };
        let (outcomes_tx, outcomes_rx) = mpsc::channel();

        let mut app = Self {
            config,
            path: options.path,
            session,
            view_service: ViewService::new(),
            view: SourceView {
                lines: Vec::new(),
                language: None,
                theme: String::new(),
                mode: HighlightMode::Plain,
            },
            panel: AnnotationPanel::new(),
            split: SplitLayout::new(split_percent),
            drag: None,
            scroll: 0,
            main_area: Rect::default(),
            code_area: Rect::default(),
            runtime,
            outcomes_tx,
            outcomes_rx,
            watcher,
            history_store,
            history,
            status: None,
            should_quit: false,
        };
        app.bootstrap(options.file_id)?;
        Ok(app)
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
        terminal.hide_cursor().ok();

        let event_loop_result = self.event_loop(&mut terminal);
        self.drag = None;

        disable_raw_mode().ok();
        let _ = execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = terminal.show_cursor();

        self.save_history();
        event_loop_result
    }

    fn bootstrap(&mut self, file_id: Option<String>) -> Result<()> {
        let text = read_source(&self.path)?;
        let file_id = file_id.or_else(|| {
            self.history
                .file_id_for(&self.path)
                .map(ToString::to_string)
        });
        match file_id {
            Some(id) => {
                self.session.load_file(id, text);
            }
            None => {
                self.session.set_text(text);
                self.set_status(StatusLevel::Info, "Not uploaded yet · press u to upload");
            }
        }
        self.rebuild_view();
        Ok(())
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick();

            if self.should_quit {
                break;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev)?;
            }
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(size);

        self.main_area = layout[0];
        let (code_area, panel_area) = self.split.areas(layout[0]);
        self.code_area = code_area;

        let title = self.title();
        CodeView.render(
            &self.view,
            &title,
            self.scroll,
            !self.split.is_dragging(),
            code_area,
            frame.buffer_mut(),
        );
        self.panel
            .render(frame, panel_area, self.split.is_dragging());

        let hints = Paragraph::new(Line::from(vec![
            Span::styled("j/k", Style::default().fg(Color::Cyan)),
            Span::raw(" move · "),
            Span::styled("↵", Style::default().fg(Color::Cyan)),
            Span::raw(" annotate · "),
            Span::styled("m", Style::default().fg(Color::Cyan)),
            Span::raw(" more · "),
            Span::styled("u", Style::default().fg(Color::Cyan)),
            Span::raw(" upload · "),
            Span::styled("r", Style::default().fg(Color::Cyan)),
            Span::raw(" reload · "),
            Span::styled("+/-", Style::default().fg(Color::Cyan)),
            Span::raw(" resize · "),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(" quit"),
        ]))
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(hints, layout[1]);

        self.render_status(frame, layout[2]);
    }

    fn title(&self) -> String {
        let file = match self.session.file_id() {
            Some(id) => format!("file {id}"),
            None => "not uploaded".to_string(),
        };
        format!(
            "{} · {} · {} definitions · {}",
            self.path.display(),
            self.session.language(),
            self.session.spans().len(),
            file
        )
    }

    fn render_status(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let message = self.status.as_ref().map(|status| {
            let style = match status.level {
                StatusLevel::Info => Style::default().fg(Color::Gray),
                StatusLevel::Success => Style::default().fg(Color::Green),
                StatusLevel::Error => Style::default().fg(Color::Red),
            };
            Line::styled(status.text.clone(), style)
        });

        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let line = message.unwrap_or_else(|| {
            Line::styled(
                "Ready · click a definition to annotate it",
                Style::default().fg(Color::DarkGray),
            )
        });
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn tick(&mut self) {
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
        if self
            .watcher
            .as_ref()
            .is_some_and(SourceWatcher::poll_changed)
        {
            self.reload("File changed on disk; spans refreshed");
        }
        self.drain_outcomes();
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key_event(key),
            Event::Mouse(mouse) => self.handle_mouse_event(mouse),
            Event::Resize(..) | Event::FocusGained | Event::Paste(_) => {}
            // Releasing outside the window never reports a mouse-up.
            Event::FocusLost => self.drag = None,
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') | KeyCode::Char('q') = key.code {
                self.should_quit = true;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.step_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.step_selection(-1),
            KeyCode::Enter => self.request_annotation(),
            KeyCode::Char('m') => self.request_detail(),
            KeyCode::Char('u') => self.upload(),
            KeyCode::Char('r') => self.reload("Reloaded from disk"),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.split.grow();
                self.remember_split();
            }
            KeyCode::Char('-') => {
                self.split.shrink();
                self.remember_split();
            }
            KeyCode::PageDown => self.scroll_by(self.page_height() as isize),
            KeyCode::PageUp => self.scroll_by(-(self.page_height() as isize)),
            _ => {}
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.split.is_divider(self.main_area, mouse.row) {
                    self.drag = Some(self.split.begin_drag());
                } else if let Some(line) =
                    CodeView::line_at(&self.view, self.code_area, self.scroll, mouse.row)
                {
                    self.click_line(line);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.drag.is_some() {
                    self.split.drag_to(self.main_area, mouse.row);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag.take().is_some() {
                    self.remember_split();
                }
            }
            MouseEventKind::ScrollDown => self.scroll_by(SCROLL_STEP as isize),
            MouseEventKind::ScrollUp => self.scroll_by(-(SCROLL_STEP as isize)),
            _ => {}
        }
    }

    fn click_line(&mut self, line: usize) {
        match self.session.select_line(line) {
            Ok(_) => {
                self.on_selection_changed();
                self.request_annotation();
            }
            Err(err) => {
                tracing::trace!(error = %err, "click outside a definition");
            }
        }
    }

    fn step_selection(&mut self, delta: isize) {
        let count = self.session.spans().len();
        if count == 0 {
            return;
        }
        let next = match self.session.selected_index() {
            Some(index) => index.saturating_add_signed(delta).min(count - 1),
            None if delta < 0 => count - 1,
            None => 0,
        };
        if self.session.select_index(next).is_some() {
            self.on_selection_changed();
        }
    }

    fn on_selection_changed(&mut self) {
        let Some(span) = self.session.selected().cloned() else {
            self.panel.clear();
            self.rebuild_view();
            return;
        };
        self.panel.show_span(&span);
        if let Some(text) = self.session.coordinator().get(&span) {
            self.panel.set_annotation(PanelText::Ready(text));
        }
        self.ensure_visible(span.line_start);
        self.rebuild_view();
    }

    fn request_annotation(&mut self) {
        let request = match self.session.annotation_request() {
            Ok(request) => request,
            Err(err) => {
                self.report_request_error(err);
                return;
            }
        };
        if let Some(text) = self.session.coordinator().get(&request.span) {
            self.panel.set_annotation(PanelText::Ready(text));
            return;
        }

        self.panel.set_annotation(PanelText::Loading);
        let coordinator = self.session.coordinator().clone();
        let tx = self.outcomes_tx.clone();
        self.runtime.spawn(async move {
            let result = coordinator.resolve(&request.span, &request.file_id).await;
            let _ = tx.send(TaskOutcome::Annotation { request, result });
        });
    }

    fn request_detail(&mut self) {
        let request = match self.session.annotation_request() {
            Ok(request) => request,
            Err(err) => {
                self.report_request_error(err);
                return;
            }
        };
        let Some(current) = self.panel.annotation().ready_text().map(ToString::to_string) else {
            self.set_status(StatusLevel::Info, "Annotate the definition first");
            return;
        };

        self.panel.set_detail(PanelText::Loading);
        let coordinator = self.session.coordinator().clone();
        let tx = self.outcomes_tx.clone();
        self.runtime.spawn(async move {
            let result = coordinator
                .say_more(&request.span, &request.file_id, &current)
                .await;
            let _ = tx.send(TaskOutcome::Detail { request, result });
        });
    }

    fn upload(&mut self) {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        let text = self.session.text().to_string();
        let service = self.session.coordinator().service();
        let tx = self.outcomes_tx.clone();
        self.set_status(StatusLevel::Info, format!("Uploading {name}…"));
        self.runtime.spawn(async move {
            let result = service.upload_file(&name, &text).await;
            let _ = tx.send(TaskOutcome::Upload { result });
        });
    }

    fn report_request_error(&mut self, err: DomainError) {
        match err {
            DomainError::NoFileLoaded => {
                self.set_status(StatusLevel::Error, "Upload the file first (press u)")
            }
            other => self.set_status(StatusLevel::Info, other.to_string()),
        }
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Annotation { request, result } => {
                if !self.session.is_current(&request) {
                    tracing::debug!(name = %request.span.name, "annotation arrived for a stale selection");
                    return;
                }
                match result {
                    Ok(resolution) => {
                        if let Some(text) = resolution.into_text() {
                            self.panel.set_annotation(PanelText::Ready(text));
                        }
                    }
                    Err(err) => {
                        self.panel.set_annotation(PanelText::Failed(err.to_string()));
                        self.set_status(StatusLevel::Error, format!("Annotation failed: {err}"));
                    }
                }
            }
            TaskOutcome::Detail { request, result } => {
                if !self.session.is_current(&request) {
                    tracing::debug!(name = %request.span.name, "detail arrived for a stale selection");
                    return;
                }
                match result {
                    Ok(resolution) => {
                        if let Some(text) = resolution.into_text() {
                            self.panel.set_detail(PanelText::Ready(text));
                        }
                    }
                    Err(err) => {
                        self.panel.set_detail(PanelText::Failed(err.to_string()));
                        self.set_status(StatusLevel::Error, format!("Detail request failed: {err}"));
                    }
                }
            }
            TaskOutcome::Upload { result } => match result {
                Ok(record) => {
                    let text = self.session.text().to_string();
                    self.session.load_file(record.id.clone(), text);
                    self.history.remember_upload(&self.path, record.id.clone());
                    self.panel.clear();
                    self.rebuild_view();
                    self.save_history();
                    self.set_status(
                        StatusLevel::Success,
                        format!("Uploaded {} as {}", record.name, record.id),
                    );
                }
                Err(err) => {
                    self.set_status(StatusLevel::Error, format!("Upload failed: {err}"));
                }
            },
        }
    }

    fn reload(&mut self, message: &str) {
        let text = match read_source(&self.path) {
            Ok(text) => text,
            Err(err) => {
                self.set_status(StatusLevel::Error, format!("{err:#}"));
                return;
            }
        };
        if self.session.set_text(text) {
            self.panel.clear();
        }
        self.rebuild_view();
        self.scroll = self.scroll.min(self.view.lines.len().saturating_sub(1));
        self.set_status(StatusLevel::Info, message.to_string());
    }

    fn rebuild_view(&mut self) {
        self.view = self.view_service.build(ViewRequest {
            text: self.session.text(),
            registry: self.session.registry(),
            selection: self.session.selection(),
            language: self.session.language(),
            path: Some(&self.path),
            theme: &self.config.display.theme,
        });
    }

    fn page_height(&self) -> usize {
        usize::from(self.code_area.height.saturating_sub(2)).max(1)
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.view.lines.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    fn ensure_visible(&mut self, line: usize) {
        let index = line.saturating_sub(1);
        let height = self.page_height();
        if index < self.scroll {
            self.scroll = index;
        } else if index >= self.scroll + height {
            self.scroll = index + 1 - height;
        }
    }

    fn remember_split(&mut self) {
        self.history.split_percent = Some(self.split.top_percent());
        self.save_history();
    }

    fn save_history(&mut self) {
        if let Err(err) = self.history_store.save(&self.history) {
            tracing::warn!(error = %err, "failed to save browser history");
            self.set_status(StatusLevel::Error, format!("{err:#}"));
        }
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, message: S) {
        self.status = Some(StatusMessage::new(level, message.into()));
    }
}

fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusLevel {
    Info,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossterm::event::KeyEventKind;
    use crossterm::event::KeyEventState;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    use crate::app::service::fake::FakeService;

    const SOURCE: &str = "def greet(name):\n    return name\n\n\ndef shout(name):\n    return name.upper()\n";

    fn app_with(service: FakeService, file_id: Option<&str>) -> (TempDir, BrowserApp) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.py");
        fs::write(&path, SOURCE).unwrap();
        let options = BrowserOptions {
            path,
            file_id: file_id.map(ToString::to_string),
            language: LanguageHint::Python,
            state_root: dir.path().to_path_buf(),
            watch: false,
        };
        let app = BrowserApp::new(Config::default(), options, Arc::new(service)).unwrap();
        (dir, app)
    }

    fn press(app: &mut BrowserApp, code: KeyCode) {
        let key = KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        app.handle_event(Event::Key(key)).unwrap();
    }

    fn mouse(app: &mut BrowserApp, kind: MouseEventKind, row: u16) {
        let event = MouseEvent {
            kind,
            column: 10,
            row,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_event(Event::Mouse(event)).unwrap();
    }

    fn draw(app: &mut BrowserApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 23)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn settle(app: &mut BrowserApp) {
        let outcome = app
            .outcomes_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("background task finished");
        app.apply_outcome(outcome);
    }

    #[test]
    fn renders_code_and_placeholder() {
        let (_dir, mut app) = app_with(FakeService::default(), Some("f1"));
        let screen = draw(&mut app);
        assert!(screen.contains("2 definitions"));
        assert!(screen.contains("file f1"));
        assert!(screen.contains("def greet(name):"));
        assert!(screen.contains("Click a definition"));
    }

    #[test]
    fn keyboard_moves_between_spans() {
        let (_dir, mut app) = app_with(FakeService::default(), Some("f1"));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.session.selected().map(|span| span.name.as_str()), Some("greet"));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.session.selected().map(|span| span.name.as_str()), Some("shout"));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.panel.span().map(|span| span.name.as_str()), Some("greet"));
    }

    #[test]
    fn enter_resolves_annotation_in_background() {
        let service = FakeService::with_listed("f1", &[("greet", "Returns the name.")]);
        let (_dir, mut app) = app_with(service, Some("f1"));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.panel.annotation(), &PanelText::Loading);

        settle(&mut app);
        assert_eq!(
            app.panel.annotation(),
            &PanelText::Ready("Returns the name.".into())
        );
        assert!(draw(&mut app).contains("Returns the name."));
    }

    #[test]
    fn say_more_fills_detail() {
        let service = FakeService::with_listed("f1", &[("greet", "Returns the name.")]);
        let (_dir, mut app) = app_with(service, Some("f1"));
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.panel.detail(), &PanelText::Empty);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        settle(&mut app);
        press(&mut app, KeyCode::Char('m'));
        settle(&mut app);
        let detail = app.panel.detail().ready_text().unwrap().to_string();
        assert!(detail.starts_with("[f1] explains"));
    }

    #[test]
    fn results_for_previous_selection_are_dropped() {
        let service = FakeService::with_listed("f1", &[("greet", "Returns the name.")]);
        let (_dir, mut app) = app_with(service, Some("f1"));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Down);

        settle(&mut app);
        assert_eq!(app.panel.span().map(|span| span.name.as_str()), Some("shout"));
        assert_eq!(app.panel.annotation(), &PanelText::Empty);
    }

    #[test]
    fn annotating_requires_an_upload() {
        let (_dir, mut app) = app_with(FakeService::default(), None);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.panel.annotation(), &PanelText::Empty);
        assert!(draw(&mut app).contains("Upload the file first"));
    }

    #[test]
    fn upload_loads_file_and_remembers_id() {
        let (dir, mut app) = app_with(FakeService::default(), None);
        press(&mut app, KeyCode::Char('u'));
        settle(&mut app);

        assert_eq!(app.session.file_id(), Some("file-0"));
        let history = HistoryStore::new(dir.path()).load().unwrap().unwrap();
        assert_eq!(history.file_id_for(&dir.path().join("demo.py")), Some("file-0"));
    }

    #[test]
    fn clicking_a_definition_line_selects_it() {
        let service = FakeService::with_listed("f1", &[("shout", "Upper-cases the name.")]);
        let (_dir, mut app) = app_with(service, Some("f1"));
        draw(&mut app);

        // Row 0 is the border; line 5 sits on row 5.
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5);
        assert_eq!(app.session.selected().map(|span| span.name.as_str()), Some("shout"));
        settle(&mut app);
        assert!(app.panel.annotation().is_ready());

        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 3);
        assert_eq!(app.session.selected().map(|span| span.name.as_str()), Some("shout"));
    }

    #[test]
    fn dragging_divider_resizes_and_releases() {
        let (dir, mut app) = app_with(FakeService::default(), Some("f1"));
        draw(&mut app);
        let (_, panel) = app.split.areas(app.main_area);

        let middle = app.main_area.height / 2;

        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), panel.y);
        assert!(app.split.is_dragging());
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), middle);
        assert_eq!(app.split.top_percent(), 50);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), middle);
        assert!(!app.split.is_dragging());

        let history = HistoryStore::new(dir.path()).load().unwrap().unwrap();
        assert_eq!(history.split_percent, Some(50));
    }

    #[test]
    fn losing_focus_ends_drag() {
        let (_dir, mut app) = app_with(FakeService::default(), Some("f1"));
        draw(&mut app);
        let (_, panel) = app.split.areas(app.main_area);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), panel.y);
        app.handle_event(Event::FocusLost).unwrap();
        assert!(!app.split.is_dragging());
    }

    #[test]
    fn reload_picks_up_new_definitions() {
        let (dir, mut app) = app_with(FakeService::default(), Some("f1"));
        press(&mut app, KeyCode::Down);
        fs::write(dir.path().join("demo.py"), "def other():\n    pass\n").unwrap();
        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.session.spans().len(), 1);
        assert!(app.session.selected().is_none());
        assert!(app.panel.span().is_none());
    }
}
