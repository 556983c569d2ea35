use std::collections::HashSet;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Datelike;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Padding, Paragraph, Tabs, Wrap,
};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use tracing::{info, warn};

use crate::board::{self, AppState, BoardEvent, DisplayPost, LoadState, Post, SortOrder};
use crate::data::BoardService;
use crate::pages::{self, FormLinks, Route};
use crate::sheet::FetchError;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const DETAIL_INDENT: &str = "    ";

#[derive(Clone)]
pub struct Options {
    pub service: Arc<dyn BoardService>,
    pub default_sort: SortOrder,
    pub links: FormLinks,
    pub initial_route: Route,
}

enum AsyncResponse {
    Posts {
        request_id: u64,
        result: Result<Vec<Post>>,
    },
}

struct Spinner {
    index: usize,
}

impl Spinner {
    fn new() -> Self {
        Self { index: 0 }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % SPINNER_FRAMES.len();
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

pub struct Model {
    state: AppState,
    route: Route,
    links: FormLinks,
    service: Arc<dyn BoardService>,
    /// Selected post by origin index, so it survives a re-sort.
    selected: Option<usize>,
    expanded: HashSet<usize>,
    page_scroll: u16,
    status_message: String,
    needs_redraw: bool,
    spinner: Spinner,
    year: i32,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_request: Option<u64>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let mut model = Self {
            state: AppState::new(opts.default_sort),
            route: opts.initial_route,
            links: opts.links,
            service: opts.service,
            selected: None,
            expanded: HashSet::new(),
            page_scroll: 0,
            status_message: String::new(),
            needs_redraw: true,
            spinner: Spinner::new(),
            year: chrono::Local::now().year(),
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_request: None,
        };
        model.reload_posts();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("enable raw mode")?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {err}");
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    self.spinner.advance();
                    self.mark_dirty();
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.pending_request.is_some()
    }

    /// Starts a background fetch. A newer request supersedes any pending one.
    fn reload_posts(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_request = Some(request_id);
        board::update(&mut self.state, BoardEvent::FetchStarted);
        self.status_message = format!("Loading posts from {}…", self.service.describe());
        self.spinner.reset();
        info!(request_id, "reloading posts");

        let tx = self.response_tx.clone();
        let service = self.service.clone();
        thread::spawn(move || {
            let result = service.load_posts();
            let _ = tx.send(AsyncResponse::Posts { request_id, result });
        });
        self.mark_dirty();
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Posts { request_id, result } => {
                if self.pending_request != Some(request_id) {
                    return;
                }
                self.pending_request = None;
                match result {
                    Ok(posts) => {
                        let count = posts.len();
                        board::update(&mut self.state, BoardEvent::PostsLoaded(posts));
                        self.expanded.clear();
                        self.selected = self
                            .state
                            .view()
                            .first()
                            .map(|entry| entry.post.origin_index);
                        self.status_message = format!("Loaded {}.", pages::count_label(count));
                    }
                    Err(err) => {
                        let reason = format!("{err:#}");
                        warn!(error = %reason, "post reload failed");
                        self.status_message = failure_status(&err);
                        board::update(&mut self.state, BoardEvent::FetchFailed(reason));
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab | KeyCode::Char('l') => self.navigate(self.route.next()),
            KeyCode::BackTab | KeyCode::Char('h') => self.navigate(self.route.previous()),
            KeyCode::Char(ch @ '1'..='4') => {
                let index = (ch as usize) - ('1' as usize);
                self.navigate(Route::ALL[index]);
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('c') => {
                self.expanded.clear();
                self.status_message = "Collapsed all posts.".to_string();
            }
            KeyCode::Char('s') => {
                let sort = self.state.sort().toggled();
                board::update(&mut self.state, BoardEvent::SortChanged(sort));
                self.status_message = format!("並び替え: {}", pages::sort_label(sort));
            }
            KeyCode::Char('r') => self.reload_posts(),
            KeyCode::Char('o') => self.open_page_link()?,
            _ => return Ok(false),
        }
        self.mark_dirty();
        Ok(false)
    }

    fn navigate(&mut self, route: Route) {
        if self.route != route {
            self.route = route;
            self.page_scroll = 0;
        }
    }

    fn move_down(&mut self) {
        if self.route == Route::Home {
            self.selected = step_selection(&self.state.view(), self.selected, 1);
        } else {
            self.page_scroll = self.page_scroll.saturating_add(1);
        }
    }

    fn move_up(&mut self) {
        if self.route == Route::Home {
            self.selected = step_selection(&self.state.view(), self.selected, -1);
        } else {
            self.page_scroll = self.page_scroll.saturating_sub(1);
        }
    }

    fn toggle_selected(&mut self) {
        if self.route != Route::Home {
            return;
        }
        let Some(origin) = self.selected else {
            return;
        };
        if !self.expanded.remove(&origin) {
            self.expanded.insert(origin);
        }
    }

    fn open_page_link(&mut self) -> Result<()> {
        let link = pages::content(self.route, &self.links).and_then(|page| page.link);
        let Some(link) = link else {
            self.status_message = "This page has no form link.".to_string();
            return Ok(());
        };
        webbrowser::open(&link.url).with_context(|| format!("open {}", link.url))?;
        self.status_message = format!("Opened {} in your browser.", link.label);
        Ok(())
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.route {
            Route::Home => self.draw_home(frame, chunks[1]),
            route => self.draw_page(frame, chunks[1], route),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_tabs(&self, frame: &mut Frame<'_>, area: Rect) {
        let titles: Vec<Line<'static>> = Route::ALL
            .iter()
            .enumerate()
            .map(|(i, route)| Line::from(format!("{} {}", i + 1, route.label())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.route.index())
            .block(panel_block("被験者募集掲示板", false))
            .style(Style::default().fg(COLOR_TEXT_SECONDARY))
            .highlight_style(
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .divider("│");
        frame.render_widget(tabs, area);
    }

    fn draw_home(&self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(1)])
            .split(area);

        let intro = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                pages::INTRO_TITLE,
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                pages::INTRO_TEXT,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]))
        .wrap(Wrap { trim: true })
        .block(panel_block("", false));
        frame.render_widget(intro, chunks[0]);

        let view = self.state.view();
        let title = format!(
            "{}  ·  並び替え: {} (s)",
            pages::count_label(view.len()),
            pages::sort_label(self.state.sort())
        );
        let block = panel_block(&title, true);

        if view.is_empty() {
            let placeholder = self.empty_home_text();
            frame.render_widget(
                Paragraph::new(placeholder)
                    .wrap(Wrap { trim: true })
                    .block(block),
                chunks[1],
            );
            return;
        }

        let width = block.inner(chunks[1]).width.saturating_sub(2) as usize;
        let items: Vec<ListItem<'static>> = view
            .iter()
            .map(|entry| {
                let expanded = self.expanded.contains(&entry.post.origin_index);
                ListItem::new(Text::from(post_lines(entry, expanded, width)))
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(selected_position(&view, self.selected));

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(COLOR_PANEL_SELECTED_BG))
            .highlight_symbol("▌ ");
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn empty_home_text(&self) -> Text<'static> {
        match self.state.load_state() {
            LoadState::Loading => Text::from(Line::from(Span::styled(
                format!("{} 読み込み中…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))),
            LoadState::Failed { .. } => Text::from(vec![
                Line::from(Span::styled(
                    pages::FETCH_FAILED_TITLE,
                    Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    pages::FETCH_FAILED_HINT,
                    Style::default().fg(COLOR_ERROR),
                )),
            ]),
            LoadState::Ready => Text::from(Line::from(Span::styled(
                pages::EMPTY_BOARD,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))),
        }
    }

    fn draw_page(&self, frame: &mut Frame<'_>, area: Rect, route: Route) {
        let Some(page) = pages::content(route, &self.links) else {
            return;
        };
        let mut lines: Vec<Line<'static>> = Vec::new();
        for section in &page.sections {
            if let Some(heading) = section.heading {
                lines.push(Line::from(Span::styled(
                    heading,
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            for paragraph in &section.paragraphs {
                lines.push(Line::from(Span::styled(
                    *paragraph,
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                )));
            }
            for bullet in &section.bullets {
                lines.push(Line::from(vec![
                    Span::styled("  • ", Style::default().fg(COLOR_ACCENT)),
                    Span::styled(*bullet, Style::default().fg(COLOR_TEXT_PRIMARY)),
                ]));
            }
            lines.push(Line::default());
        }
        if let Some(link) = &page.link {
            lines.push(Line::from(vec![
                Span::styled(
                    link.label,
                    Style::default().fg(COLOR_SUCCESS).add_modifier(Modifier::BOLD),
                ),
                Span::styled("  (o で開く)", Style::default().fg(COLOR_TEXT_SECONDARY)),
            ]));
            lines.push(Line::from(Span::styled(
                link.url.clone(),
                Style::default().fg(COLOR_ACCENT),
            )));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((self.page_scroll, 0))
            .block(panel_block(page.title, true));
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let status_style = match self.state.load_state() {
            LoadState::Failed { .. } => Style::default().fg(COLOR_ERROR),
            _ => Style::default().fg(COLOR_TEXT_PRIMARY),
        };
        let spinner = if self.is_loading() {
            format!("{} ", self.spinner.frame())
        } else {
            String::new()
        };
        let footer = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                format!("{spinner}{}", self.status_message),
                status_style,
            )),
            Line::from(Span::styled(
                format!(
                    "tab/1-4 page · j/k move · enter details · c collapse · s sort · r reload · o open form · q quit   © {}",
                    self.year
                ),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]));
        frame.render_widget(footer, area);
    }
}

fn panel_block(title: &str, focused: bool) -> Block<'static> {
    let border = if focused {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .padding(Padding::horizontal(1))
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ))
}

fn failure_status(err: &anyhow::Error) -> String {
    let reason = match err.downcast_ref::<FetchError>() {
        Some(FetchError::Status(status)) => format!("status {status}"),
        Some(FetchError::Network(_)) => "network error".to_string(),
        Some(FetchError::Body(_)) => "unreadable response".to_string(),
        None => format!("{err:#}"),
    };
    format!(
        "{} ({reason}). {}",
        pages::FETCH_FAILED_TITLE,
        pages::FETCH_FAILED_HINT
    )
}

fn selected_position(view: &[DisplayPost<'_>], selected: Option<usize>) -> Option<usize> {
    let origin = selected?;
    view.iter().position(|entry| entry.post.origin_index == origin)
}

/// Moves the selection `delta` rows through `view`, clamping at either end.
/// Returns the origin index of the newly selected post.
fn step_selection(view: &[DisplayPost<'_>], selected: Option<usize>, delta: i32) -> Option<usize> {
    if view.is_empty() {
        return None;
    }
    let current = selected_position(view, selected).unwrap_or(0) as i64;
    let last = view.len() as i64 - 1;
    let next = (current + i64::from(delta)).clamp(0, last) as usize;
    Some(view[next].post.origin_index)
}

fn post_lines(entry: &DisplayPost<'_>, expanded: bool, width: usize) -> Vec<Line<'static>> {
    let post = entry.post;
    let marker = if expanded { "▾" } else { "▸" };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("#{}", entry.display_number),
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(post.timestamp.clone(), Style::default().fg(COLOR_TEXT_SECONDARY)),
        ]),
        Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(COLOR_TEXT_SECONDARY)),
            Span::styled(
                post.title.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    if expanded {
        let options = WrapOptions::new(width.max(DETAIL_INDENT.len() + 8))
            .initial_indent(DETAIL_INDENT)
            .subsequent_indent(DETAIL_INDENT);
        for paragraph in post.details.lines() {
            if paragraph.trim().is_empty() {
                lines.push(Line::default());
                continue;
            }
            for wrapped in wrap(paragraph, &options) {
                lines.push(Line::from(Span::styled(
                    wrapped.into_owned(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                )));
            }
        }
    }
    lines.push(Line::default());
    lines
}
