use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;
use log::{debug, info, warn};
use thiserror::Error;

use crate::api::ReviewBackend;
use crate::config::Config;
use crate::dispatch::{BackendEvent, BackendRequest, Executor};
use crate::review::classify::{ItemStatus, UiReviewItem};
use crate::review::clock::ReviewClock;
use crate::review::history::{HistoryBrowser, HistoryMode};
use crate::review::progress::Progress;
use crate::review::queue::{LoadState, QueueKind, ReviewQueues};
use crate::session::completion::{
    Acknowledgement, CompletionError, CompletionProtocol, Submission, Ticket,
};
use crate::session::flashcard::{CardState, StageError};
use crate::session::navigation::{KeyContext, NavAction, Navigator};
use crate::ui::line_input::{InputResult, LineInput};
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Overview,
    Session,
    History,
}

/// Which queue a flashcard session walks through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionScope {
    Today,
    Overdue,
}

impl SessionScope {
    pub fn kind(self) -> QueueKind {
        match self {
            SessionScope::Today => QueueKind::Today,
            SessionScope::Overdue => QueueKind::Overdue,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("no item is focused")]
    NoItem,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub ack: Acknowledgement,
    pub shown_at: Instant,
}

pub struct App {
    pub screen: AppScreen,
    pub config: Config,
    pub theme: &'static Theme,
    pub queues: ReviewQueues,
    pub scope: SessionScope,
    pub navigator: Navigator,
    pub card: CardState,
    pub protocol: CompletionProtocol,
    pub history: HistoryBrowser,
    pub overview_section: QueueKind,
    pub overview_selected: usize,
    pub goto_input: Option<LineInput>,
    pub toast: Option<Toast>,
    pub hint: Option<String>,
    pub should_quit: bool,
    backend: Arc<dyn ReviewBackend>,
    executor: Executor,
    fixed_clock: Option<ReviewClock>,
    config_path: Option<PathBuf>,
    command_source: Option<QueueKind>,
    awaited_refresh: Option<(QueueKind, u64)>,
    history_stale: bool,
}

impl App {
    pub fn new(config: Config, backend: Arc<dyn ReviewBackend>, executor: Executor) -> Self {
        let loaded_theme = Theme::load(&config.theme).unwrap_or_else(|| {
            warn!(
                "theme {:?} not found, bundled themes: {}",
                config.theme,
                Theme::available_themes().join(", ")
            );
            Theme::default()
        });
        let theme: &'static Theme = Box::leak(Box::new(loaded_theme));
        let history = HistoryBrowser::new(config.history_mode, config.history_page_size);
        Self {
            screen: AppScreen::Overview,
            config,
            theme,
            queues: ReviewQueues::default(),
            scope: SessionScope::Today,
            navigator: Navigator::default(),
            card: CardState::default(),
            protocol: CompletionProtocol::default(),
            history,
            overview_section: QueueKind::Today,
            overview_selected: 0,
            goto_input: None,
            toast: None,
            hint: None,
            should_quit: false,
            backend,
            executor,
            fixed_clock: None,
            config_path: None,
            command_source: None,
            awaited_refresh: None,
            history_stale: false,
        }
    }

    /// Pins "now" so day buckets and statuses are reproducible.
    pub fn with_clock(mut self, clock: ReviewClock) -> Self {
        self.fixed_clock = Some(clock);
        self
    }

    /// Where mode changes are persisted. Unset means nothing is written.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn clock(&self) -> ReviewClock {
        self.fixed_clock.unwrap_or_else(ReviewClock::local)
    }

    fn submit(&mut self, request: BackendRequest) {
        self.executor.submit(&self.backend, request);
    }

    pub fn start(&mut self) {
        info!("loading review queues");
        self.refresh_queues();
    }

    pub fn refresh_queues(&mut self) {
        for kind in QueueKind::ALL {
            self.refresh_section(kind);
        }
    }

    /// Returns the generation the response has to carry to be applied.
    pub fn refresh_section(&mut self, kind: QueueKind) -> u64 {
        let generation = self.queues.mark_loading(kind);
        let request = match kind {
            QueueKind::Today => BackendRequest::Today { generation },
            QueueKind::Overdue => BackendRequest::Overdue { generation },
            QueueKind::Completed => BackendRequest::Completed {
                size: self.config.history_page_size,
                generation,
            },
        };
        self.submit(request);
        generation
    }

    /// Delivers every result the inline executor has parked.
    pub fn pump(&mut self) {
        while let Some(event) = self.executor.take_ready() {
            self.handle_backend(event);
        }
    }

    pub fn handle_backend(&mut self, event: BackendEvent) {
        let focused = self.focused_item().map(|i| i.id);
        match event {
            BackendEvent::Today { generation, result } => {
                if self.queues.is_current(QueueKind::Today, generation) {
                    self.queues.apply_today(result);
                    self.after_queue_refresh(QueueKind::Today, generation, focused);
                }
            }
            BackendEvent::Overdue { generation, result } => {
                if self.queues.is_current(QueueKind::Overdue, generation) {
                    self.queues.apply_overdue(result);
                    self.after_queue_refresh(QueueKind::Overdue, generation, focused);
                }
            }
            BackendEvent::Completed { generation, result } => {
                if self.queues.is_current(QueueKind::Completed, generation) {
                    self.queues.apply_completed(result);
                    self.after_queue_refresh(QueueKind::Completed, generation, focused);
                }
            }
            BackendEvent::History { mode, page, result } => {
                let clock = self.clock();
                self.history.apply(mode, page, result, &clock);
                self.continue_history_load();
            }
            BackendEvent::Command { ticket, result } => self.settle_command(&ticket, result),
        }
    }

    fn after_queue_refresh(&mut self, kind: QueueKind, generation: u64, focused_before: Option<i64>) {
        // Only the refresh issued after the command settled reopens the guard.
        if self
            .awaited_refresh
            .is_some_and(|(awaited, min)| awaited == kind && generation >= min)
            && *self.protocol.state() == Submission::Refreshing
        {
            self.protocol.refreshed();
            self.awaited_refresh = None;
        }
        if kind == self.scope.kind() {
            // Postponed or completed overdue items leave the list, so the
            // same slot may now hold a different item.
            let count = self.session_items().len();
            let moved = self.navigator.set_item_count(count);
            if moved || self.focused_item().map(|i| i.id) != focused_before {
                self.card.reset();
            }
        }
        if kind == self.overview_section {
            self.clamp_overview_selection();
        }
    }

    fn settle_command(&mut self, ticket: &Ticket, result: crate::api::BackendResult<()>) {
        let ack = match self.protocol.finish(ticket, result) {
            Ok(ack) => ack,
            Err(err) => {
                debug!("ignoring command result: {err}");
                return;
            }
        };
        if let Acknowledgement::Failed(_) = ack {
            self.command_source = None;
        } else {
            self.history_stale = true;
            if self.screen == AppScreen::Session
                && self.scope == SessionScope::Today
                && ack == Acknowledgement::ItemReviewed
                && self.focused_item().map(|i| i.id) == Some(ticket.item_id)
                && self.navigator.scroll_next()
            {
                self.card.reset();
            }
            self.refresh_queues();
            self.awaited_refresh = self
                .command_source
                .take()
                .map(|kind| (kind, self.queues.section(kind).generation()));
        }
        self.show_toast(ack);
    }

    pub fn show_toast(&mut self, ack: Acknowledgement) {
        self.toast = Some(Toast {
            ack,
            shown_at: Instant::now(),
        });
    }

    pub fn tick(&mut self) {
        let ttl = Duration::from_secs(self.config.toast_secs);
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.shown_at.elapsed() >= ttl)
        {
            self.toast = None;
        }
    }

    // --- session ---

    pub fn session_items(&self) -> &[UiReviewItem] {
        &self.queues.section(self.scope.kind()).items
    }

    pub fn focused_item(&self) -> Option<&UiReviewItem> {
        self.navigator
            .focused_item()
            .and_then(|i| self.session_items().get(i))
    }

    pub fn session_progress(&self) -> Progress {
        Progress::compute(self.session_items(), &self.clock())
    }

    pub fn start_session(&mut self, scope: SessionScope) {
        self.scope = scope;
        self.navigator = Navigator::new(self.session_items().len());
        self.card.reset();
        self.goto_input = None;
        self.hint = None;
        self.screen = AppScreen::Session;
        info!("session started over {} items", self.navigator.item_count());
    }

    pub fn leave_session(&mut self) {
        self.goto_input = None;
        self.screen = AppScreen::Overview;
    }

    fn focused_completed(&self) -> bool {
        let now = self.clock().now;
        self.focused_item()
            .is_some_and(|item| item.status(now) == ItemStatus::Completed)
    }

    pub fn key_context(&self) -> KeyContext {
        KeyContext {
            on_item: self.focused_item().is_some(),
            stage: self.card.stage,
            has_assessment: self.card.assessment.is_some(),
            item_completed: self.focused_completed(),
            submitting: !self.protocol.is_idle(),
            text_input: self.goto_input.is_some(),
        }
    }

    pub fn apply_nav(&mut self, action: NavAction) {
        self.hint = None;
        let completed = self.focused_completed();
        let outcome: Result<(), ActionError> = match action {
            NavAction::Prev => {
                if self.navigator.scroll_prev() {
                    self.card.reset();
                }
                Ok(())
            }
            NavAction::Next => {
                if self.navigator.scroll_next() {
                    self.card.reset();
                }
                Ok(())
            }
            NavAction::ScrollUp => {
                self.navigator.scroll_content_up();
                Ok(())
            }
            NavAction::ScrollDown => {
                let max = self
                    .focused_item()
                    .map(|item| item.content.lines().count().saturating_sub(1) as u16)
                    .unwrap_or(0);
                self.navigator.scroll_content_down(max);
                Ok(())
            }
            NavAction::Reveal => self.card.reveal(completed).map_err(ActionError::from),
            NavAction::Select(assessment) => self
                .card
                .select(assessment, completed)
                .map_err(ActionError::from),
            NavAction::Complete => self.complete_focused(),
        };
        if let Err(err) = outcome {
            debug!("{action:?} rejected: {err}");
            self.hint = Some(err.to_string());
        }
    }

    pub fn complete_focused(&mut self) -> Result<(), ActionError> {
        let item_id = self.focused_item().map(|i| i.id).ok_or(ActionError::NoItem)?;
        let assessment = self.card.ready(self.focused_completed())?;
        let now = self.clock().now;
        let kind = self.scope.kind();
        let ticket = self.protocol.begin_complete(
            &self.queues.section(kind).items,
            item_id,
            Some(assessment),
            now,
        )?;
        self.issue(ticket, kind);
        Ok(())
    }

    pub fn postpone_focused(&mut self) -> Result<(), ActionError> {
        let item_id = self.focused_item().map(|i| i.id).ok_or(ActionError::NoItem)?;
        self.postpone(self.scope.kind(), item_id)
    }

    fn postpone(&mut self, kind: QueueKind, item_id: i64) -> Result<(), ActionError> {
        let now = self.clock().now;
        let ticket = self
            .protocol
            .begin_postpone(&self.queues.section(kind).items, item_id, now)?;
        self.issue(ticket, kind);
        Ok(())
    }

    fn issue(&mut self, ticket: Ticket, source: QueueKind) {
        info!(
            "submitting {:?} for item {} (last: {})",
            ticket.command, ticket.item_id, ticket.is_last_item
        );
        self.command_source = Some(source);
        self.submit(BackendRequest::Command(ticket));
    }

    pub fn open_goto(&mut self) {
        if self.screen == AppScreen::Session {
            self.goto_input = Some(LineInput::default());
        }
    }

    /// Card numbers are 1-based over the items; 0 is the start card.
    pub fn handle_goto_key(&mut self, key: KeyEvent) {
        let Some(input) = self.goto_input.as_mut() else {
            return;
        };
        match input.handle(key) {
            InputResult::Continue => {}
            InputResult::Cancel => self.goto_input = None,
            InputResult::Submit => {
                let target = input.number();
                self.goto_input = None;
                if let Some(n) = target
                    && self.navigator.scroll_to(n)
                {
                    self.card.reset();
                }
            }
        }
    }

    // --- overview ---

    pub fn overview_items(&self) -> &[UiReviewItem] {
        &self.queues.section(self.overview_section).items
    }

    pub fn overview_next_section(&mut self) {
        let pos = QueueKind::ALL
            .iter()
            .position(|&k| k == self.overview_section)
            .unwrap_or(0);
        self.overview_section = QueueKind::ALL[(pos + 1) % QueueKind::ALL.len()];
        self.overview_selected = 0;
    }

    pub fn overview_move(&mut self, delta: isize) {
        self.overview_selected = self.overview_selected.saturating_add_signed(delta);
        self.clamp_overview_selection();
    }

    fn clamp_overview_selection(&mut self) {
        let len = self.overview_items().len();
        self.overview_selected = self.overview_selected.min(len.saturating_sub(1));
    }

    /// Marks the selected list row reviewed without a self-assessment.
    pub fn complete_selected(&mut self) -> Result<(), ActionError> {
        let kind = self.overview_section;
        if kind == QueueKind::Completed {
            return Err(ActionError::NoItem);
        }
        let item_id = self
            .overview_items()
            .get(self.overview_selected)
            .map(|i| i.id)
            .ok_or(ActionError::NoItem)?;
        let now = self.clock().now;
        let ticket =
            self.protocol
                .begin_complete(&self.queues.section(kind).items, item_id, None, now)?;
        self.issue(ticket, kind);
        Ok(())
    }

    pub fn postpone_selected(&mut self) -> Result<(), ActionError> {
        let item_id = self
            .overview_items()
            .get(self.overview_selected)
            .map(|i| i.id)
            .ok_or(ActionError::NoItem)?;
        self.postpone(self.overview_section, item_id)
    }

    pub fn report(&mut self, outcome: Result<(), ActionError>) {
        self.hint = outcome.err().map(|err| {
            debug!("action rejected: {err}");
            err.to_string()
        });
    }

    // --- history ---

    pub fn open_history(&mut self) {
        self.screen = AppScreen::History;
        if self.history_stale || self.history.items().is_empty() {
            self.history_stale = false;
            let mode = self.history.mode;
            let page = self.history.set_mode(mode);
            self.request_history(page);
        }
    }

    fn request_history(&mut self, page: Option<u32>) {
        if let Some(page) = page {
            let request = BackendRequest::History {
                mode: self.history.mode,
                page,
                size: self.history.page_size(),
            };
            self.submit(request);
        }
    }

    pub fn history_next_page(&mut self) {
        if self.history.mode == HistoryMode::Paged {
            let page = self.history.paged.next_page();
            self.request_history(page);
        }
    }

    pub fn history_prev_page(&mut self) {
        if self.history.mode == HistoryMode::Paged {
            let page = self.history.paged.prev_page();
            self.request_history(page);
        }
    }

    pub fn history_move(&mut self, delta: isize) {
        let clock = self.clock();
        self.history.move_selection(delta, &clock);
        self.continue_history_load();
    }

    /// Infinite mode keeps fetching while the cursor sits within the
    /// prefetch rows of the loaded end, so short or filtered-out pages do
    /// not stall. A failed page waits for an explicit retry.
    fn continue_history_load(&mut self) {
        if matches!(self.history.state(), LoadState::Failed(_)) {
            return;
        }
        let clock = self.clock();
        let page = self
            .history
            .load_more(self.config.history_prefetch_rows, &clock);
        self.request_history(page);
    }

    pub fn history_toggle(&mut self) {
        let clock = self.clock();
        self.history.toggle_selected(&clock);
    }

    pub fn history_cycle_filter(&mut self) {
        let clock = self.clock();
        self.history.cycle_filter(&clock);
        self.continue_history_load();
    }

    pub fn history_toggle_mode(&mut self) {
        let mode = self.history.mode.toggle();
        let page = self.history.set_mode(mode);
        self.request_history(page);
        self.config.history_mode = mode;
        if let Some(path) = &self.config_path
            && let Err(err) = self.config.save_to(path)
        {
            warn!("could not save history mode: {err}");
        }
    }

    pub fn history_retry(&mut self) {
        let page = match self.history.mode {
            HistoryMode::Paged => self.history.paged.request(self.history.paged.page),
            HistoryMode::Infinite => self.history.infinite.request_next(),
        };
        self.request_history(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use crate::api::memory::Endpoint;
    use crate::review::model::{
        Assessment, ItemType, OverdueEntry, ResponseCode, ReviewItem, ReviewSession,
    };
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn clock() -> ReviewClock {
        ReviewClock::utc(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())
    }

    fn app_with(backend: MemoryBackend) -> (App, Arc<MemoryBackend>) {
        let backend = Arc::new(backend.with_fixed_now(clock().now));
        let dyn_backend: Arc<dyn ReviewBackend> = backend.clone();
        let mut app = App::new(Config::default(), dyn_backend, Executor::inline()).with_clock(clock());
        app.start();
        app.pump();
        (app, backend)
    }

    fn today(ids: &[i64]) -> Vec<ReviewSession> {
        vec![ReviewSession {
            id: 1,
            planned_time: clock().now + ChronoDuration::hours(3),
            completed_time: None,
            items: ids
                .iter()
                .map(|&id| ReviewItem::new(id, 1, ItemType::Note, id))
                .collect(),
        }]
    }

    #[test]
    fn test_start_loads_all_sections() {
        let (app, backend) = app_with(MemoryBackend::new(today(&[1, 2]), Vec::new(), Vec::new()));
        assert_eq!(app.queues.today.items.len(), 2);
        let calls = backend.calls();
        assert_eq!((calls.today, calls.overdue, calls.history), (1, 1, 1));
    }

    #[test]
    fn test_focus_change_resets_card() {
        let (mut app, _) = app_with(MemoryBackend::new(today(&[1, 2]), Vec::new(), Vec::new()));
        app.start_session(SessionScope::Today);
        app.apply_nav(NavAction::Next);
        app.apply_nav(NavAction::Reveal);
        app.apply_nav(NavAction::Select(Assessment::Hard));
        assert!(app.card.assessment.is_some());
        app.apply_nav(NavAction::Next);
        assert_eq!(app.card, CardState::default());
    }

    #[test]
    fn test_complete_without_assessment_is_rejected_locally() {
        let (mut app, backend) = app_with(MemoryBackend::new(today(&[1]), Vec::new(), Vec::new()));
        app.start_session(SessionScope::Today);
        app.apply_nav(NavAction::Next);
        app.apply_nav(NavAction::Reveal);
        assert_eq!(
            app.complete_focused(),
            Err(ActionError::Stage(StageError::NoAssessment))
        );
        assert!(backend.calls().complete.is_empty());
    }

    #[test]
    fn test_late_refresh_from_before_completion_is_dropped() {
        let (mut app, backend) = app_with(MemoryBackend::new(today(&[1, 2]), Vec::new(), Vec::new()));
        app.start_session(SessionScope::Today);
        app.apply_nav(NavAction::Next);

        // A refresh goes out before the completion and answers last.
        app.refresh_section(QueueKind::Today);
        let late = app.executor.take_ready().unwrap();
        assert!(matches!(late, BackendEvent::Today { .. }));

        app.apply_nav(NavAction::Reveal);
        app.apply_nav(NavAction::Select(Assessment::Easy));
        app.complete_focused().unwrap();
        let settled = app.executor.take_ready().unwrap();
        app.handle_backend(settled);
        assert_eq!(*app.protocol.state(), Submission::Refreshing);

        app.handle_backend(late);
        assert_eq!(*app.protocol.state(), Submission::Refreshing);
        assert_eq!(
            app.queues.today.items[0].status(clock().now),
            ItemStatus::Pending
        );

        app.pump();
        assert!(app.protocol.is_idle());
        assert_eq!(
            app.queues.today.items[0].status(clock().now),
            ItemStatus::Completed
        );
        assert!(app.complete_selected().is_err());
        assert_eq!(backend.calls().complete, vec![(1, 1, ResponseCode::Easy)]);
    }

    #[test]
    fn test_failed_refresh_after_completion_reopens_guard() {
        let (mut app, backend) = app_with(MemoryBackend::new(today(&[1, 2]), Vec::new(), Vec::new()));
        app.start_session(SessionScope::Today);
        app.apply_nav(NavAction::Next);
        backend.fail(Endpoint::Today, 1);
        app.apply_nav(NavAction::Reveal);
        app.apply_nav(NavAction::Select(Assessment::Hard));
        app.complete_focused().unwrap();
        app.pump();
        assert!(app.queues.today.error().is_some());
        assert!(app.protocol.is_idle());
    }

    #[test]
    fn test_goto_input_jumps_to_card() {
        let (mut app, _) = app_with(MemoryBackend::new(today(&[1, 2, 3]), Vec::new(), Vec::new()));
        app.start_session(SessionScope::Today);
        app.open_goto();
        assert!(app.key_context().text_input);
        app.handle_goto_key(KeyEvent::from(crossterm::event::KeyCode::Char('3')));
        app.handle_goto_key(KeyEvent::from(crossterm::event::KeyCode::Enter));
        assert!(app.goto_input.is_none());
        assert_eq!(app.focused_item().map(|i| i.id), Some(3));
    }

    #[test]
    fn test_overview_postpone_removes_overdue_row() {
        let entry = OverdueEntry {
            planned_time: clock().now - ChronoDuration::days(2),
            postpone_count: 1,
            item: ReviewItem::new(40, 4, ItemType::Quote, 9),
        };
        let (mut app, backend) = app_with(MemoryBackend::new(Vec::new(), vec![entry], Vec::new()));
        app.overview_next_section();
        assert_eq!(app.overview_section, QueueKind::Overdue);
        app.postpone_selected().unwrap();
        app.pump();
        assert_eq!(backend.calls().postpone, vec![40]);
        assert!(app.queues.overdue.items.is_empty());
        assert!(app.protocol.is_idle());
        assert_eq!(
            app.toast.as_ref().map(|t| t.ack.clone()),
            Some(Acknowledgement::Postponed)
        );
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default() {
        let config = Config {
            theme: "no-such-theme".to_string(),
            ..Config::default()
        };
        let app = App::new(config, Arc::new(MemoryBackend::default()), Executor::inline());
        assert_eq!(app.theme.name, Theme::default().name);
    }

    #[test]
    fn test_toast_expires_on_tick() {
        let (mut app, _) = app_with(MemoryBackend::default());
        app.config.toast_secs = 0;
        app.show_toast(Acknowledgement::ItemReviewed);
        app.tick();
        assert!(app.toast.is_none());
    }
}
