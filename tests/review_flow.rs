use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use rereadr::api::ReviewBackend;
use rereadr::api::memory::{Endpoint, MemoryBackend};
use rereadr::app::{ActionError, App, AppScreen, SessionScope};
use rereadr::config::Config;
use rereadr::dispatch::Executor;
use rereadr::review::classify::{ItemStatus, UiReviewItem};
use rereadr::review::clock::ReviewClock;
use rereadr::review::history::{HistoryMode, group_by_date};
use rereadr::review::model::{
    Assessment, ItemType, OverdueEntry, ResponseCode, ReviewItem, ReviewSession,
};
use rereadr::session::completion::{Acknowledgement, CompletionError};
use rereadr::session::flashcard::Stage;
use rereadr::session::navigation::{NavAction, map_key};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

fn clock() -> ReviewClock {
    ReviewClock::utc(now())
}

fn today_session(items: Vec<ReviewItem>) -> Vec<ReviewSession> {
    vec![ReviewSession {
        id: 1,
        planned_time: now() + Duration::hours(3),
        completed_time: None,
        items,
    }]
}

fn launch(backend: MemoryBackend, config: Config) -> (App, Arc<MemoryBackend>) {
    let backend = Arc::new(backend.with_fixed_now(now()));
    let shared: Arc<dyn ReviewBackend> = backend.clone();
    let mut app = App::new(config, shared, Executor::inline()).with_clock(clock());
    app.start();
    app.pump();
    (app, backend)
}

fn toast(app: &App) -> Option<Acknowledgement> {
    app.toast.as_ref().map(|t| t.ack.clone())
}

fn assess_and_complete(app: &mut App, assessment: Assessment) {
    app.apply_nav(NavAction::Reveal);
    app.apply_nav(NavAction::Select(assessment));
    app.apply_nav(NavAction::Complete);
}

#[test]
fn two_item_session_ends_with_celebration() {
    let (mut app, backend) = launch(
        MemoryBackend::new(
            today_session(vec![
                ReviewItem::new(1, 1, ItemType::Note, 11),
                ReviewItem::new(2, 1, ItemType::Quote, 12),
            ]),
            Vec::new(),
            Vec::new(),
        ),
        Config::default(),
    );
    app.start_session(SessionScope::Today);
    assert_eq!(app.focused_item(), None);
    app.apply_nav(NavAction::Next);
    assert_eq!(app.focused_item().map(|i| i.id), Some(1));

    assess_and_complete(&mut app, Assessment::Easy);
    app.pump();
    assert_eq!(toast(&app), Some(Acknowledgement::ItemReviewed));
    assert_eq!(app.queues.today.items[0].status(now()), ItemStatus::Completed);
    assert!(app.protocol.is_idle());

    // Focus advanced to the next card with a fresh stage.
    assert_eq!(app.focused_item().map(|i| i.id), Some(2));
    assert_eq!(app.card.stage, Stage::Recall);

    assess_and_complete(&mut app, Assessment::Forgot);
    app.pump();
    assert_eq!(toast(&app), Some(Acknowledgement::SessionComplete));
    assert!(app.session_progress().is_done());
    assert!(
        app.session_items()
            .iter()
            .all(|i| i.status(now()) == ItemStatus::Completed)
    );
    assert_eq!(
        backend.calls().complete,
        vec![(1, 1, ResponseCode::Easy), (1, 2, ResponseCode::Forgot)]
    );
}

#[test]
fn rejected_completion_can_be_retried() {
    let (mut app, backend) = launch(
        MemoryBackend::new(
            today_session(vec![ReviewItem::new(1, 1, ItemType::Note, 11)]),
            Vec::new(),
            Vec::new(),
        ),
        Config::default(),
    );
    backend.fail(Endpoint::Complete, 1);
    app.start_session(SessionScope::Today);
    app.apply_nav(NavAction::Next);
    assess_and_complete(&mut app, Assessment::Hard);
    app.pump();

    assert!(matches!(toast(&app), Some(Acknowledgement::Failed(_))));
    assert_eq!(app.queues.today.items[0].status(now()), ItemStatus::Pending);
    assert!(app.protocol.is_idle());
    assert_eq!(app.card.assessment, Some(Assessment::Hard));

    app.apply_nav(NavAction::Complete);
    app.pump();
    assert_eq!(toast(&app), Some(Acknowledgement::SessionComplete));
    assert_eq!(app.queues.today.items[0].status(now()), ItemStatus::Completed);
    assert_eq!(backend.calls().complete.len(), 2);
}

#[test]
fn second_submission_is_blocked_while_in_flight() {
    let (mut app, backend) = launch(
        MemoryBackend::new(
            today_session(vec![
                ReviewItem::new(1, 1, ItemType::Note, 11),
                ReviewItem::new(2, 1, ItemType::Note, 12),
            ]),
            Vec::new(),
            Vec::new(),
        ),
        Config::default(),
    );
    app.start_session(SessionScope::Today);
    app.apply_nav(NavAction::Next);
    app.apply_nav(NavAction::Reveal);
    app.apply_nav(NavAction::Select(Assessment::Easy));
    app.complete_focused().unwrap();

    // Result not delivered yet: the guard is closed.
    let ctx = app.key_context();
    assert!(ctx.submitting);
    let enter = crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Enter);
    assert_eq!(map_key(&enter, &ctx), None);
    assert_eq!(
        app.complete_focused(),
        Err(ActionError::Completion(CompletionError::InFlight))
    );

    app.pump();
    assert_eq!(backend.calls().complete.len(), 1);
    assert!(app.protocol.is_idle());
}

#[test]
fn today_and_overdue_stay_disjoint() {
    let overdue = vec![
        OverdueEntry {
            planned_time: now() - Duration::days(3),
            postpone_count: 2,
            item: ReviewItem::new(30, 3, ItemType::Quote, 31),
        },
        OverdueEntry {
            planned_time: now() - Duration::days(1),
            postpone_count: 0,
            item: ReviewItem::new(40, 4, ItemType::Note, 41),
        },
    ];
    let (mut app, backend) = launch(
        MemoryBackend::new(
            today_session(vec![ReviewItem::new(1, 1, ItemType::Note, 11)]),
            overdue,
            Vec::new(),
        ),
        Config::default(),
    );

    let today: HashSet<i64> = app.queues.today.items.iter().map(|i| i.id).collect();
    let overdue: HashSet<i64> = app.queues.overdue.items.iter().map(|i| i.id).collect();
    assert!(today.is_disjoint(&overdue));
    assert!(
        app.queues
            .overdue
            .items
            .iter()
            .all(|i| i.status(now()) == ItemStatus::Overdue)
    );
    assert_eq!(app.queues.overdue.items[0].postpone_count, Some(2));

    // Completing from the overdue session moves the item into history.
    app.start_session(SessionScope::Overdue);
    app.apply_nav(NavAction::Next);
    assess_and_complete(&mut app, Assessment::Easy);
    app.pump();
    assert_eq!(toast(&app), Some(Acknowledgement::ItemReviewed));
    assert_eq!(app.queues.overdue.items.len(), 1);
    assert_eq!(app.navigator.item_count(), 1);
    assert_eq!(app.card.stage, Stage::Recall);
    assert!(app.queues.completed.items.iter().any(|i| i.id == 30));
    assert_eq!(backend.calls().complete, vec![(3, 30, ResponseCode::Easy)]);
}

#[test]
fn postponing_from_session_drops_the_card() {
    let overdue = vec![OverdueEntry {
        planned_time: now() - Duration::days(2),
        postpone_count: 0,
        item: ReviewItem::new(50, 5, ItemType::Note, 51),
    }];
    let (mut app, backend) = launch(
        MemoryBackend::new(Vec::new(), overdue, Vec::new()),
        Config::default(),
    );
    app.start_session(SessionScope::Overdue);
    app.apply_nav(NavAction::Next);
    app.postpone_focused().unwrap();
    app.pump();
    assert_eq!(toast(&app), Some(Acknowledgement::Postponed));
    assert!(app.queues.overdue.items.is_empty());
    assert_eq!(app.focused_item(), None);
    assert_eq!(backend.calls().postpone, vec![50]);
}

fn archive(days: i64) -> Vec<ReviewSession> {
    (1..=days)
        .map(|day| {
            let done = now() - Duration::days(day) + Duration::hours(day % 4);
            ReviewSession {
                id: 100 + day,
                planned_time: done - Duration::hours(1),
                completed_time: Some(done),
                items: vec![
                    ReviewItem::new(day * 10, 100 + day, ItemType::Note, day).completed_at(done),
                    ReviewItem::new(day * 10 + 1, 100 + day, ItemType::Quote, day)
                        .completed_at(done - Duration::minutes(20)),
                ],
            }
        })
        .collect()
}

#[test]
fn paged_and_infinite_history_group_identically() {
    let config = Config {
        history_page_size: 3,
        ..Config::default()
    };
    let (mut app, _) = launch(MemoryBackend::new(Vec::new(), Vec::new(), archive(8)), config);

    app.open_history();
    assert_eq!(app.screen, AppScreen::History);
    app.pump();
    let mut paged_items: Vec<UiReviewItem> = app.history.items().to_vec();
    while app.history.paged.has_next() {
        app.history_next_page();
        app.pump();
        paged_items.extend(app.history.items().iter().cloned());
    }
    assert_eq!(app.history.paged.total_pages, 3);
    assert_eq!(paged_items.len(), 16);

    app.history_toggle_mode();
    assert_eq!(app.history.mode, HistoryMode::Infinite);
    app.pump();
    for _ in 0..10 {
        if app.history.infinite.exhausted {
            break;
        }
        app.history_move(1000);
        app.pump();
    }
    assert!(app.history.infinite.exhausted);

    let c = clock();
    assert_eq!(app.history.buckets(&c), group_by_date(&paged_items, &c));
    assert_eq!(app.history.buckets(&c).len(), 8);
}

#[test]
fn history_response_for_old_mode_is_ignored() {
    let config = Config {
        history_page_size: 2,
        ..Config::default()
    };
    let (mut app, _) = launch(MemoryBackend::new(Vec::new(), Vec::new(), archive(4)), config);

    app.open_history();
    app.history_toggle_mode();
    app.pump();

    assert_eq!(app.history.mode, HistoryMode::Infinite);
    assert!(app.history.paged.items.is_empty());
    assert_eq!(app.history.infinite.items.len(), 4);
    assert_eq!(app.history.expand.expanded_count(), 1);
}

#[test]
fn infinite_history_keeps_loading_until_rows_pass_the_prefetch_window() {
    let config = Config {
        history_page_size: 1,
        history_mode: HistoryMode::Infinite,
        ..Config::default()
    };
    let (mut app, backend) = launch(MemoryBackend::new(Vec::new(), Vec::new(), archive(4)), config);
    let before = backend.calls().history;

    app.open_history();
    app.pump();
    // Page 0 alone gives three rows, all inside the prefetch window, so
    // page 1 follows without a keypress.
    assert_eq!(app.history.infinite.next_page, 2);
    assert_eq!(app.history.infinite.items.len(), 4);
    assert!(!app.history.infinite.exhausted);
    assert_eq!(backend.calls().history - before, 2);

    // Notes only: the loaded rows shrink back into the window.
    app.history_cycle_filter();
    app.pump();
    assert_eq!(app.history.infinite.next_page, 3);
    assert_eq!(backend.calls().history - before, 3);
}

#[test]
fn failed_section_does_not_block_the_others() {
    let backend = MemoryBackend::new(
        today_session(vec![ReviewItem::new(1, 1, ItemType::Note, 11)]),
        Vec::new(),
        archive(2),
    );
    backend.fail(Endpoint::Overdue, 1);
    let (mut app, _) = launch(backend, Config::default());

    assert!(app.queues.overdue.error().is_some());
    assert_eq!(app.queues.today.items.len(), 1);
    assert_eq!(app.queues.completed.items.len(), 4);

    app.refresh_section(rereadr::review::queue::QueueKind::Overdue);
    app.pump();
    assert!(app.queues.overdue.error().is_none());
}
