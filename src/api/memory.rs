use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use log::info;

use crate::api::{BackendError, BackendResult, ReviewBackend};
use crate::review::clock::ReviewClock;
use crate::review::model::{
    HistoryPage, NoteRef, OverdueEntry, QuoteRef, ResponseCode, ReviewItem, ReviewSession,
    Timestamp,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Today,
    Overdue,
    History,
    Complete,
    Postpone,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallLog {
    pub today: u32,
    pub overdue: u32,
    pub history: u32,
    pub complete: Vec<(i64, i64, ResponseCode)>,
    pub postpone: Vec<i64>,
}

#[derive(Default)]
struct MemoryState {
    today: Vec<ReviewSession>,
    overdue: Vec<OverdueEntry>,
    archive: Vec<ReviewSession>,
    calls: CallLog,
    failures: HashMap<Endpoint, u32>,
    fixed_now: Option<Timestamp>,
}

impl MemoryState {
    fn now(&self) -> Timestamp {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    fn take_failure(&mut self, endpoint: Endpoint) -> BackendResult<()> {
        match self.failures.get_mut(&endpoint) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(BackendError::Http {
                    status: 503,
                    body: "injected failure".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn archive_session(&mut self, review_id: i64, planned_time: Timestamp) -> &mut ReviewSession {
        let idx = match self.archive.iter().position(|s| s.id == review_id) {
            Some(idx) => idx,
            None => {
                self.archive.push(ReviewSession {
                    id: review_id,
                    planned_time,
                    completed_time: None,
                    items: Vec::new(),
                });
                self.archive.len() - 1
            }
        };
        &mut self.archive[idx]
    }
}

/// In-process review server. Applies commands the way the real one does and
/// records every call.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new(today: Vec<ReviewSession>, overdue: Vec<OverdueEntry>, archive: Vec<ReviewSession>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                today,
                overdue,
                archive,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stamp completions with this time instead of the wall clock.
    pub fn with_fixed_now(self, now: Timestamp) -> Self {
        self.lock().fixed_now = Some(now);
        self
    }

    /// The next `times` calls to `endpoint` fail with a 503.
    pub fn fail(&self, endpoint: Endpoint, times: u32) {
        self.lock().failures.insert(endpoint, times);
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    /// A small library relative to `clock`: a batch due later today, a few
    /// overdue items and two weeks of finished reviews.
    pub fn demo(clock: &ReviewClock) -> Self {
        let now = clock.now;
        let books = [
            (1, "The Name of the Rose"),
            (2, "Invisible Cities"),
            (3, "The Left Hand of Darkness"),
            (4, "Meditations"),
        ];
        let notes = [
            ("Labyrinth", "The library is a labyrinth because knowledge is meant to be guarded.", vec!["structure", "power"]),
            ("Memory", "Each city is a memory the traveller tells against forgetting.", vec!["memory"]),
            ("Shifgrethor", "Prestige as a social physics; refusing advice to keep face.", vec!["culture"]),
            ("Morning", "Begin the day expecting friction; it is the raw material of virtue.", vec!["stoicism", "habit"]),
        ];
        let quotes = [
            ("Stat rosa pristina nomine, nomina nuda tenemus.", 502),
            ("The inferno of the living is not something that will be.", 165),
            ("Light is the left hand of darkness.", 233),
            ("The impediment to action advances action.", 61),
        ];

        let mut next_id = 1;
        let mut item = |review_id: i64, i: usize, as_quote: bool| {
            let (book_id, title) = books[i % books.len()];
            let id = next_id;
            next_id += 1;
            let base = if as_quote {
                let (content, page) = quotes[i % quotes.len()];
                ReviewItem::quote(
                    id,
                    review_id,
                    QuoteRef {
                        id: 100 + id,
                        content: content.to_string(),
                        page: Some(page),
                        memo: None,
                    },
                )
            } else {
                let (heading, content, tags) = &notes[i % notes.len()];
                ReviewItem::note(
                    id,
                    review_id,
                    NoteRef {
                        id: 200 + id,
                        title: Some(heading.to_string()),
                        content: content.to_string(),
                        tags: tags.iter().map(|t| t.to_string()).collect(),
                        created_at: Some(now - Duration::days(30)),
                    },
                )
            };
            base.with_book(book_id, title)
        };

        let today = vec![ReviewSession {
            id: 1000,
            planned_time: now + Duration::hours(2),
            completed_time: None,
            items: (0..4).map(|i| item(1000, i, i % 2 == 1)).collect(),
        }];

        let overdue = (0..2)
            .map(|i| {
                let mut entry_item = item(900 + i as i64, i + 1, i == 0);
                entry_item.review_count = 2;
                entry_item.last_review_time = Some(now - Duration::days(9));
                OverdueEntry {
                    planned_time: now - Duration::days(2 + i as i64),
                    postpone_count: i as u32,
                    item: entry_item,
                }
            })
            .collect();

        let archive = (1..=14)
            .map(|day| {
                let review_id = 500 + day;
                let done_at = now - Duration::days(day) - Duration::hours(day % 5);
                ReviewSession {
                    id: review_id,
                    planned_time: done_at - Duration::hours(1),
                    completed_time: Some(done_at),
                    items: (0..(1 + day as usize % 3))
                        .map(|i| item(review_id, i + day as usize, (i + day as usize) % 2 == 0).completed_at(done_at))
                        .collect(),
                }
            })
            .collect();

        Self::new(today, overdue, archive)
    }
}

impl ReviewBackend for MemoryBackend {
    fn today_queue(&self) -> BackendResult<Vec<ReviewSession>> {
        let mut state = self.lock();
        state.calls.today += 1;
        state.take_failure(Endpoint::Today)?;
        Ok(state.today.clone())
    }

    fn overdue_queue(&self) -> BackendResult<Vec<OverdueEntry>> {
        let mut state = self.lock();
        state.calls.overdue += 1;
        state.take_failure(Endpoint::Overdue)?;
        Ok(state.overdue.clone())
    }

    fn history(&self, page: u32, size: u32) -> BackendResult<HistoryPage> {
        let mut state = self.lock();
        state.calls.history += 1;
        state.take_failure(Endpoint::History)?;

        let size = size.max(1);
        let mut sessions: Vec<ReviewSession> = state
            .today
            .iter()
            .chain(state.archive.iter())
            .filter_map(|session| {
                let items: Vec<ReviewItem> =
                    session.items.iter().filter(|i| i.completed).cloned().collect();
                (!items.is_empty()).then(|| ReviewSession {
                    items,
                    ..session.clone()
                })
            })
            .collect();
        sessions.sort_by(|a, b| b.planned_time.cmp(&a.planned_time).then(b.id.cmp(&a.id)));

        let total = sessions.len() as u64;
        let total_pages = total.div_ceil(size as u64) as u32;
        let content: Vec<ReviewSession> = sessions
            .into_iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .collect();
        Ok(HistoryPage {
            content,
            number: page,
            size,
            total_pages,
            total_elements: total,
            last: page + 1 >= total_pages,
        })
    }

    fn complete_item(&self, review_id: i64, item_id: i64, code: ResponseCode) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.complete.push((review_id, item_id, code));
        state.take_failure(Endpoint::Complete)?;
        let now = state.now();

        let in_today = state
            .today
            .iter_mut()
            .filter(|s| s.id == review_id)
            .flat_map(|s| s.items.iter_mut())
            .find(|i| i.id == item_id);
        if let Some(item) = in_today {
            if item.completed {
                return Err(BackendError::Http {
                    status: 409,
                    body: "already completed".to_string(),
                });
            }
            item.completed = true;
            item.completed_time = Some(now);
            item.last_review_time = Some(now);
            item.review_count += 1;
            info!("completed item {item_id} in review {review_id} as {}", code.as_str());
            return Ok(());
        }

        let Some(pos) = state
            .overdue
            .iter()
            .position(|e| e.item.review_id == review_id && e.item.id == item_id)
        else {
            return Err(BackendError::Http {
                status: 404,
                body: format!("no item {item_id} in review {review_id}"),
            });
        };
        let entry = state.overdue.remove(pos);
        let mut item = entry.item;
        item.completed = true;
        item.completed_time = Some(now);
        item.last_review_time = Some(now);
        item.review_count += 1;
        state.archive_session(review_id, entry.planned_time).items.push(item);
        info!("completed overdue item {item_id} as {}", code.as_str());
        Ok(())
    }

    fn postpone_item(&self, item_id: i64) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.postpone.push(item_id);
        state.take_failure(Endpoint::Postpone)?;
        let Some(pos) = state.overdue.iter().position(|e| e.item.id == item_id) else {
            return Err(BackendError::Http {
                status: 404,
                body: format!("item {item_id} is not overdue"),
            });
        };
        // Rescheduled out of every queue this client reads.
        state.overdue.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::model::ItemType;
    use chrono::TimeZone;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
    }

    fn backend() -> MemoryBackend {
        let today = vec![ReviewSession {
            id: 1,
            planned_time: now() + Duration::hours(1),
            completed_time: None,
            items: vec![
                ReviewItem::new(1, 1, ItemType::Note, 11),
                ReviewItem::new(2, 1, ItemType::Quote, 12),
            ],
        }];
        let overdue = vec![OverdueEntry {
            planned_time: now() - Duration::days(2),
            postpone_count: 0,
            item: ReviewItem::new(3, 7, ItemType::Note, 13),
        }];
        MemoryBackend::new(today, overdue, Vec::new()).with_fixed_now(now())
    }

    #[test]
    fn test_complete_stamps_item() {
        let b = backend();
        b.complete_item(1, 1, ResponseCode::Easy).unwrap();
        let today = b.today_queue().unwrap();
        let item = &today[0].items[0];
        assert!(item.completed);
        assert_eq!(item.completed_time, Some(now()));
        assert_eq!(item.review_count, 1);
        assert_eq!(b.calls().complete, vec![(1, 1, ResponseCode::Easy)]);
    }

    #[test]
    fn test_double_completion_rejected() {
        let b = backend();
        b.complete_item(1, 2, ResponseCode::Normal).unwrap();
        let err = b.complete_item(1, 2, ResponseCode::Normal).unwrap_err();
        assert!(matches!(err, BackendError::Http { status: 409, .. }));
    }

    #[test]
    fn test_overdue_completion_moves_to_history() {
        let b = backend();
        b.complete_item(7, 3, ResponseCode::Forgot).unwrap();
        assert!(b.overdue_queue().unwrap().is_empty());
        let page = b.history(0, 10).unwrap();
        let ids: Vec<i64> = page.completed_items().map(|(_, i)| i.id).collect();
        assert_eq!(ids, vec![3]);
        assert!(page.last);
    }

    #[test]
    fn test_postpone_removes_overdue_entry() {
        let b = backend();
        assert!(b.postpone_item(1).is_err());
        b.postpone_item(3).unwrap();
        assert!(b.overdue_queue().unwrap().is_empty());
        assert_eq!(b.calls().postpone, vec![1, 3]);
    }

    #[test]
    fn test_injected_failures_run_out() {
        let b = backend();
        b.fail(Endpoint::Complete, 1);
        assert!(b.complete_item(1, 1, ResponseCode::Easy).is_err());
        assert!(!b.today_queue().unwrap()[0].items[0].completed);
        b.complete_item(1, 1, ResponseCode::Easy).unwrap();
        assert_eq!(b.calls().complete.len(), 2);
    }

    #[test]
    fn test_demo_history_paginates() {
        let clock = ReviewClock::utc(now());
        let b = MemoryBackend::demo(&clock);
        let first = b.history(0, 5).unwrap();
        assert_eq!(first.total_elements, 14);
        assert_eq!(first.total_pages, 3);
        assert!(!first.last);
        let last = b.history(2, 5).unwrap();
        assert!(last.last);
        assert_eq!(last.content.len(), 4);
        assert_eq!(b.today_queue().unwrap()[0].items.len(), 4);
        assert_eq!(b.overdue_queue().unwrap().len(), 2);
    }
}
