use chrono::NaiveDate;

use crate::review::clock::ReviewClock;
use crate::review::model::{
    ItemPayload, ItemType, OverdueEntry, ReviewItem, ReviewSession, Timestamp,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Overdue,
    Pending,
    Completed,
}

impl ItemStatus {
    pub fn derive(completed: bool, due: Option<Timestamp>, now: Timestamp) -> Self {
        if completed {
            ItemStatus::Completed
        } else if due.is_some_and(|due| due < now) {
            ItemStatus::Overdue
        } else {
            ItemStatus::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Overdue => "overdue",
            ItemStatus::Pending => "pending",
            ItemStatus::Completed => "completed",
        }
    }
}

/// Coarse "last reviewed" hint shown on cards and list rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LastReview {
    FirstReview,
    Today,
    Yesterday,
    DaysAgo(i64),
    On(NaiveDate),
}

impl LastReview {
    pub fn classify(ts: Option<Timestamp>, clock: &ReviewClock) -> Self {
        let Some(ts) = ts else {
            return LastReview::FirstReview;
        };
        let day = clock.day_of(ts);
        let days = clock.today().signed_duration_since(day).num_days();
        match days {
            0 => LastReview::Today,
            1 => LastReview::Yesterday,
            2..=6 => LastReview::DaysAgo(days),
            _ => LastReview::On(day),
        }
    }
}

/// Display model for one review item. Status is not stored; ask
/// [`UiReviewItem::status`] with the current time.
#[derive(Clone, Debug, PartialEq)]
pub struct UiReviewItem {
    pub id: i64,
    pub review_id: i64,
    pub item_type: ItemType,
    pub item_id: i64,
    pub book_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
    pub tags: Vec<String>,
    pub due_date: Option<Timestamp>,
    pub completed: bool,
    pub completed_time: Option<Timestamp>,
    pub last_review_time: Option<Timestamp>,
    /// Source of the "last reviewed" hint: last review, completion, or
    /// creation time, whichever is known first.
    pub hint_time: Option<Timestamp>,
    pub review_count: u32,
    pub postpone_count: Option<u32>,
    pub degraded: bool,
}

impl UiReviewItem {
    pub fn status(&self, now: Timestamp) -> ItemStatus {
        ItemStatus::derive(self.completed, self.due_date, now)
    }

    /// Recomputed against `clock` so "today" rolls over at midnight.
    pub fn last_review(&self, clock: &ReviewClock) -> LastReview {
        LastReview::classify(self.hint_time, clock)
    }

    /// Timestamp that places the item in the history timeline.
    pub fn reviewed_at(&self) -> Option<Timestamp> {
        self.last_review_time.or(self.completed_time)
    }
}

pub fn classify(item: &ReviewItem, session: Option<&ReviewSession>) -> UiReviewItem {
    build(item, session.map(|s| s.planned_time), None)
}

pub fn classify_session(session: &ReviewSession) -> Vec<UiReviewItem> {
    session
        .items
        .iter()
        .map(|item| classify(item, Some(session)))
        .collect()
}

pub fn classify_overdue(entry: &OverdueEntry) -> UiReviewItem {
    build(&entry.item, Some(entry.planned_time), Some(entry.postpone_count))
}

fn build(
    item: &ReviewItem,
    due_date: Option<Timestamp>,
    postpone_count: Option<u32>,
) -> UiReviewItem {
    let (title, content, page, tags, created_at, degraded) = match &item.payload {
        ItemPayload::Note(note) => (
            note.title.clone(),
            note.content.clone(),
            None,
            note.tags.clone(),
            note.created_at,
            false,
        ),
        ItemPayload::Quote(quote) => (
            None,
            quote.content.clone(),
            quote.page,
            Vec::new(),
            None,
            false,
        ),
        ItemPayload::Missing => (
            None,
            format!("{} #{}", item.item_type.label(), item.item_id),
            None,
            Vec::new(),
            None,
            true,
        ),
    };

    let hint_time = item
        .last_review_time
        .or(item.completed_time)
        .or(created_at);

    UiReviewItem {
        id: item.id,
        review_id: item.review_id,
        item_type: item.item_type,
        item_id: item.item_id,
        book_id: item.book_id,
        title,
        content,
        source: item.book_title.clone().unwrap_or_default(),
        page,
        tags,
        due_date,
        completed: item.completed,
        completed_time: item.completed_time,
        last_review_time: item.last_review_time,
        hint_time,
        review_count: item.review_count,
        postpone_count,
        degraded,
    }
}
