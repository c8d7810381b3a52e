use log::{debug, warn};

use crate::api::BackendError;
use crate::review::classify::{self, UiReviewItem};
use crate::review::model::{HistoryPage, OverdueEntry, ReviewSession};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Today,
    Overdue,
    Completed,
}

impl QueueKind {
    pub const ALL: [QueueKind; 3] = [QueueKind::Today, QueueKind::Overdue, QueueKind::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Today => "today",
            QueueKind::Overdue => "overdue",
            QueueKind::Completed => "completed",
        }
    }
}

/// One independently refreshed list with its own load flag.
#[derive(Clone, Debug, Default)]
pub struct QueueSection {
    pub items: Vec<UiReviewItem>,
    pub state: LoadState,
    generation: u64,
}

impl QueueSection {
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Generation of the newest request issued for this section.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    fn settle(&mut self, kind: QueueKind, result: Result<Vec<UiReviewItem>, BackendError>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.state = LoadState::Ready;
            }
            Err(err) => {
                // Last good rows stay visible under the error banner.
                warn!("{} queue fetch failed: {err}", kind.as_str());
                self.state = LoadState::Failed(err.to_string());
            }
        }
    }
}

/// Today, Overdue and Completed lists, each fed by its own query.
///
/// Today and Overdue come from different endpoints that partition the due
/// set; nothing here deduplicates across them.
#[derive(Clone, Debug, Default)]
pub struct ReviewQueues {
    pub today: QueueSection,
    pub overdue: QueueSection,
    pub completed: QueueSection,
    issued: u64,
}

impl ReviewQueues {
    pub fn section(&self, kind: QueueKind) -> &QueueSection {
        match kind {
            QueueKind::Today => &self.today,
            QueueKind::Overdue => &self.overdue,
            QueueKind::Completed => &self.completed,
        }
    }

    fn section_mut(&mut self, kind: QueueKind) -> &mut QueueSection {
        match kind {
            QueueKind::Today => &mut self.today,
            QueueKind::Overdue => &mut self.overdue,
            QueueKind::Completed => &mut self.completed,
        }
    }

    /// Marks `kind` as loading and returns the generation its response has
    /// to carry to be applied.
    pub fn mark_loading(&mut self, kind: QueueKind) -> u64 {
        self.issued += 1;
        let generation = self.issued;
        let section = self.section_mut(kind);
        section.state = LoadState::Loading;
        section.generation = generation;
        generation
    }

    /// Only the newest request per section may land. Anything older was
    /// overtaken by a later refresh and would roll the rows back.
    pub fn is_current(&self, kind: QueueKind, generation: u64) -> bool {
        let current = self.section(kind).generation == generation;
        if !current {
            debug!("dropping {} response from generation {generation}", kind.as_str());
        }
        current
    }

    pub fn apply_today(&mut self, result: Result<Vec<ReviewSession>, BackendError>) {
        let result = result.map(|mut sessions| {
            sessions.sort_by_key(|s| s.planned_time);
            sessions
                .iter()
                .flat_map(classify::classify_session)
                .collect()
        });
        self.today.settle(QueueKind::Today, result);
    }

    pub fn apply_overdue(&mut self, result: Result<Vec<OverdueEntry>, BackendError>) {
        let result = result.map(|entries| {
            entries
                .iter()
                .filter(|e| !e.item.completed)
                .map(classify::classify_overdue)
                .collect()
        });
        self.overdue.settle(QueueKind::Overdue, result);
    }

    pub fn apply_completed(&mut self, result: Result<HistoryPage, BackendError>) {
        let result = result.map(|page| {
            page.completed_items()
                .map(|(session, item)| classify::classify(item, Some(session)))
                .collect()
        });
        self.completed.settle(QueueKind::Completed, result);
    }

    pub fn find(&self, id: i64) -> Option<(QueueKind, &UiReviewItem)> {
        QueueKind::ALL.iter().find_map(|&kind| {
            self.section(kind)
                .items
                .iter()
                .find(|item| item.id == id)
                .map(|item| (kind, item))
        })
    }
}
