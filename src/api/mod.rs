pub mod http;
pub mod memory;

use thiserror::Error;

use crate::review::model::{HistoryPage, OverdueEntry, ResponseCode, ReviewSession};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("not signed in")]
    Unauthorized,
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("network support is disabled in this build")]
    Unavailable,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The review server. It schedules items; this side only reads queues and
/// sends completion or postponement commands.
pub trait ReviewBackend: Send + Sync {
    fn today_queue(&self) -> BackendResult<Vec<ReviewSession>>;

    fn overdue_queue(&self) -> BackendResult<Vec<OverdueEntry>>;

    fn history(&self, page: u32, size: u32) -> BackendResult<HistoryPage>;

    fn complete_item(&self, review_id: i64, item_id: i64, code: ResponseCode) -> BackendResult<()>;

    fn postpone_item(&self, item_id: i64) -> BackendResult<()>;
}
