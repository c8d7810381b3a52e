use log::{info, warn};
use thiserror::Error;

use crate::api::{BackendResult, ReviewBackend};
use crate::review::classify::{ItemStatus, UiReviewItem};
use crate::review::model::{Assessment, ResponseCode, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Complete(ResponseCode),
    Postpone,
}

/// One accepted command. `is_last_item` is fixed when the ticket is issued,
/// before anything goes over the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub item_id: i64,
    pub review_id: i64,
    pub command: CommandKind,
    pub is_last_item: bool,
}

/// Single-flight guard shared by every mutating command. After a success it
/// stays closed until the authoritative refresh arrives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Submission {
    #[default]
    Idle,
    Submitting {
        item_id: i64,
        command: CommandKind,
    },
    Refreshing,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("another review is still being submitted")]
    InFlight,
    #[error("item {0} is not in this queue")]
    UnknownItem(i64),
    #[error("item {0} is already completed")]
    AlreadyCompleted(i64),
    #[error("item {0} is not overdue")]
    NotOverdue(i64),
    #[error("no submission is waiting for this result")]
    StaleTicket,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acknowledgement {
    ItemReviewed,
    SessionComplete,
    Postponed,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct CompletionProtocol {
    state: Submission,
}

impl CompletionProtocol {
    pub fn state(&self) -> &Submission {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == Submission::Idle
    }

    pub fn submitting_item(&self) -> Option<i64> {
        match self.state {
            Submission::Submitting { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    fn admit<'a>(
        &self,
        queue: &'a [UiReviewItem],
        item_id: i64,
        now: Timestamp,
    ) -> Result<&'a UiReviewItem, CompletionError> {
        if !self.is_idle() {
            return Err(CompletionError::InFlight);
        }
        let item = queue
            .iter()
            .find(|i| i.id == item_id)
            .ok_or(CompletionError::UnknownItem(item_id))?;
        if item.status(now) == ItemStatus::Completed {
            return Err(CompletionError::AlreadyCompleted(item_id));
        }
        Ok(item)
    }

    fn issue(&mut self, queue: &[UiReviewItem], item: &UiReviewItem, command: CommandKind, now: Timestamp) -> Ticket {
        let is_last_item = !queue
            .iter()
            .any(|i| i.id != item.id && i.status(now) != ItemStatus::Completed);
        self.state = Submission::Submitting {
            item_id: item.id,
            command,
        };
        Ticket {
            item_id: item.id,
            review_id: item.review_id,
            command,
            is_last_item,
        }
    }

    pub fn begin_complete(
        &mut self,
        queue: &[UiReviewItem],
        item_id: i64,
        assessment: Option<Assessment>,
        now: Timestamp,
    ) -> Result<Ticket, CompletionError> {
        let item = self.admit(queue, item_id, now)?;
        let code = ResponseCode::from(assessment);
        Ok(self.issue(queue, item, CommandKind::Complete(code), now))
    }

    pub fn begin_postpone(
        &mut self,
        queue: &[UiReviewItem],
        item_id: i64,
        now: Timestamp,
    ) -> Result<Ticket, CompletionError> {
        let item = self.admit(queue, item_id, now)?;
        if item.status(now) != ItemStatus::Overdue {
            return Err(CompletionError::NotOverdue(item_id));
        }
        Ok(self.issue(queue, item, CommandKind::Postpone, now))
    }

    /// Settles the command behind `ticket`. Failure reopens the guard so the
    /// same item can be retried; success holds it until [`Self::refreshed`].
    pub fn finish(
        &mut self,
        ticket: &Ticket,
        result: BackendResult<()>,
    ) -> Result<Acknowledgement, CompletionError> {
        match self.state {
            Submission::Submitting { item_id, command }
                if item_id == ticket.item_id && command == ticket.command => {}
            _ => return Err(CompletionError::StaleTicket),
        }
        match result {
            Ok(()) => {
                self.state = Submission::Refreshing;
                let ack = match ticket.command {
                    CommandKind::Complete(_) if ticket.is_last_item => Acknowledgement::SessionComplete,
                    CommandKind::Complete(_) => Acknowledgement::ItemReviewed,
                    CommandKind::Postpone => Acknowledgement::Postponed,
                };
                info!("item {} settled: {ack:?}", ticket.item_id);
                Ok(ack)
            }
            Err(err) => {
                self.state = Submission::Idle;
                warn!("item {} command failed: {err}", ticket.item_id);
                Ok(Acknowledgement::Failed(err.to_string()))
            }
        }
    }

    pub fn refreshed(&mut self) {
        if self.state == Submission::Refreshing {
            self.state = Submission::Idle;
        }
    }
}

pub fn send(backend: &dyn ReviewBackend, ticket: &Ticket) -> BackendResult<()> {
    match ticket.command {
        CommandKind::Complete(code) => backend.complete_item(ticket.review_id, ticket.item_id, code),
        CommandKind::Postpone => backend.postpone_item(ticket.item_id),
    }
}
