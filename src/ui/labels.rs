use rust_i18n::t;

use crate::review::classify::{ItemStatus, LastReview};
use crate::review::history::{HistoryFilter, HistoryMode};
use crate::review::model::{Assessment, ItemType};
use crate::review::queue::QueueKind;
use crate::session::completion::Acknowledgement;

pub fn status(status: ItemStatus) -> String {
    match status {
        ItemStatus::Overdue => t!("status.overdue"),
        ItemStatus::Pending => t!("status.pending"),
        ItemStatus::Completed => t!("status.completed"),
    }
    .into_owned()
}

pub fn item_type(item_type: ItemType) -> String {
    match item_type {
        ItemType::Note => t!("item.note"),
        ItemType::Quote => t!("item.quote"),
    }
    .into_owned()
}

pub fn section(kind: QueueKind) -> String {
    match kind {
        QueueKind::Today => t!("section.today"),
        QueueKind::Overdue => t!("section.overdue"),
        QueueKind::Completed => t!("section.completed"),
    }
    .into_owned()
}

pub fn assessment(assessment: Assessment) -> String {
    match assessment {
        Assessment::Forgot => t!("assessment.forgot"),
        Assessment::Hard => t!("assessment.hard"),
        Assessment::Easy => t!("assessment.easy"),
    }
    .into_owned()
}

pub fn last_review(hint: &LastReview) -> String {
    match hint {
        LastReview::FirstReview => t!("last_review.first"),
        LastReview::Today => t!("last_review.today"),
        LastReview::Yesterday => t!("last_review.yesterday"),
        LastReview::DaysAgo(days) => t!("last_review.days_ago", days = days),
        LastReview::On(date) => t!("last_review.on", date = date.format("%Y-%m-%d")),
    }
    .into_owned()
}

pub fn acknowledgement(ack: &Acknowledgement) -> String {
    match ack {
        Acknowledgement::ItemReviewed => t!("toast.item_reviewed"),
        Acknowledgement::SessionComplete => t!("toast.session_complete"),
        Acknowledgement::Postponed => t!("toast.postponed"),
        Acknowledgement::Failed(error) => t!("toast.failed", error = error),
    }
    .into_owned()
}

pub fn history_mode(mode: HistoryMode) -> String {
    match mode {
        HistoryMode::Paged => t!("history.mode_paged"),
        HistoryMode::Infinite => t!("history.mode_infinite"),
    }
    .into_owned()
}

pub fn history_filter(filter: HistoryFilter) -> String {
    match filter {
        HistoryFilter::All => t!("history.filter_all"),
        HistoryFilter::Notes => t!("history.filter_notes"),
        HistoryFilter::Quotes => t!("history.filter_quotes"),
    }
    .into_owned()
}
