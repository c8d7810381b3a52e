use crate::review::classify::{ItemStatus, UiReviewItem};
use crate::review::clock::ReviewClock;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub completed_today: usize,
    pub total: usize,
    pub percentage: f64,
}

impl Progress {
    /// Count of items completed on today's calendar date over the whole list.
    pub fn compute(items: &[UiReviewItem], clock: &ReviewClock) -> Self {
        let today = clock.today();
        let completed_today = items
            .iter()
            .filter(|item| item.status(clock.now) == ItemStatus::Completed)
            .filter(|item| item.completed_time.is_some_and(|t| clock.day_of(t) == today))
            .count();
        let total = items.len();
        let percentage = if total > 0 {
            completed_today as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            completed_today,
            total,
            percentage,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.percentage / 100.0
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed_today == self.total
    }
}
