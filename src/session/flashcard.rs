use thiserror::Error;

use crate::review::model::Assessment;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Recall,
    Revealed,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("item is already completed")]
    AlreadyCompleted,
    #[error("reveal the card before assessing it")]
    NotRevealed,
    #[error("card is already revealed")]
    AlreadyRevealed,
    #[error("choose how well you remembered first")]
    NoAssessment,
}

/// Interaction state of the focused card. Lives only while the card has
/// focus; any focus change starts over at `Recall`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CardState {
    pub stage: Stage,
    pub assessment: Option<Assessment>,
}

impl CardState {
    pub fn reset(&mut self) {
        *self = CardState::default();
    }

    pub fn reveal(&mut self, item_completed: bool) -> Result<(), StageError> {
        if item_completed {
            return Err(StageError::AlreadyCompleted);
        }
        if self.stage == Stage::Revealed {
            return Err(StageError::AlreadyRevealed);
        }
        self.stage = Stage::Revealed;
        Ok(())
    }

    /// Choosing (or changing) an assessment is local; nothing is sent.
    pub fn select(&mut self, assessment: Assessment, item_completed: bool) -> Result<(), StageError> {
        if item_completed {
            return Err(StageError::AlreadyCompleted);
        }
        if self.stage != Stage::Revealed {
            return Err(StageError::NotRevealed);
        }
        self.assessment = Some(assessment);
        Ok(())
    }

    /// The assessment to submit, if the card is ready for completion.
    pub fn ready(&self, item_completed: bool) -> Result<Assessment, StageError> {
        if item_completed {
            return Err(StageError::AlreadyCompleted);
        }
        if self.stage != Stage::Revealed {
            return Err(StageError::NotRevealed);
        }
        self.assessment.ok_or(StageError::NoAssessment)
    }
}
