pub mod classify;
pub mod clock;
pub mod history;
pub mod model;
pub mod progress;
pub mod queue;
