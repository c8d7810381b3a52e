pub mod flashcard;
pub mod history_view;
pub mod pager;
pub mod progress_bar;
pub mod queue_list;
pub mod toast;
