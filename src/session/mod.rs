pub mod completion;
pub mod flashcard;
pub mod navigation;
