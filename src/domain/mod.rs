pub mod item;
pub mod network;
pub mod study;

pub use item::{DueItem, LearningItem, ProgressRecord};
pub use network::{generate_id, random_token, Arrow, ArrowStyle, Flashcard, FlashcardSet, Side};
pub use study::{PracticeRecord, QuestionType, SessionMode, StudyProgress};
