pub mod runner;
pub mod store;

pub use runner::{AnswerOutcome, Question, SessionPhase, SessionRunner, SessionSummary, StudyBackend};
pub use store::SessionStore;
