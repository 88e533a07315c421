//! File-backed storage for flashcard documents, templates and arrow progress.

pub mod documents;
pub mod history;
pub mod progress_file;
pub mod templates;

pub use documents::{load_document, parse_document, save_document};
pub use history::History;
pub use progress_file::{progress_path, Capabilities, ProgressData, ProgressMap, ProgressStore};
pub use templates::{duplicate_as_skeleton, FlashcardTemplate, TemplatePreview};
