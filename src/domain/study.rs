use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which facet of an item a question asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  Meaning,
  Pronunciation,
}

impl QuestionType {
  pub const ALL: [QuestionType; 2] = [QuestionType::Meaning, QuestionType::Pronunciation];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Meaning => "meaning",
      Self::Pronunciation => "pronunciation",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "meaning" | "definition" => Some(Self::Meaning),
      "pronunciation" | "pinyin" => Some(Self::Pronunciation),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
  /// Due items, submitted to the scheduler card by card
  Review,
  /// Newly introduced items, submitted as one batch at the end
  InitialStudy,
  /// Practice only, never touches the scheduler
  SelfStudy,
}

impl SessionMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Review => "review",
      Self::InitialStudy => "initial_study",
      Self::SelfStudy => "self_study",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "review" | "srs" => Some(Self::Review),
      "initial_study" | "initial" => Some(Self::InitialStudy),
      "self_study" | "self-study" => Some(Self::SelfStudy),
      _ => None,
    }
  }

  /// Whether a pronunciation answer with the right syllables but wrong tones earns a retry.
  pub fn allows_tone_retry(&self) -> bool {
    !matches!(self, Self::SelfStudy)
  }
}

/// One logged answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeRecord {
  pub item_id: i64,
  pub mode: SessionMode,
  pub question_type: QuestionType,
  pub user_answer: String,
  pub is_correct: bool,
  pub practiced_at: DateTime<Utc>,
}

/// Arrow-track progress as stored in a document's progress side-file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgress {
  pub arrow_id: String,
  pub times_studied: u32,
  pub times_correct: u32,
  pub last_studied: DateTime<Utc>,
  pub next_review: DateTime<Utc>,
  pub ease_factor: f64,
  pub interval: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mode_round_trip_names() {
    for mode in [SessionMode::Review, SessionMode::InitialStudy, SessionMode::SelfStudy] {
      assert_eq!(SessionMode::from_str(mode.as_str()), Some(mode));
    }
    assert_eq!(SessionMode::from_str("self-study"), Some(SessionMode::SelfStudy));
    assert_eq!(QuestionType::from_str("pinyin"), Some(QuestionType::Pronunciation));
    assert_eq!(QuestionType::from_str("tone"), None);
  }

  #[test]
  fn test_tone_retry_only_in_scheduled_modes() {
    assert!(SessionMode::Review.allows_tone_retry());
    assert!(SessionMode::InitialStudy.allows_tone_retry());
    assert!(!SessionMode::SelfStudy.allows_tone_retry());
  }
}
