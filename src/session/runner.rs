//! Study session state machine.
//!
//! A session walks a queue of questions (item + question type). A card is
//! complete once both its meaning and its pronunciation were answered
//! correctly; a wrong answer sends the question to the back of the queue.
//! Scheduler writes go through [`StudyBackend`] so the runner itself holds
//! no connection.

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::VecDeque;

use crate::db::{self, LogOnError};
use crate::domain::{LearningItem, PracticeRecord, QuestionType, SessionMode};
use crate::error::{SessionError, SrsError};
use crate::validation::{self, AnswerResult};

/// Persistence the runner needs while a session is active.
pub trait StudyBackend {
  /// Schedule one answer; returns whether the item reached its milestone.
  fn submit_answer(&self, item_id: i64, correct: bool, now: DateTime<Utc>) -> Result<bool, SrsError>;
  fn complete_initial_study(&self, item_ids: &[i64], now: DateTime<Utc>) -> Result<(), SrsError>;
  fn mark_reviewable(&self, item_ids: &[i64], now: DateTime<Utc>) -> Result<(), SrsError>;
  fn record_practice(&self, record: &PracticeRecord) -> Result<(), SrsError>;
}

impl StudyBackend for Connection {
  fn submit_answer(&self, item_id: i64, correct: bool, now: DateTime<Utc>) -> Result<bool, SrsError> {
    db::submit_answer(self, item_id, correct, now)
  }

  fn complete_initial_study(&self, item_ids: &[i64], now: DateTime<Utc>) -> Result<(), SrsError> {
    db::complete_initial_study(self, item_ids, now)
  }

  fn mark_reviewable(&self, item_ids: &[i64], now: DateTime<Utc>) -> Result<(), SrsError> {
    db::mark_reviewable(self, item_ids, now)
  }

  fn record_practice(&self, record: &PracticeRecord) -> Result<(), SrsError> {
    db::record_practice(self, record)?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
  #[serde(skip)]
  card: usize,
  pub item: LearningItem,
  pub question_type: QuestionType,
  /// Second attempt after a wrong-tones answer
  pub retry: bool,
  /// The near-miss answer and the outcome it was given
  #[serde(skip)]
  near_miss: Option<(String, AnswerOutcome)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
  pub result: AnswerResult,
  pub correct: bool,
  /// The learner may answer the same question again unscored
  pub retry: bool,
  /// Reference answer, pinyin shown with tone marks
  pub expected: String,
  pub card_complete: bool,
  pub reached_milestone: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
  pub mode: Option<SessionMode>,
  pub total_cards: usize,
  pub cards_completed: usize,
  /// Completed without a single wrong answer
  pub cards_correct: usize,
  /// Answered wrong at least once
  pub cards_incorrect: usize,
  pub successful_answers: usize,
  /// Items that reached their milestone during the session
  pub milestones: Vec<i64>,
  pub exited_early: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
  Loading,
  Presenting(Question),
  Feedback { question: Question, outcome: AnswerOutcome },
  /// Every question answered; waiting for [`SessionRunner::finish`]
  Exhausted,
  Complete(SessionSummary),
}

impl SessionPhase {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::Presenting(_) => "presenting",
      Self::Feedback { .. } => "feedback",
      Self::Exhausted => "exhausted",
      Self::Complete(_) => "complete",
    }
  }
}

#[derive(Debug, Clone)]
struct CardState {
  item: LearningItem,
  meaning_ok: bool,
  pronunciation_ok: bool,
  answered: bool,
  /// Handed to the scheduler (or needs no scheduling)
  resolved: bool,
  ever_incorrect: bool,
}

impl CardState {
  fn is_complete(&self) -> bool {
    self.meaning_ok && self.pronunciation_ok
  }

  fn flag_mut(&mut self, question_type: QuestionType) -> &mut bool {
    match question_type {
      QuestionType::Meaning => &mut self.meaning_ok,
      QuestionType::Pronunciation => &mut self.pronunciation_ok,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SessionRunner {
  mode: SessionMode,
  cards: Vec<CardState>,
  queue: VecDeque<(usize, QuestionType)>,
  phase: SessionPhase,
  successful_answers: usize,
  milestones: Vec<i64>,
}

impl SessionRunner {
  pub fn new(mode: SessionMode) -> Self {
    Self {
      mode,
      cards: Vec::new(),
      queue: VecDeque::new(),
      phase: SessionPhase::Loading,
      successful_answers: 0,
      milestones: Vec::new(),
    }
  }

  pub fn mode(&self) -> SessionMode {
    self.mode
  }

  pub fn current(&self) -> &SessionPhase {
    &self.phase
  }

  /// (completed cards, total cards)
  pub fn progress(&self) -> (usize, usize) {
    (self.cards.iter().filter(|c| c.is_complete()).count(), self.cards.len())
  }

  /// Load the cards for this session. Each card asks both question types,
  /// in random order. An empty load completes the session at once.
  pub fn load<R: Rng>(&mut self, items: Vec<LearningItem>, rng: &mut R) -> Result<&SessionPhase, SessionError> {
    if !matches!(self.phase, SessionPhase::Loading) {
      return Err(SessionError::WrongPhase(self.phase.name(), "load cards"));
    }

    for (index, item) in items.into_iter().enumerate() {
      let (first, second) = if rng.random_bool(0.5) {
        (QuestionType::Meaning, QuestionType::Pronunciation)
      } else {
        (QuestionType::Pronunciation, QuestionType::Meaning)
      };
      self.queue.push_back((index, first));
      self.queue.push_back((index, second));
      self.cards.push(CardState {
        item,
        meaning_ok: false,
        pronunciation_ok: false,
        answered: false,
        resolved: false,
        ever_incorrect: false,
      });
    }
    tracing::info!(mode = self.mode.as_str(), cards = self.cards.len(), "session loaded");

    if self.cards.is_empty() {
      self.phase = SessionPhase::Complete(self.summary(false));
    } else {
      self.present_next();
    }
    Ok(&self.phase)
  }

  fn present_next(&mut self) {
    self.phase = match self.queue.pop_front() {
      Some((card, question_type)) => SessionPhase::Presenting(Question {
        card,
        item: self.cards[card].item.clone(),
        question_type,
        retry: false,
        near_miss: None,
      }),
      None => SessionPhase::Exhausted,
    };
  }

  /// Check an answer to the presented question. While feedback is shown,
  /// returns the outcome already given.
  pub fn submit_answer(
    &mut self,
    answer: &str,
    backend: &impl StudyBackend,
    now: DateTime<Utc>,
  ) -> Result<AnswerOutcome, SessionError> {
    let question = match &self.phase {
      SessionPhase::Presenting(q) => q.clone(),
      SessionPhase::Feedback { outcome, .. } => return Ok(outcome.clone()),
      other => return Err(SessionError::WrongPhase(other.name(), "submit an answer")),
    };
    // The same near miss sent again is not a second attempt
    if let Some((previous, outcome)) = &question.near_miss {
      if previous == answer.trim() {
        return Ok(outcome.clone());
      }
    }

    let card = &self.cards[question.card];
    let (reference, expected) = match question.question_type {
      QuestionType::Meaning => (&card.item.definition, card.item.definition.clone()),
      QuestionType::Pronunciation => (
        &card.item.pinyin,
        validation::convert_tone_numbers_to_marks(&card.item.pinyin),
      ),
    };
    let result = validation::check_answer(answer, reference, question.question_type);

    // One unscored retry for a wrong-tones near miss
    if result.allows_retry() && self.mode.allows_tone_retry() && !question.retry {
      let outcome = AnswerOutcome {
        result,
        correct: false,
        retry: true,
        expected,
        card_complete: false,
        reached_milestone: false,
      };
      self.phase = SessionPhase::Presenting(Question {
        retry: true,
        near_miss: Some((answer.trim().to_string(), outcome.clone())),
        ..question
      });
      return Ok(outcome);
    }

    let correct = result.is_correct();
    let mut card_complete = false;
    let mut reached_milestone = false;

    if correct {
      let other_ok = match question.question_type {
        QuestionType::Meaning => card.pronunciation_ok,
        QuestionType::Pronunciation => card.meaning_ok,
      };
      card_complete = other_ok;
      if card_complete && !card.resolved && self.mode == SessionMode::Review {
        reached_milestone = backend.submit_answer(card.item.id, true, now)?;
      }
    }

    let item_id = card.item.id;
    let mode = self.mode;
    let card = &mut self.cards[question.card];
    card.answered = true;
    *card.flag_mut(question.question_type) = correct;
    if correct {
      self.successful_answers += 1;
      if card_complete && mode != SessionMode::InitialStudy {
        card.resolved = true;
      }
    } else {
      card.ever_incorrect = true;
      self.queue.push_back((question.card, question.question_type));
    }
    if reached_milestone {
      self.milestones.push(item_id);
    }

    backend
      .record_practice(&PracticeRecord {
        item_id,
        mode,
        question_type: question.question_type,
        user_answer: answer.to_string(),
        is_correct: correct,
        practiced_at: now,
      })
      .log_warn("Failed to record practice");

    let outcome = AnswerOutcome {
      result,
      correct,
      retry: false,
      expected,
      card_complete,
      reached_milestone,
    };
    self.phase = SessionPhase::Feedback {
      question,
      outcome: outcome.clone(),
    };
    Ok(outcome)
  }

  /// Move past the feedback to the next question.
  pub fn advance(&mut self) -> Result<&SessionPhase, SessionError> {
    match &self.phase {
      SessionPhase::Feedback { .. } => {}
      SessionPhase::Exhausted | SessionPhase::Complete(_) => return Ok(&self.phase),
      other => return Err(SessionError::WrongPhase(other.name(), "advance")),
    }
    self.present_next();
    Ok(&self.phase)
  }

  /// End the session, reconciling every card not yet handed to the scheduler.
  ///
  /// Finishing twice returns the same summary. If a scheduler write fails the
  /// session stays open and cards not yet written can be retried.
  pub fn finish(&mut self, backend: &impl StudyBackend, now: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
    if let SessionPhase::Complete(summary) = &self.phase {
      return Ok(summary.clone());
    }
    let exited_early = !matches!(self.phase, SessionPhase::Exhausted | SessionPhase::Loading);

    match self.mode {
      SessionMode::Review => {
        for index in 0..self.cards.len() {
          let card = &self.cards[index];
          if card.resolved || !card.answered {
            continue;
          }
          let item_id = card.item.id;
          if backend.submit_answer(item_id, card.is_complete(), now)? {
            self.milestones.push(item_id);
          }
          self.cards[index].resolved = true;
        }
      }
      SessionMode::InitialStudy => {
        let (complete, incomplete): (Vec<usize>, Vec<usize>) = (0..self.cards.len())
          .filter(|&i| !self.cards[i].resolved)
          .partition(|&i| self.cards[i].is_complete());

        let complete_ids: Vec<i64> = complete.iter().map(|&i| self.cards[i].item.id).collect();
        let incomplete_ids: Vec<i64> = incomplete.iter().map(|&i| self.cards[i].item.id).collect();
        if !complete.is_empty() {
          backend.complete_initial_study(&complete_ids, now)?;
          for &i in &complete {
            self.cards[i].resolved = true;
          }
        }
        if !incomplete.is_empty() {
          backend.mark_reviewable(&incomplete_ids, now)?;
          for &i in &incomplete {
            self.cards[i].resolved = true;
          }
        }
      }
      SessionMode::SelfStudy => {}
    }

    let summary = self.summary(exited_early);
    tracing::info!(
      mode = self.mode.as_str(),
      completed = summary.cards_completed,
      total = summary.total_cards,
      early = exited_early,
      "session finished"
    );
    self.phase = SessionPhase::Complete(summary.clone());
    Ok(summary)
  }

  fn summary(&self, exited_early: bool) -> SessionSummary {
    SessionSummary {
      mode: Some(self.mode),
      total_cards: self.cards.len(),
      cards_completed: self.cards.iter().filter(|c| c.is_complete()).count(),
      cards_correct: self
        .cards
        .iter()
        .filter(|c| c.is_complete() && !c.ever_incorrect)
        .count(),
      cards_incorrect: self.cards.iter().filter(|c| c.ever_incorrect).count(),
      successful_answers: self.successful_answers,
      milestones: self.milestones.clone(),
      exited_early,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use std::cell::{Cell, RefCell};

  #[derive(Default)]
  struct FakeBackend {
    submitted: RefCell<Vec<(i64, bool)>>,
    completed: RefCell<Vec<i64>>,
    reviewable: RefCell<Vec<i64>>,
    practice: RefCell<Vec<PracticeRecord>>,
    milestone_for: Option<i64>,
    fail_submit: Cell<bool>,
    fail_practice: bool,
  }

  impl StudyBackend for FakeBackend {
    fn submit_answer(&self, item_id: i64, correct: bool, _now: DateTime<Utc>) -> Result<bool, SrsError> {
      if self.fail_submit.get() {
        return Err(SrsError::NotIntroduced(item_id));
      }
      self.submitted.borrow_mut().push((item_id, correct));
      Ok(self.milestone_for == Some(item_id))
    }

    fn complete_initial_study(&self, item_ids: &[i64], _now: DateTime<Utc>) -> Result<(), SrsError> {
      self.completed.borrow_mut().extend_from_slice(item_ids);
      Ok(())
    }

    fn mark_reviewable(&self, item_ids: &[i64], _now: DateTime<Utc>) -> Result<(), SrsError> {
      self.reviewable.borrow_mut().extend_from_slice(item_ids);
      Ok(())
    }

    fn record_practice(&self, record: &PracticeRecord) -> Result<(), SrsError> {
      if self.fail_practice {
        return Err(SrsError::UnknownItem(record.item_id));
      }
      self.practice.borrow_mut().push(record.clone());
      Ok(())
    }
  }

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  fn item(id: i64, character: &str, pinyin: &str, definition: &str) -> LearningItem {
    LearningItem {
      id,
      character: character.into(),
      pinyin: pinyin.into(),
      definition: definition.into(),
      frequency_rank: id,
      introduction_score: None,
    }
  }

  fn items() -> Vec<LearningItem> {
    vec![
      item(1, "人", "rén", "person; people"),
      item(2, "大", "dà", "big; large"),
    ]
  }

  fn loaded(mode: SessionMode) -> SessionRunner {
    let mut runner = SessionRunner::new(mode);
    runner.load(items(), &mut StdRng::seed_from_u64(7)).unwrap();
    runner
  }

  fn presented(runner: &SessionRunner) -> Question {
    match runner.current() {
      SessionPhase::Presenting(q) => q.clone(),
      other => panic!("expected a question, got {}", other.name()),
    }
  }

  fn right_answer(q: &Question) -> String {
    match q.question_type {
      QuestionType::Meaning => q.item.definition.split(';').next().unwrap().to_string(),
      QuestionType::Pronunciation => validation::convert_tone_marks_to_numbers(&q.item.pinyin),
    }
  }

  /// Answer the presented question and move on.
  fn answer(runner: &mut SessionRunner, backend: &FakeBackend, correct: bool) -> AnswerOutcome {
    let q = presented(runner);
    let text = if correct { right_answer(&q) } else { "zzz".to_string() };
    let outcome = runner.submit_answer(&text, backend, now()).unwrap();
    runner.advance().unwrap();
    outcome
  }

  #[test]
  fn test_both_types_asked_per_card() {
    let runner = loaded(SessionMode::Review);
    let first = presented(&runner);
    assert_eq!(first.item.id, 1);
    let types: Vec<_> = runner.queue.iter().map(|(c, t)| (*c, *t)).collect();
    assert_eq!(types[0].0, 0);
    assert_ne!(types[0].1, first.question_type);
    assert_eq!(runner.progress(), (0, 2));
  }

  #[test]
  fn test_empty_load_completes() {
    let mut runner = SessionRunner::new(SessionMode::Review);
    runner.load(Vec::new(), &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(matches!(runner.current(), SessionPhase::Complete(s) if s.total_cards == 0));
  }

  #[test]
  fn test_load_twice_is_rejected() {
    let mut runner = loaded(SessionMode::Review);
    let err = runner.load(items(), &mut StdRng::seed_from_u64(1));
    assert!(matches!(err, Err(SessionError::WrongPhase("presenting", _))));
  }

  #[test]
  fn test_review_submits_on_second_correct_answer() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::Review);

    let first = answer(&mut runner, &backend, true);
    assert!(first.correct && !first.card_complete);
    assert!(backend.submitted.borrow().is_empty());

    let second = answer(&mut runner, &backend, true);
    assert!(second.card_complete);
    assert_eq!(*backend.submitted.borrow(), vec![(1, true)]);
    assert_eq!(backend.practice.borrow().len(), 2);
  }

  #[test]
  fn test_incorrect_question_is_requeued() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::Review);

    let missed = presented(&runner);
    let outcome = answer(&mut runner, &backend, false);
    assert!(!outcome.correct);
    assert_eq!(runner.queue.back(), Some(&(missed.card, missed.question_type)));

    // Work through the rest of the queue answering correctly
    while matches!(runner.current(), SessionPhase::Presenting(_)) {
      answer(&mut runner, &backend, true);
    }
    assert!(matches!(runner.current(), SessionPhase::Exhausted));

    let summary = runner.finish(&backend, now()).unwrap();
    assert_eq!(summary.cards_completed, 2);
    assert_eq!(summary.cards_correct, 1);
    assert_eq!(summary.cards_incorrect, 1);
    assert_eq!(summary.successful_answers, 4);
    assert!(!summary.exited_early);
    // Each card handed to the scheduler exactly once
    assert_eq!(*backend.submitted.borrow(), vec![(2, true), (1, true)]);
  }

  #[test]
  fn test_wrong_tones_earn_one_unscored_retry() {
    let backend = FakeBackend::default();
    let mut runner = SessionRunner::new(SessionMode::Review);
    runner
      .load(vec![item(1, "人", "rén", "person")], &mut StdRng::seed_from_u64(3))
      .unwrap();
    if presented(&runner).question_type == QuestionType::Meaning {
      answer(&mut runner, &backend, true);
    }

    let retry = runner.submit_answer("ren4", &backend, now()).unwrap();
    assert!(retry.retry);
    assert_eq!(retry.result, AnswerResult::WrongTones);
    assert!(presented(&runner).retry);
    let logged_before = backend.practice.borrow().len();

    let second = runner.submit_answer("ren3", &backend, now()).unwrap();
    assert!(!second.retry);
    assert!(!second.correct);
    assert_eq!(backend.practice.borrow().len(), logged_before + 1);
  }

  #[test]
  fn test_repeated_near_miss_keeps_the_retry() {
    let backend = FakeBackend::default();
    let mut runner = SessionRunner::new(SessionMode::Review);
    runner
      .load(vec![item(1, "人", "rén", "person")], &mut StdRng::seed_from_u64(3))
      .unwrap();
    if presented(&runner).question_type == QuestionType::Meaning {
      answer(&mut runner, &backend, true);
    }
    let logged_before = backend.practice.borrow().len();

    let first = runner.submit_answer("ren4", &backend, now()).unwrap();
    let again = runner.submit_answer(" ren4 ", &backend, now()).unwrap();
    assert_eq!(first, again);
    assert!(again.retry);
    assert!(presented(&runner).retry);
    assert_eq!(backend.practice.borrow().len(), logged_before);

    let fixed = runner.submit_answer("ren2", &backend, now()).unwrap();
    assert!(fixed.correct);
    assert!(fixed.card_complete);
    assert_eq!(backend.practice.borrow().len(), logged_before + 1);
    assert_eq!(*backend.submitted.borrow(), vec![(1, true)]);
  }

  #[test]
  fn test_single_card_missed_once_is_scheduled_correct_but_counted_incorrect() {
    let backend = FakeBackend::default();
    let mut runner = (0..64)
      .map(|seed| {
        let mut r = SessionRunner::new(SessionMode::Review);
        r.load(vec![item(1, "人", "rén", "person")], &mut StdRng::seed_from_u64(seed))
          .unwrap();
        r
      })
      .find(|r| presented(r).question_type == QuestionType::Meaning)
      .unwrap();

    assert!(answer(&mut runner, &backend, true).correct);
    let missed = answer(&mut runner, &backend, false);
    assert!(!missed.correct && !missed.retry);
    assert_eq!(presented(&runner).question_type, QuestionType::Pronunciation);
    assert!(answer(&mut runner, &backend, true).card_complete);
    assert!(matches!(runner.current(), SessionPhase::Exhausted));

    let summary = runner.finish(&backend, now()).unwrap();
    assert_eq!(summary.cards_correct, 0);
    assert_eq!(summary.cards_incorrect, 1);
    assert_eq!(*backend.submitted.borrow(), vec![(1, true)]);
  }

  #[test]
  fn test_self_study_has_no_tone_retry() {
    let backend = FakeBackend::default();
    let mut runner = SessionRunner::new(SessionMode::SelfStudy);
    runner
      .load(vec![item(1, "人", "rén", "person")], &mut StdRng::seed_from_u64(3))
      .unwrap();
    if presented(&runner).question_type == QuestionType::Meaning {
      answer(&mut runner, &backend, true);
    }
    let outcome = runner.submit_answer("ren4", &backend, now()).unwrap();
    assert!(!outcome.retry);
    assert!(!outcome.correct);
  }

  #[test]
  fn test_resubmit_during_feedback_returns_same_outcome() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::Review);
    let q = presented(&runner);
    let first = runner.submit_answer(&right_answer(&q), &backend, now()).unwrap();
    let again = runner.submit_answer("zzz", &backend, now()).unwrap();
    assert_eq!(first, again);
    assert_eq!(backend.practice.borrow().len(), 1);
  }

  #[test]
  fn test_advance_requires_feedback() {
    let mut runner = loaded(SessionMode::Review);
    assert!(matches!(runner.advance(), Err(SessionError::WrongPhase("presenting", _))));
  }

  #[test]
  fn test_review_early_exit_penalizes_answered_cards_only() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::Review);
    answer(&mut runner, &backend, true);

    let summary = runner.finish(&backend, now()).unwrap();
    assert!(summary.exited_early);
    // Card 1 half done is submitted as incorrect, card 2 never answered is untouched
    assert_eq!(*backend.submitted.borrow(), vec![(1, false)]);

    let again = runner.finish(&backend, now()).unwrap();
    assert_eq!(summary, again);
    assert_eq!(backend.submitted.borrow().len(), 1);
  }

  #[test]
  fn test_initial_study_batches_submission() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::InitialStudy);
    answer(&mut runner, &backend, true);
    answer(&mut runner, &backend, true);
    assert!(backend.submitted.borrow().is_empty());

    runner.finish(&backend, now()).unwrap();
    assert_eq!(*backend.completed.borrow(), vec![1]);
    assert_eq!(*backend.reviewable.borrow(), vec![2]);
    assert!(backend.submitted.borrow().is_empty());
  }

  /// Card 1 fully answered, card 2 answered only for its meaning.
  fn one_done_one_meaning_only(mode: SessionMode, backend: &FakeBackend) -> SessionRunner {
    let mut runner = (0..64)
      .map(|seed| {
        let mut r = SessionRunner::new(mode);
        r.load(items(), &mut StdRng::seed_from_u64(seed)).unwrap();
        r
      })
      .find(|r| r.queue.get(1) == Some(&(1, QuestionType::Meaning)))
      .unwrap();
    for _ in 0..3 {
      assert!(answer(&mut runner, backend, true).correct);
    }
    runner
  }

  #[test]
  fn test_early_exit_with_half_done_card_follows_mode() {
    let backend = FakeBackend::default();
    let mut runner = one_done_one_meaning_only(SessionMode::InitialStudy, &backend);
    let summary = runner.finish(&backend, now()).unwrap();
    assert!(summary.exited_early);
    assert_eq!(*backend.completed.borrow(), vec![1]);
    assert_eq!(*backend.reviewable.borrow(), vec![2]);
    assert!(backend.submitted.borrow().is_empty());

    let backend = FakeBackend::default();
    let mut runner = one_done_one_meaning_only(SessionMode::Review, &backend);
    assert_eq!(*backend.submitted.borrow(), vec![(1, true)]);
    runner.finish(&backend, now()).unwrap();
    assert_eq!(*backend.submitted.borrow(), vec![(1, true), (2, false)]);
  }

  #[test]
  fn test_self_study_never_schedules() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::SelfStudy);
    while matches!(runner.current(), SessionPhase::Presenting(_)) {
      answer(&mut runner, &backend, true);
    }
    let summary = runner.finish(&backend, now()).unwrap();
    assert_eq!(summary.cards_correct, 2);
    assert!(backend.submitted.borrow().is_empty());
    assert!(backend.completed.borrow().is_empty());
    assert_eq!(backend.practice.borrow().len(), 4);
  }

  #[test]
  fn test_milestones_collected() {
    let backend = FakeBackend {
      milestone_for: Some(1),
      ..Default::default()
    };
    let mut runner = loaded(SessionMode::Review);
    answer(&mut runner, &backend, true);
    let outcome = answer(&mut runner, &backend, true);
    assert!(outcome.reached_milestone);
    let summary = runner.finish(&backend, now()).unwrap();
    assert_eq!(summary.milestones, vec![1]);
  }

  #[test]
  fn test_practice_failures_are_swallowed() {
    let backend = FakeBackend {
      fail_practice: true,
      ..Default::default()
    };
    let mut runner = loaded(SessionMode::Review);
    let outcome = answer(&mut runner, &backend, true);
    assert!(outcome.correct);
  }

  #[test]
  fn test_failed_reconciliation_is_retryable() {
    let backend = FakeBackend::default();
    let mut runner = loaded(SessionMode::Review);
    answer(&mut runner, &backend, false);

    backend.fail_submit.set(true);
    assert!(runner.finish(&backend, now()).is_err());
    assert!(!matches!(runner.current(), SessionPhase::Complete(_)));

    backend.fail_submit.set(false);
    runner.finish(&backend, now()).unwrap();
    assert_eq!(*backend.submitted.borrow(), vec![(1, false)]);
  }
}
