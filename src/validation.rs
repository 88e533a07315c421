//! Answer verification for pronunciation (pinyin) and meaning questions.
//!
//! Pinyin is compared in tone-number form (`xue2xi2`) so that tone marks,
//! tone digits and spacing differences all normalize to the same string.
//! Meanings are compared by keyword containment against the reference gloss.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::domain::QuestionType;

// ============================================================================
// Tables
// ============================================================================

/// Marked vowel -> (base letter, tone). `ü` is written `v` in numbered form.
static TONE_MARKS: &[(char, char, u8)] = &[
  ('ā', 'a', 1), ('á', 'a', 2), ('ǎ', 'a', 3), ('à', 'a', 4),
  ('ē', 'e', 1), ('é', 'e', 2), ('ě', 'e', 3), ('è', 'e', 4),
  ('ī', 'i', 1), ('í', 'i', 2), ('ǐ', 'i', 3), ('ì', 'i', 4),
  ('ō', 'o', 1), ('ó', 'o', 2), ('ǒ', 'o', 3), ('ò', 'o', 4),
  ('ū', 'u', 1), ('ú', 'u', 2), ('ǔ', 'u', 3), ('ù', 'u', 4),
  ('ǖ', 'v', 1), ('ǘ', 'v', 2), ('ǚ', 'v', 3), ('ǜ', 'v', 4),
];

static STOP_WORDS: &[&str] = &["a", "an", "the", "to", "of", "in", "on", "at", "for", "with", "by"];

static KEYWORD_SPLIT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[;,]|\s+or\s+").expect("keyword split pattern is valid"));

static PARENTHETICAL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("parenthetical pattern is valid"));

static BRACKETED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket pattern is valid"));

fn tone_of(c: char) -> Option<(char, u8)> {
  TONE_MARKS
    .iter()
    .find(|(marked, _, _)| *marked == c)
    .map(|(_, base, tone)| (*base, *tone))
}

fn marked(base: char, tone: u8) -> char {
  TONE_MARKS
    .iter()
    .find(|(_, b, t)| *b == base && *t == tone)
    .map(|(m, _, _)| *m)
    .unwrap_or(base)
}

fn is_plain_vowel(c: char) -> bool {
  matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'v' | 'ü')
}

fn is_consonant(c: char) -> bool {
  c.is_ascii_lowercase() && !is_plain_vowel(c)
}

fn prepare(input: &str) -> String {
  input.nfc().collect::<String>().to_lowercase()
}

// ============================================================================
// Result types
// ============================================================================

/// Outcome of checking one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResult {
  Correct,
  /// Syllables right, tones wrong
  WrongTones,
  Incorrect,
}

impl AnswerResult {
  pub fn is_correct(&self) -> bool {
    matches!(self, Self::Correct)
  }

  /// Whether the learner may try again without being scored
  pub fn allows_retry(&self) -> bool {
    matches!(self, Self::WrongTones)
  }
}

// ============================================================================
// Tone conversion
// ============================================================================

/// Syllable being assembled by [`convert_tone_marks_to_numbers`].
#[derive(Default)]
struct Syllable {
  letters: String,
  tone: Option<u8>,
}

impl Syllable {
  fn has_vowel(&self) -> bool {
    self.letters.chars().any(is_plain_vowel)
  }

  fn ends_with_consonant(&self) -> bool {
    self.letters.chars().last().is_some_and(is_consonant)
  }

  fn flush(&mut self, out: &mut String) {
    if self.letters.is_empty() {
      self.tone = None;
      return;
    }
    out.push_str(&self.letters);
    if self.has_vowel() {
      out.push(char::from(b'0' + self.tone.unwrap_or(5)));
    }
    self.letters.clear();
    self.tone = None;
  }

  /// Trailing consonants that open the next syllable (`zh`, `ch`, `sh` stay together).
  fn take_onset(&mut self) -> String {
    let run: String = self
      .letters
      .chars()
      .rev()
      .take_while(|c| is_consonant(*c))
      .collect::<Vec<_>>()
      .into_iter()
      .rev()
      .collect();
    let onset_len = if run.len() >= 2 && ["zh", "ch", "sh"].iter().any(|d| run.ends_with(d)) {
      2
    } else {
      1
    };
    let split = self.letters.len() - onset_len;
    self.letters.split_off(split)
  }
}

/// Convert tone-marked pinyin to tone-number form: `xué xí` -> `xue2xi2`.
///
/// Output is lower-case with spaces removed. Vowel-bearing syllables without
/// a mark or digit get the neutral tone `5`; `ü` becomes `v`.
pub fn convert_tone_marks_to_numbers(input: &str) -> String {
  let text = prepare(input);
  let mut out = String::with_capacity(text.len() + 4);
  let mut current = Syllable::default();

  for c in text.chars() {
    let vowel = if let Some((base, tone)) = tone_of(c) {
      Some((base, Some(tone)))
    } else if is_plain_vowel(c) {
      Some((if c == 'ü' { 'v' } else { c }, None))
    } else {
      None
    };

    if let Some((base, tone)) = vowel {
      if current.has_vowel() {
        if current.ends_with_consonant() {
          let onset = current.take_onset();
          current.flush(&mut out);
          current.letters = onset;
        } else if tone.is_some() && current.tone.is_some() {
          current.flush(&mut out);
        }
      }
      current.letters.push(base);
      if tone.is_some() {
        current.tone = tone;
      }
    } else if ('1'..='5').contains(&c) {
      if current.has_vowel() {
        current.tone = c.to_digit(10).map(|d| d as u8);
        current.flush(&mut out);
      }
    } else if is_consonant(c) {
      let after_vowel = current.letters.chars().last().is_some_and(is_plain_vowel);
      if after_vowel && c != 'n' && c != 'g' {
        current.flush(&mut out);
      }
      current.letters.push(c);
    } else {
      current.flush(&mut out);
      if !c.is_whitespace() && !c.is_ascii() {
        out.push(c);
      }
    }
  }
  current.flush(&mut out);
  out
}

/// Place a tone mark on the right vowel of a syllable's vowel cluster.
fn mark_vowels(vowels: &str, tone: u8) -> String {
  let chars: Vec<char> = vowels.chars().collect();
  let target = if let Some(i) = chars.iter().position(|c| *c == 'a') {
    Some(i)
  } else if let Some(i) = chars.iter().position(|c| *c == 'o') {
    Some(i)
  } else if let Some(i) = chars.iter().position(|c| *c == 'e') {
    Some(i)
  } else if let Some(i) = chars.windows(2).position(|w| w == ['i', 'u'] || w == ['u', 'i']) {
    Some(i + 1)
  } else {
    ['i', 'u', 'v', 'ü'].iter().find_map(|v| chars.iter().position(|c| c == v))
  };

  chars
    .iter()
    .enumerate()
    .map(|(i, c)| {
      let c = if *c == 'v' { 'ü' } else { *c };
      if Some(i) == target && (1..=4).contains(&tone) {
        marked(if c == 'ü' { 'v' } else { c }, tone)
      } else {
        c
      }
    })
    .collect()
}

/// Match `consonants vowels consonants digits` at `start`.
fn match_numbered_syllable(chars: &[char], start: usize) -> Option<(usize, String)> {
  let n = chars.len();
  let mut j = start;
  while j < n && is_consonant(chars[j]) {
    j += 1;
  }
  let vowel_start = j;
  while j < n && is_plain_vowel(chars[j]) {
    j += 1;
  }
  if j == vowel_start {
    return None;
  }
  let vowel_end = j;
  while j < n && is_consonant(chars[j]) {
    j += 1;
  }
  let digit_start = j;
  while j < n && ('1'..='5').contains(&chars[j]) {
    j += 1;
  }
  if j == digit_start {
    return None;
  }

  let tone = chars[j - 1].to_digit(10).map(|d| d as u8).unwrap_or(5);
  let onset: String = chars[start..vowel_start].iter().collect();
  let vowels: String = chars[vowel_start..vowel_end].iter().collect();
  let coda: String = chars[vowel_end..digit_start].iter().collect();
  Some((j - start, format!("{}{}{}", onset, mark_vowels(&vowels, tone), coda)))
}

/// Convert tone-number pinyin to tone marks for display: `ni3hao3` -> `nǐhǎo`.
///
/// Works syllable by syllable. A syllable that already carries a mark is
/// never re-marked by a stray trailing digit, and unnumbered syllables are
/// left unmarked. Tone `5` is neutral and produces no mark.
pub fn convert_tone_numbers_to_marks(input: &str) -> String {
  let chars: Vec<char> = prepare(input).chars().collect();
  let mut out = String::with_capacity(chars.len());
  let mut in_marked_syllable = false;
  let mut i = 0;

  while i < chars.len() {
    if !in_marked_syllable {
      if let Some((len, syllable)) = match_numbered_syllable(&chars, i) {
        out.push_str(&syllable);
        i += len;
        continue;
      }
    }

    let c = chars[i];
    if tone_of(c).is_some() {
      in_marked_syllable = true;
    } else if !is_plain_vowel(c) && !('1'..='5').contains(&c) && c != 'n' && c != 'g' {
      in_marked_syllable = false;
    }

    if !('1'..='5').contains(&c) {
      out.push(c);
    }
    i += 1;
  }
  out
}

/// Canonical comparison form of a pinyin answer.
pub fn normalize_pinyin(input: &str) -> String {
  convert_tone_marks_to_numbers(input.trim())
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect()
}

/// Pinyin with all tone information removed: `xué xí` -> `xuexi`.
pub fn remove_tones(input: &str) -> String {
  normalize_pinyin(input)
    .chars()
    .filter(|c| !c.is_ascii_digit())
    .collect()
}

/// Whether the answer carries any tone marks or tone digits.
pub fn has_tone_info(input: &str) -> bool {
  prepare(input)
    .chars()
    .any(|c| tone_of(c).is_some() || ('1'..='5').contains(&c))
}

fn reference_candidates(reference: &str) -> impl Iterator<Item = &str> {
  reference.split([';', '/']).map(str::trim).filter(|s| !s.is_empty())
}

/// Check a pinyin answer against a reference that may list alternatives
/// separated by `;` or `/`.
///
/// Answers typed without any tone information are compared on syllables only.
pub fn verify_pinyin(user: &str, reference: &str) -> bool {
  let normalized = normalize_pinyin(user);
  if normalized.is_empty() {
    return false;
  }

  if has_tone_info(user) {
    reference_candidates(reference).any(|c| normalize_pinyin(c) == normalized)
  } else {
    let toneless = remove_tones(user);
    reference_candidates(reference).any(|c| remove_tones(c) == toneless)
  }
}

/// Syllables match some reference candidate but the tones do not.
pub fn has_correct_syllables_but_wrong_tones(user: &str, reference: &str) -> bool {
  if !has_tone_info(user) || verify_pinyin(user, reference) {
    return false;
  }
  let toneless = remove_tones(user);
  !toneless.is_empty() && reference_candidates(reference).any(|c| remove_tones(c) == toneless)
}

// ============================================================================
// Definitions
// ============================================================================

/// Keyword phrases and words from a gloss such as `to study; to learn (formal)`.
pub fn extract_keywords(definition: &str) -> Vec<String> {
  let lowered = definition.to_lowercase();
  let mut keywords: Vec<String> = Vec::new();

  for part in KEYWORD_SPLIT.split(&lowered) {
    let stripped = PARENTHETICAL.replace_all(part, "");
    let mut phrase = stripped.trim().to_string();

    if phrase.is_empty() {
      // Nothing outside the parentheses: use their content, minus bracketed pinyin
      let inner: Vec<String> = PARENTHETICAL
        .captures_iter(part)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
      phrase = BRACKETED.replace_all(&inner.join(" "), "").trim().to_string();
    }
    if phrase.is_empty() {
      continue;
    }

    push_unique(&mut keywords, &phrase);
    for word in phrase.split_whitespace() {
      if !STOP_WORDS.contains(&word) {
        push_unique(&mut keywords, word);
      }
    }
  }
  keywords
}

fn push_unique(keywords: &mut Vec<String>, keyword: &str) {
  if !keyword.is_empty() && !keywords.iter().any(|k| k == keyword) {
    keywords.push(keyword.to_string());
  }
}

/// Bidirectional keyword containment. Empty answers are never correct.
pub fn verify_definition(user: &str, reference: &str) -> bool {
  let answer = user.trim().to_lowercase();
  if answer.is_empty() {
    return false;
  }
  extract_keywords(reference)
    .iter()
    .any(|k| k.contains(&answer) || answer.contains(k.as_str()))
}

// ============================================================================
// Entry points
// ============================================================================

pub fn verify_answer(user: &str, reference: &str, question: QuestionType) -> bool {
  match question {
    QuestionType::Pronunciation => verify_pinyin(user, reference),
    QuestionType::Meaning => verify_definition(user, reference),
  }
}

/// Verify and classify an answer, detecting wrong-tone near misses.
pub fn check_answer(user: &str, reference: &str, question: QuestionType) -> AnswerResult {
  let result = if verify_answer(user, reference, question) {
    AnswerResult::Correct
  } else if question == QuestionType::Pronunciation
    && has_correct_syllables_but_wrong_tones(user, reference)
  {
    AnswerResult::WrongTones
  } else {
    AnswerResult::Incorrect
  };
  tracing::debug!(?question, ?result, user, reference, "checked answer");
  result
}

// ============================================================================
// Free-text matching
// ============================================================================

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_free_text(s: &str) -> String {
  s.split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Typo-tolerant comparison for self-testing network sides.
pub fn fuzzy_match(user: &str, correct: &str) -> bool {
  let user = normalize_free_text(user);
  let correct = normalize_free_text(correct);
  if user.is_empty() {
    return false;
  }
  user == correct || levenshtein_distance(&user, &correct) <= 2
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a_chars: Vec<char> = a.chars().collect();
  let b_chars: Vec<char> = b.chars().collect();
  if a_chars.is_empty() {
    return b_chars.len();
  }
  if b_chars.is_empty() {
    return a_chars.len();
  }

  let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
  let mut current = vec![0usize; b_chars.len() + 1];

  for (i, ca) in a_chars.iter().enumerate() {
    current[0] = i + 1;
    for (j, cb) in b_chars.iter().enumerate() {
      let cost = usize::from(ca != cb);
      current[j + 1] = (previous[j + 1] + 1)
        .min(current[j] + 1)
        .min(previous[j] + cost);
    }
    std::mem::swap(&mut previous, &mut current);
  }
  previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
  use super::*;

  // ==================== Tone conversion ====================

  #[test]
  fn test_marks_to_numbers() {
    assert_eq!(convert_tone_marks_to_numbers("xué xí"), "xue2xi2");
    assert_eq!(convert_tone_marks_to_numbers("xuéxí"), "xue2xi2");
    assert_eq!(convert_tone_marks_to_numbers("nǐ hǎo"), "ni3hao3");
    assert_eq!(convert_tone_marks_to_numbers("lǜ"), "lv4");
    assert_eq!(convert_tone_marks_to_numbers("Zhōngguó"), "zhong1guo2");
  }

  #[test]
  fn test_marks_to_numbers_neutral_tone() {
    assert_eq!(convert_tone_marks_to_numbers("ma"), "ma5");
    assert_eq!(convert_tone_marks_to_numbers("hǎo ma"), "hao3ma5");
    assert_eq!(convert_tone_marks_to_numbers("xuexi"), "xue5xi5");
  }

  #[test]
  fn test_marks_to_numbers_accepts_digits_and_decomposed_marks() {
    assert_eq!(convert_tone_marks_to_numbers("xue2 xi2"), "xue2xi2");
    // a + combining macron
    assert_eq!(convert_tone_marks_to_numbers("ma\u{0304}"), "ma1");
  }

  #[test]
  fn test_numbers_to_marks() {
    assert_eq!(convert_tone_numbers_to_marks("ni3 hao3"), "nǐ hǎo");
    assert_eq!(convert_tone_numbers_to_marks("xue2xi2"), "xuéxí");
    assert_eq!(convert_tone_numbers_to_marks("liu2"), "liú");
    assert_eq!(convert_tone_numbers_to_marks("gui4"), "guì");
    assert_eq!(convert_tone_numbers_to_marks("lv4"), "lǜ");
    assert_eq!(convert_tone_numbers_to_marks("nü3"), "nǚ");
    assert_eq!(convert_tone_numbers_to_marks("lü4"), "lǜ");
    assert_eq!(convert_tone_numbers_to_marks("nu\u{308}3"), "nǚ");
    assert_eq!(convert_tone_numbers_to_marks("dou1"), "dōu");
  }

  #[test]
  fn test_numbers_to_marks_neutral_and_unnumbered() {
    assert_eq!(convert_tone_numbers_to_marks("ma5"), "ma");
    // No digit: left alone
    assert_eq!(convert_tone_numbers_to_marks("nihao3"), "nihǎo");
  }

  #[test]
  fn test_numbers_to_marks_never_remarks_accented_syllable() {
    assert_eq!(convert_tone_numbers_to_marks("mā1"), "mā");
    assert_eq!(convert_tone_numbers_to_marks("mān2"), "mān");
  }

  #[test]
  fn test_round_trip_is_stable() {
    assert_eq!(convert_tone_numbers_to_marks("ma1"), "mā");
    assert_eq!(convert_tone_marks_to_numbers("mā"), "ma1");
    for input in ["xué xí", "nǐ hǎo", "Zhōngguó", "lǜ", "hǎo ma"] {
      let numbered = convert_tone_marks_to_numbers(input);
      let back = convert_tone_numbers_to_marks(&numbered);
      assert_eq!(convert_tone_marks_to_numbers(&back), numbered, "input {}", input);
    }
  }

  // ==================== Pinyin verification ====================

  #[test]
  fn test_verify_pinyin_equivalent_forms() {
    assert!(verify_answer("xué xí", "xue2 xi2", QuestionType::Pronunciation));
    assert!(verify_answer("xue2xi2", "xué xí", QuestionType::Pronunciation));
    assert!(verify_answer("XUÉ XÍ", "xué xí", QuestionType::Pronunciation));
  }

  #[test]
  fn test_verify_pinyin_without_tones() {
    assert!(verify_answer("xuexi", "xué xí", QuestionType::Pronunciation));
    assert!(!verify_answer("xuexu", "xué xí", QuestionType::Pronunciation));
  }

  #[test]
  fn test_verify_pinyin_alternatives() {
    assert!(verify_pinyin("hang2", "xíng; háng"));
    assert!(verify_pinyin("xing2", "xíng/háng"));
    assert!(!verify_pinyin("hang4", "xíng; háng"));
  }

  #[test]
  fn test_verify_pinyin_rejects_empty_and_malformed() {
    assert!(!verify_pinyin("", "xué"));
    assert!(!verify_pinyin("   ", "xué"));
    assert!(!verify_pinyin("xue2", ""));
    assert!(!verify_pinyin("xue2", ";/;"));
  }

  #[test]
  fn test_wrong_tones_detection() {
    assert!(has_correct_syllables_but_wrong_tones("xue4 xi2", "xué xí"));
    assert!(!has_correct_syllables_but_wrong_tones("xue2 xi2", "xué xí"));
    assert!(!has_correct_syllables_but_wrong_tones("hao3", "xué xí"));
    // No tone info is a syllable-only answer, already accepted
    assert!(!has_correct_syllables_but_wrong_tones("xuexi", "xué xí"));
  }

  #[test]
  fn test_check_answer_classification() {
    assert_eq!(check_answer("xué xí", "xué xí", QuestionType::Pronunciation), AnswerResult::Correct);
    assert_eq!(check_answer("xuè xí", "xué xí", QuestionType::Pronunciation), AnswerResult::WrongTones);
    assert_eq!(check_answer("hǎo", "xué xí", QuestionType::Pronunciation), AnswerResult::Incorrect);
    // Meaning questions never earn a tone retry
    assert_eq!(check_answer("xuè xí", "to study", QuestionType::Meaning), AnswerResult::Incorrect);
  }

  // ==================== Definitions ====================

  #[test]
  fn test_extract_keywords() {
    let keywords = extract_keywords("to study; to learn");
    assert_eq!(keywords, vec!["to study", "study", "to learn", "learn"]);
  }

  #[test]
  fn test_extract_keywords_or_and_parentheses() {
    let keywords = extract_keywords("good (adj.) or well, fine");
    assert_eq!(keywords, vec!["good", "well", "fine"]);
  }

  #[test]
  fn test_extract_keywords_parenthetical_fallback() {
    let keywords = extract_keywords("(particle [ma5] for questions)");
    assert_eq!(keywords, vec!["particle  for questions", "particle", "questions"]);
  }

  #[test]
  fn test_verify_definition() {
    assert!(verify_answer("study", "to study; to learn", QuestionType::Meaning));
    assert!(verify_answer("  To Learn ", "to study; to learn", QuestionType::Meaning));
    assert!(verify_answer("studying", "to study; to learn", QuestionType::Meaning));
    assert!(!verify_answer("eat", "to study; to learn", QuestionType::Meaning));
    assert!(!verify_answer("", "anything", QuestionType::Meaning));
    assert!(!verify_answer("study", "", QuestionType::Meaning));
  }

  // ==================== Free text ====================

  #[test]
  fn test_fuzzy_match() {
    assert!(fuzzy_match("Hello  World", "hello world"));
    assert!(fuzzy_match("helo world", "hello world"));
    assert!(fuzzy_match("hell wrld", "hello world"));
    assert!(!fuzzy_match("goodbye", "hello world"));
    assert!(!fuzzy_match("", "ab"));
  }

  #[test]
  fn test_levenshtein_distance() {
    assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    assert_eq!(levenshtein_distance("", "abc"), 3);
    assert_eq!(levenshtein_distance("same", "same"), 0);
  }
}
