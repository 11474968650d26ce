//! Caption data model and structural validation.
//!
//! Caption documents come from an external generator and are untrusted.
//! [`validate_captions`] checks the basic schema only: a top-level array of
//! phrases, each with numeric `start`/`end` and a `words` array, each word
//! with a string `text` and numeric `start`/`end`. Timing relationships
//! (ordering, words inside their phrase, phrase length) are requested from
//! the generator but never enforced here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CaptionError;

/// A single word with its own timing, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    #[must_use]
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Length of the word's interval, never negative.
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A caption phrase: the unit of display for phrase-level animations.
///
/// Phrase bounds and word bounds are independently authoritative; nothing
/// assumes `start == words[0].start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub start: f64,
    pub end: f64,
    pub words: Vec<Word>,
}

impl Caption {
    #[must_use]
    pub fn new(start: f64, end: f64, words: Vec<Word>) -> Self {
        Self { start, end, words }
    }

    /// Closed-interval containment test used for phrase lookup.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Words joined by single spaces.
    #[must_use]
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Time range as shown in the results list, e.g. `0.50s - 3.00s`.
    #[must_use]
    pub fn time_range(&self) -> String {
        format!("{:.2}s - {:.2}s", self.start, self.end)
    }
}

/// Parse and validate a caption document from JSON text.
pub fn parse_captions(json: &str) -> Result<Vec<Caption>, CaptionError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| CaptionError::Syntax(e.to_string()))?;
    validate_captions(&value)
}

/// Validate an already-parsed JSON value against the caption schema.
///
/// Any structural deviation is a hard failure; there are no partial results.
pub fn validate_captions(value: &Value) -> Result<Vec<Caption>, CaptionError> {
    let phrases = value
        .as_array()
        .ok_or_else(|| CaptionError::invalid("captions", "must be an array"))?;

    phrases
        .iter()
        .enumerate()
        .map(|(i, phrase)| validate_phrase(i, phrase))
        .collect()
}

fn validate_phrase(index: usize, phrase: &Value) -> Result<Caption, CaptionError> {
    let path = format!("captions[{index}]");
    if !phrase.is_object() {
        return Err(CaptionError::invalid(path, "must be an object"));
    }

    let start = number_field(phrase, &path, "start")?;
    let end = number_field(phrase, &path, "end")?;
    let words = phrase
        .get("words")
        .and_then(Value::as_array)
        .ok_or_else(|| CaptionError::invalid(format!("{path}.words"), "must be an array"))?;

    let words = words
        .iter()
        .enumerate()
        .map(|(j, word)| validate_word(&format!("{path}.words[{j}]"), word))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Caption { start, end, words })
}

fn validate_word(path: &str, word: &Value) -> Result<Word, CaptionError> {
    if !word.is_object() {
        return Err(CaptionError::invalid(path, "must be an object"));
    }

    let text = word
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| CaptionError::invalid(format!("{path}.text"), "must be a string"))?;

    Ok(Word {
        text: text.to_string(),
        start: number_field(word, path, "start")?,
        end: number_field(word, path, "end")?,
    })
}

fn number_field(object: &Value, path: &str, field: &str) -> Result<f64, CaptionError> {
    object
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| CaptionError::invalid(format!("{path}.{field}"), "must be a number"))
}
