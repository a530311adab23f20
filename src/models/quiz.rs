use std::fmt;

use serde::{Deserialize, Serialize};

/// The two parallel quiz families. Each kind has its own quiz table, its
/// own history table and its own scoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizKind {
    Spelling,
    Pronunciation,
}

impl QuizKind {
    pub const ALL: [QuizKind; 2] = [QuizKind::Spelling, QuizKind::Pronunciation];

    pub fn table(self) -> &'static str {
        match self {
            QuizKind::Spelling => "spelling_quizzes",
            QuizKind::Pronunciation => "pronunciation_quizzes",
        }
    }

    pub fn history_table(self) -> &'static str {
        match self {
            QuizKind::Spelling => "spelling_history",
            QuizKind::Pronunciation => "pronunciation_history",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuizKind::Spelling => "Spelling",
            QuizKind::Pronunciation => "Pronunciation",
        }
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A quiz row as the CMS sees it.
#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: i32,
    pub text: String,
    pub level: i32,
    pub is_open: bool,
}

/// A quiz row joined with the calling user's history.
#[derive(Debug, Clone, Serialize)]
pub struct QuizStatus {
    pub id: i32,
    pub text: String,
    pub level: i32,
    pub is_open: bool,
    pub is_answered: bool,
    pub checker: Option<String>,
}

/// Payload of `POST /addSpelling` and `POST /addPronunciation`.
#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    pub text: String,
    pub level: i32,
}

impl CreateQuizRequest {
    /// Checks the text and level before the row is inserted.
    ///
    /// # Returns
    /// * `Err(String)` - A message suitable for a 400 response
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("Quiz text cannot be empty".to_string());
        }

        if self.text.len() > 500 {
            return Err("Quiz text cannot exceed 500 characters".to_string());
        }

        if self.level < 1 {
            return Err("Level must be a positive number".to_string());
        }

        Ok(())
    }

    /// Quiz text with surrounding whitespace removed. Case is kept because the
    /// text doubles as the grader's label.
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_string()
    }
}

/// Coarse grade derived from the scoring service's boolean verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Perfect,
    NotBad,
}

impl Grade {
    /// `true` from the grader means `Perfect`, anything else `Not Bad`.
    pub fn from_verdict(correct: bool) -> Self {
        if correct {
            Grade::Perfect
        } else {
            Grade::NotBad
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Perfect => "Perfect",
            Grade::NotBad => "Not Bad",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Body returned after a graded submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub text: String,
    pub is_answered: bool,
    pub check: Grade,
    pub is_open: bool,
}
