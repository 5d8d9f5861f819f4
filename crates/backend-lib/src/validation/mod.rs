// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Validation of inbound payloads.
//!
//! Every check trims surrounding whitespace first and measures lengths in
//! characters. A successful check returns the cleaned value.

use livepoll_common::PollOptionInput;
use thiserror::Error;

use crate::config::SessionSettings;
use crate::poll::{PollDefinition, PollOption};

/// A poll needs at least this many options
pub const MIN_OPTIONS: usize = 2;

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("question cannot exceed {max} characters")]
    QuestionTooLong { max: usize },

    #[error("a poll needs at least 2 options, got {got}")]
    TooFewOptions { got: usize },

    #[error("a poll allows at most {max} options, got {got}")]
    TooManyOptions { max: usize, got: usize },

    #[error("option {index} must not be empty")]
    EmptyOption { index: usize },

    #[error("option {index} cannot exceed {max} characters")]
    OptionTooLong { index: usize, max: usize },

    #[error("exactly one option must be marked correct, found {found}")]
    CorrectOptionCount { found: usize },

    #[error("time limit must be at least 1 second")]
    ZeroTimeLimit,

    #[error("time limit cannot exceed {max} seconds, got {got}")]
    TimeLimitTooLong { got: u32, max: u32 },

    #[error("display name must not be empty")]
    EmptyDisplayName,

    #[error("display name cannot exceed {max} characters")]
    DisplayNameTooLong { max: usize },

    #[error("sender name must not be empty")]
    EmptySenderName,

    #[error("chat message must not be empty")]
    EmptyChatMessage,

    #[error("chat message cannot exceed {max} characters")]
    ChatMessageTooLong { max: usize },
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Validate a poll definition sent with `presenter.openPoll`
pub fn validate_poll(
    question: &str,
    options: &[PollOptionInput],
    time_limit_secs: Option<u32>,
    limits: &SessionSettings,
) -> ValidationResult<PollDefinition> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    if char_len(question) > limits.max_question_len {
        return Err(ValidationError::QuestionTooLong {
            max: limits.max_question_len,
        });
    }

    if options.len() < MIN_OPTIONS {
        return Err(ValidationError::TooFewOptions { got: options.len() });
    }
    if let Some(max) = limits.max_options.filter(|max| options.len() > *max) {
        return Err(ValidationError::TooManyOptions {
            max,
            got: options.len(),
        });
    }

    let mut cleaned = Vec::with_capacity(options.len());
    for (index, option) in options.iter().enumerate() {
        let text = option.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyOption { index });
        }
        if char_len(text) > limits.max_option_len {
            return Err(ValidationError::OptionTooLong {
                index,
                max: limits.max_option_len,
            });
        }
        cleaned.push(PollOption {
            text: text.to_string(),
            is_correct: option.is_correct,
        });
    }

    let found = cleaned.iter().filter(|o| o.is_correct).count();
    if found != 1 {
        return Err(ValidationError::CorrectOptionCount { found });
    }

    let time_limit_secs = time_limit_secs.unwrap_or(limits.default_time_limit_secs);
    if time_limit_secs == 0 {
        return Err(ValidationError::ZeroTimeLimit);
    }
    if let Some(max) = limits.max_time_limit_secs.filter(|max| time_limit_secs > *max) {
        return Err(ValidationError::TimeLimitTooLong {
            got: time_limit_secs,
            max,
        });
    }

    Ok(PollDefinition {
        question: question.to_string(),
        options: cleaned,
        time_limit_secs,
    })
}

/// Validate a respondent display name
pub fn validate_display_name(name: &str, limits: &SessionSettings) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyDisplayName);
    }
    if char_len(name) > limits.max_display_name_len {
        return Err(ValidationError::DisplayNameTooLong {
            max: limits.max_display_name_len,
        });
    }
    Ok(name.to_string())
}

/// Validate a chat post, returning the cleaned sender name and text
pub fn validate_chat(
    sender_name: &str,
    text: &str,
    limits: &SessionSettings,
) -> ValidationResult<(String, String)> {
    let sender_name = sender_name.trim();
    if sender_name.is_empty() {
        return Err(ValidationError::EmptySenderName);
    }
    if char_len(sender_name) > limits.max_display_name_len {
        return Err(ValidationError::DisplayNameTooLong {
            max: limits.max_display_name_len,
        });
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyChatMessage);
    }
    if char_len(text) > limits.max_chat_len {
        return Err(ValidationError::ChatMessageTooLong {
            max: limits.max_chat_len,
        });
    }

    Ok((sender_name.to_string(), text.to_string()))
}
