//! `/config` chat command parsing.
//!
//! Grammar:
//!
//! ```text
//! /config <worker> get [key]
//! /config <worker> set <key> <value...>
//! ```
//!
//! Tokens are separated by whitespace and may be wrapped in single or
//! double quotes; a backslash escapes the next character inside quotes. A
//! `set` value made of several tokens is joined with single spaces, then
//! parsed as JSON when possible and kept as a string otherwise.

use crate::envelope::{EnvelopeError, WorkerName};
use serde_json::Value;
use thiserror::Error;

/// Leading token of a configuration command.
const COMMAND: &str = "/config";

/// Errors raised while parsing a `/config` command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigCommandError {
    /// The text does not start with `/config`.
    #[error("not a /config command")]
    NotConfigCommand,

    /// The worker name is absent.
    #[error("usage: /config <worker> get [key] | /config <worker> set <key> <value>")]
    MissingWorker,

    /// The worker name is invalid.
    #[error("invalid worker name: {0}")]
    InvalidWorker(#[from] EnvelopeError),

    /// The action is absent.
    #[error("missing action for worker '{0}': expected get or set")]
    MissingAction(String),

    /// The action is neither `get` nor `set`.
    #[error("unknown /config action '{0}': expected get or set")]
    UnknownAction(String),

    /// `set` was given without a key.
    #[error("missing key for /config set")]
    MissingKey,

    /// `set` was given without a value.
    #[error("missing value for key '{0}'")]
    MissingValue(String),

    /// `get` was given more than one key.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    /// A quoted token was not closed.
    #[error("unterminated quoted value in /config command")]
    UnterminatedQuote,
}

/// A parsed configuration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Read one key or the whole configuration of a worker.
    Get {
        /// Worker whose configuration is read.
        worker: WorkerName,
        /// Key to read; the full configuration when absent.
        key: Option<String>,
    },
    /// Set one key of a worker's configuration.
    Set {
        /// Worker whose configuration is changed.
        worker: WorkerName,
        /// Key to set.
        key: String,
        /// New value.
        value: Value,
    },
}

impl ConfigCommand {
    /// Returns whether `content` is addressed to the `/config` command.
    #[must_use]
    pub fn matches(content: &str) -> bool {
        content.split_whitespace().next() == Some(COMMAND)
    }

    /// Parses a `/config` command.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigCommandError`] describing the first problem found.
    pub fn parse(content: &str) -> Result<Self, ConfigCommandError> {
        let mut tokens = split_tokens(content.trim())?.into_iter();

        if tokens.next().as_deref() != Some(COMMAND) {
            return Err(ConfigCommandError::NotConfigCommand);
        }
        let raw_worker = tokens.next().ok_or(ConfigCommandError::MissingWorker)?;
        let worker = WorkerName::new(raw_worker.as_str())?;
        let action = tokens
            .next()
            .ok_or_else(|| ConfigCommandError::MissingAction(raw_worker.clone()))?;

        match action.to_ascii_lowercase().as_str() {
            "get" => {
                let key = tokens.next();
                if let Some(extra) = tokens.next() {
                    return Err(ConfigCommandError::UnexpectedArgument(extra));
                }
                Ok(Self::Get { worker, key })
            }
            "set" => {
                let key = tokens.next().ok_or(ConfigCommandError::MissingKey)?;
                let rest: Vec<String> = tokens.collect();
                if rest.is_empty() {
                    return Err(ConfigCommandError::MissingValue(key));
                }
                let value = parse_value(&rest.join(" "));
                Ok(Self::Set { worker, key, value })
            }
            _ => Err(ConfigCommandError::UnknownAction(action)),
        }
    }

    /// Returns the worker the command addresses.
    #[must_use]
    pub const fn worker(&self) -> &WorkerName {
        match self {
            Self::Get { worker, .. } | Self::Set { worker, .. } => worker,
        }
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn split_tokens(input: &str) -> Result<Vec<String>, ConfigCommandError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars();
    let mut current = String::new();
    let mut started = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' | '\'' => {
                started = true;
                read_quoted(&mut chars, ch, &mut current)?;
            }
            c if c.is_whitespace() => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                started = true;
                current.push(c);
            }
        }
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

fn read_quoted(
    chars: &mut std::str::Chars<'_>,
    quote: char,
    out: &mut String,
) -> Result<(), ConfigCommandError> {
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next().ok_or(ConfigCommandError::UnterminatedQuote)?),
            c if c == quote => return Ok(()),
            c => out.push(c),
        }
    }
    Err(ConfigCommandError::UnterminatedQuote)
}
