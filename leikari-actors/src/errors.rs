/*
    Leikari
    Copyright (C) 2021 Quickwit Inc.

    Leikari is offered under the AGPL v3.0 and as commercial software.
    For commercial licensing, contact us at hello@quickwit.io.

    AGPL:
    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as
    published by the Free Software Foundation, either version 3 of the
    License, or (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

use std::fmt;

use thiserror::Error;

pub type ActorResult<T> = Result<T, ActorError>;

/// Classification of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Mailbox closed or handler terminated.
    Closed,
    /// Mailbox at capacity (only from `try_send`).
    Full,
    /// Sibling actor name collision on spawn.
    NameExists,
    /// Path lookup, cache key or repository miss.
    NotFound,
    /// Insert conflict.
    Exists,
    /// Receiver reached its default arm.
    UnknownCommand,
    /// Filter expression failed to lex or parse.
    Parse,
    /// Shutdown budget exceeded.
    Timeout,
    /// Caller-side cancellation token fired.
    Cancelled,
    /// Panic in a user receiver.
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Closed => "closed",
            ErrorKind::Full => "full",
            ErrorKind::NameExists => "name-exists",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Exists => "exists",
            ErrorKind::UnknownCommand => "unknown-command",
            ErrorKind::Parse => "parse",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error surfaced by references, handlers and repository actors.
///
/// Carries an optional HTTP-compatible status and description for callers
/// sitting at an external boundary; the runtime itself never interprets
/// them. Errors cross mailboxes as reply payloads, hence `Clone`.
#[derive(Debug, Clone, Error)]
#[error("{}", format_error(.kind, .message))]
pub struct ActorError {
    kind: ErrorKind,
    message: String,
    description: Option<String>,
    status: Option<u16>,
}

fn format_error(kind: &ErrorKind, message: &str) -> String {
    format!("{} - {}", kind.code(), message)
}

impl ActorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ActorError {
            kind,
            message: message.into(),
            description: None,
            status: None,
        }
    }

    pub fn closed() -> Self {
        ActorError::new(ErrorKind::Closed, "mailbox closed")
    }

    pub fn full() -> Self {
        ActorError::new(ErrorKind::Full, "mailbox full")
    }

    pub fn name_exists(name: &str) -> Self {
        ActorError::new(
            ErrorKind::NameExists,
            format!("child '{}' already exists", name),
        )
        .with_status(409)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ActorError::new(ErrorKind::NotFound, what).with_status(404)
    }

    pub fn exists(what: impl Into<String>) -> Self {
        ActorError::new(ErrorKind::Exists, what).with_status(409)
    }

    pub fn unknown_command() -> Self {
        ActorError::new(ErrorKind::UnknownCommand, "unknown command").with_status(400)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ActorError::new(ErrorKind::Parse, message).with_status(400)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ActorError::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled() -> Self {
        ActorError::new(ErrorKind::Cancelled, "request cancelled")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ActorError::new(ErrorKind::Internal, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(500)
    }
}
