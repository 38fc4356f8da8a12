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

use std::any::Any;
use std::fmt;
use std::hash::Hash;

use tokio_util::sync::CancellationToken;

use crate::errors::{ActorError, ActorResult};
use crate::mailbox::Mailbox;
use crate::message::{payload, Message, Payload};

/// Shareable handle to an actor's mailbox.
///
/// A reference only ever enqueues; it grants no access to actor state.
/// `send` suspends while the mailbox is at capacity; a receiver sending to
/// its own single-worker actor must use [`Ref::try_send`] instead.
pub struct Ref {
    mailbox: Mailbox,
}

impl Clone for Ref {
    fn clone(&self) -> Self {
        Ref {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl Ref {
    pub(crate) fn new(mailbox: Mailbox) -> Self {
        Ref { mailbox }
    }

    /// Tell: fire-and-forget enqueue.
    pub async fn send<T: Any + Send + Sync>(&self, value: T) -> ActorResult<()> {
        self.send_payload(payload(value)).await
    }

    pub async fn send_payload(&self, value: Payload) -> ActorResult<()> {
        self.mailbox.push(Message::tell(value)).await
    }

    /// Tell without suspending: fails `Full` when the mailbox is at
    /// capacity.
    pub fn try_send<T: Any + Send + Sync>(&self, value: T) -> ActorResult<()> {
        self.mailbox.try_push(Message::tell(payload(value)))
    }

    /// Ask: enqueue and await the reply. An error-typed reply surfaces as
    /// `Err`; closing the mailbox surfaces as `Closed`.
    pub async fn ask<T: Any + Send + Sync>(&self, value: T) -> ActorResult<Payload> {
        self.ask_payload(payload(value)).await
    }

    pub async fn ask_payload(&self, value: Payload) -> ActorResult<Payload> {
        let (message, reply) = Message::ask(value);
        self.mailbox.push(message).await?;
        match reply.await {
            Ok(value) => reply_to_result(value),
            Err(_) => Err(ActorError::closed()),
        }
    }

    /// Ask bounded by a cancellation token. When the token fires the caller
    /// stops waiting with `Cancelled`; the message may still be processed
    /// and its reply is then discarded.
    pub async fn ask_with<T: Any + Send + Sync>(
        &self,
        token: &CancellationToken,
        value: T,
    ) -> ActorResult<Payload> {
        let (message, reply) = Message::ask(payload(value));
        self.mailbox.push(message).await?;
        tokio::select! {
            _ = token.cancelled() => Err(ActorError::cancelled()),
            value = reply => match value {
                Ok(value) => reply_to_result(value),
                Err(_) => Err(ActorError::closed()),
            },
        }
    }
}

/// Error replies are distinguished from value replies by runtime type.
fn reply_to_result(value: Payload) -> ActorResult<Payload> {
    match value.downcast_ref::<ActorError>() {
        Some(err) => Err(err.clone()),
        None => Ok(value),
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:?})", self.mailbox)
    }
}

impl Hash for Ref {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.mailbox.hash(state)
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.mailbox == other.mailbox
    }
}

impl Eq for Ref {}
