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
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{ActorError, ActorResult};
use crate::message::{payload, Message};

/// Bounded FIFO queue of messages for one actor.
///
/// Producers suspend while the queue is at capacity; consumers suspend
/// while it is empty. Closing is idempotent: later pushes fail `Closed` and
/// every still-enqueued ask has its sink completed with `Closed`.
pub struct Mailbox {
    tx: flume::Sender<Message>,
    rx: flume::Receiver<Message>,
    closed: Arc<AtomicBool>,
    id: Uuid,
}

impl Clone for Mailbox {
    fn clone(&self) -> Self {
        Mailbox {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            closed: self.closed.clone(),
            id: self.id,
        }
    }
}

impl Mailbox {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded::<Message>(capacity);
        Mailbox {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
            id: Uuid::new_v4(),
        }
    }

    pub async fn push(&self, message: Message) -> ActorResult<()> {
        if self.is_closed() {
            return Err(ActorError::closed());
        }
        self.tx
            .send_async(message)
            .await
            .map_err(|_| ActorError::closed())?;
        // A close may have raced the send; its drain must not miss us.
        if self.is_closed() {
            self.drain();
        }
        Ok(())
    }

    /// Non-suspending push: fails `Full` at capacity. The option for code
    /// that enqueues to its own single-worker actor and must not block.
    pub fn try_push(&self, message: Message) -> ActorResult<()> {
        if self.is_closed() {
            return Err(ActorError::closed());
        }
        match self.tx.try_send(message) {
            Ok(()) => {
                if self.is_closed() {
                    self.drain();
                }
                Ok(())
            }
            Err(flume::TrySendError::Full(_)) => Err(ActorError::full()),
            Err(flume::TrySendError::Disconnected(_)) => Err(ActorError::closed()),
        }
    }

    /// Next message in FIFO order; `None` once the mailbox is closed and
    /// drained.
    pub(crate) async fn pop(&self) -> Option<Message> {
        if self.is_closed() && self.rx.is_empty() {
            return None;
        }
        self.rx.recv_async().await.ok()
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.drain();
        }
    }

    fn drain(&self) {
        while let Ok(message) = self.rx.try_recv() {
            if let Some(sink) = message.sink() {
                sink.complete(payload(ActorError::closed()));
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mailbox({})", self.id)
    }
}

impl Hash for Mailbox {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Mailbox {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl Eq for Mailbox {}
