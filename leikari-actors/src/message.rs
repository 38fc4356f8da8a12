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
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// A message or reply payload.
///
/// Payloads are shared so a published value can fan out to any number of
/// subscribers without copying user data.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Wraps a value into a [`Payload`].
pub fn payload<T: Any + Send + Sync>(value: T) -> Payload {
    Arc::new(value)
}

/// Downcasts a payload to a concrete type.
pub fn downcast<T: Any + Send + Sync>(value: Payload) -> Option<Arc<T>> {
    value.downcast::<T>().ok()
}

/// Acknowledgement marker. The dispatcher also uses it to complete an ask
/// whose receiver returned without replying, so ask callers never hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Done;

/// Write-once reply channel carried by an ask.
///
/// The first `complete` wins; later writes are rejected.
pub struct ReplySink {
    tx: Mutex<Option<oneshot::Sender<Payload>>>,
}

impl ReplySink {
    pub(crate) fn channel() -> (Arc<ReplySink>, oneshot::Receiver<Payload>) {
        let (tx, rx) = oneshot::channel();
        let sink = ReplySink {
            tx: Mutex::new(Some(tx)),
        };
        (Arc::new(sink), rx)
    }

    /// Completes the sink. Returns false when the sink was already
    /// completed. A reply to a caller that stopped waiting is discarded
    /// without error.
    pub fn complete(&self, value: Payload) -> bool {
        let tx = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        match tx {
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self.tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }
}

/// Envelope handed to a receiver: an opaque payload plus, for asks, a
/// one-shot reply sink.
pub struct Message {
    value: Payload,
    sink: Option<Arc<ReplySink>>,
}

impl Message {
    /// Fire-and-forget envelope.
    pub fn tell(value: Payload) -> Message {
        Message { value, sink: None }
    }

    /// Envelope carrying a fresh reply sink; the returned receiver yields
    /// the reply payload.
    pub fn ask(value: Payload) -> (Message, oneshot::Receiver<Payload>) {
        let (sink, rx) = ReplySink::channel();
        let message = Message {
            value,
            sink: Some(sink),
        };
        (message, rx)
    }

    pub fn value(&self) -> &Payload {
        &self.value
    }

    /// The payload downcast to a concrete type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is_ask(&self) -> bool {
        self.sink.is_some()
    }

    /// Replies to an ask. A no-op on tell messages and on already-answered
    /// asks; returns whether the reply was accepted.
    pub fn reply<T: Any + Send + Sync>(&self, value: T) -> bool {
        self.reply_payload(payload(value))
    }

    pub fn reply_payload(&self, value: Payload) -> bool {
        match &self.sink {
            Some(sink) => sink.complete(value),
            None => false,
        }
    }

    pub(crate) fn sink(&self) -> Option<Arc<ReplySink>> {
        self.sink.clone()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ask() {
            write!(f, "Message(ask)")
        } else {
            write!(f, "Message(tell)")
        }
    }
}
