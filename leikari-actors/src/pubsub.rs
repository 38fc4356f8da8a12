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
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::actor::Receiver;
use crate::actor_ref::Ref;
use crate::context::Context;
use crate::message::{Done, Message, Payload};

/// Subscription predicate over published payloads.
pub type Filter = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

/// Matches payloads of a concrete type.
pub fn filter_type<T: Any>() -> Filter {
    Arc::new(|value: &Payload| value.downcast_ref::<T>().is_some())
}

/// Matches everything.
pub fn filter_always() -> Filter {
    Arc::new(|_| true)
}

/// Control message: append `(subscriber, filter)` to the subscription
/// list. Not idempotent: a duplicate subscription delivers duplicates.
#[derive(Clone)]
pub struct Subscribe {
    pub subscriber: Ref,
    pub filter: Filter,
}

/// Control message: drop every subscription held by `subscriber`.
#[derive(Clone)]
pub struct Unsubscribe {
    pub subscriber: Ref,
}

/// Control message: fan the payload out to every subscriber whose filter
/// matches. Best-effort; deliveries to closed mailboxes are dropped.
#[derive(Clone)]
pub struct Publish {
    pub content: Payload,
}

/// The root actor: keeps the subscription list and fans publishes out.
///
/// It runs sync with a single worker, so one publisher's publishes arrive
/// at each subscriber in publish order. Subscribers that need that
/// ordering end-to-end must themselves be sync.
#[derive(Default)]
pub(crate) struct RootActor {
    subscriptions: RwLock<Vec<Subscribe>>,
}

impl RootActor {
    fn add(&self, subscription: Subscribe) {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.push(subscription);
    }

    fn remove(&self, subscriber: &Ref) {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.retain(|subscription| subscription.subscriber != *subscriber);
    }

    fn snapshot(&self) -> Vec<Subscribe> {
        let subscriptions = self.subscriptions.read().unwrap_or_else(|e| e.into_inner());
        subscriptions.clone()
    }
}

#[async_trait]
impl Receiver for RootActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        if let Some(subscribe) = msg.get::<Subscribe>() {
            self.add(subscribe.clone());
            msg.reply(Done);
        } else if let Some(unsubscribe) = msg.get::<Unsubscribe>() {
            self.remove(&unsubscribe.subscriber);
            msg.reply(Done);
        } else if let Some(publish) = msg.get::<Publish>() {
            for subscription in self.snapshot() {
                if !(subscription.filter)(&publish.content) {
                    continue;
                }
                if subscription
                    .subscriber
                    .send_payload(publish.content.clone())
                    .await
                    .is_err()
                {
                    debug!("dropping publish to closed subscriber");
                }
            }
            msg.reply(Done);
        }
    }
}
