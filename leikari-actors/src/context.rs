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
use std::sync::Weak;

use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::actor::Receiver;
use crate::actor_ref::Ref;
use crate::errors::{ActorError, ActorResult};
use crate::handler::{upgrade_handler, ActorHandler, HandlerInner};
use crate::message::{payload, Payload};
use crate::pubsub::{Filter, Publish, Subscribe, Unsubscribe};
use crate::settings::SpawnOpts;

/// Per-worker view handed to user code.
///
/// Grants a self reference, spawning of children, path lookup, pub/sub and
/// the handler cache, never the handler's mutable internals. The cache is
/// shared by all workers of the handler; beyond its per-key
/// linearizability, receivers in async dispatch mode synchronize their own
/// state.
#[derive(Clone)]
pub struct Context {
    name: String,
    worker: usize,
    self_ref: Ref,
    handler: Weak<HandlerInner>,
    done: CancellationToken,
    span: Span,
}

impl Context {
    pub(crate) fn new(
        name: String,
        worker: usize,
        self_ref: Ref,
        handler: Weak<HandlerInner>,
        done: CancellationToken,
        span: Span,
    ) -> Context {
        Context {
            name,
            worker,
            self_ref,
            handler,
            done,
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of this worker within the handler's pool.
    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn path(&self) -> String {
        match self.handler() {
            Some(handler) => handler.path(),
            None => format!("/{}", self.name),
        }
    }

    pub fn self_ref(&self) -> &Ref {
        &self.self_ref
    }

    /// One-shot stop signal: fires when the handler closes. Long-running
    /// receives select on it to wind down early.
    pub fn done(&self) -> &CancellationToken {
        &self.done
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn handler(&self) -> Option<ActorHandler> {
        upgrade_handler(&self.handler)
    }

    /// Spawns a child actor under this handler.
    pub async fn spawn<R: Receiver>(
        &self,
        receiver: R,
        name: &str,
        opts: SpawnOpts,
    ) -> ActorResult<Ref> {
        let handler = self.handler().ok_or_else(ActorError::closed)?;
        let child = handler.execute(receiver, name, opts).await?;
        Ok(child.create_ref())
    }

    /// A reference for the actor at `path`, or `NotFound`.
    pub async fn at(&self, path: &str) -> ActorResult<Ref> {
        let handler = self.handler().ok_or_else(ActorError::closed)?;
        match handler.at(path).await {
            Some(target) => Ok(target.create_ref()),
            None => Err(ActorError::not_found(format!("no actor at '{}'", path))),
        }
    }

    fn pubsub(&self) -> ActorResult<Ref> {
        let handler = self.handler().ok_or_else(ActorError::closed)?;
        Ok(handler.root().create_ref())
    }

    pub async fn publish<T: Any + Send + Sync>(&self, value: T) -> ActorResult<()> {
        self.pubsub()?
            .send(Publish {
                content: payload(value),
            })
            .await
    }

    pub async fn subscribe(&self, subscriber: Ref, filter: Filter) -> ActorResult<()> {
        self.pubsub()?.send(Subscribe { subscriber, filter }).await
    }

    pub async fn unsubscribe(&self, subscriber: Ref) -> ActorResult<()> {
        self.pubsub()?.send(Unsubscribe { subscriber }).await
    }

    /// Unconditional insert into the handler cache.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        if let Some(handler) = self.handler() {
            handler.cache().set(key, value);
        }
    }

    /// Cache insert failing `Exists` on a present key.
    pub fn add<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> ActorResult<()> {
        let handler = self.handler().ok_or_else(ActorError::closed)?;
        handler.cache().add(key, value)
    }

    /// Cache overwrite failing `NotFound` on an absent key.
    pub fn replace<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> ActorResult<()> {
        let handler = self.handler().ok_or_else(ActorError::closed)?;
        handler.cache().replace(key, value)
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        self.handler().and_then(|handler| handler.cache().get(key))
    }
}
