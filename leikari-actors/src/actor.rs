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

use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::errors::ActorResult;
use crate::message::Message;

/// User code of an actor.
///
/// One receiver instance is shared by all workers of its handler; receivers
/// keep their state behind interior mutability or in the handler cache. In
/// async dispatch mode `receive` runs concurrently for every in-flight
/// message, so such state needs its own synchronization.
#[async_trait]
pub trait Receiver: Send + Sync + 'static {
    /// Runs once per worker before any receive. A failure aborts the spawn
    /// of the whole handler.
    async fn pre_start(&self, _ctx: &Context) -> ActorResult<()> {
        Ok(())
    }

    async fn receive(&self, ctx: &Context, msg: Message);

    /// Runs once per worker after its last receive returned. Failures are
    /// logged, never escalated.
    async fn post_stop(&self, _ctx: &Context) -> ActorResult<()> {
        Ok(())
    }

    /// Logical name under the parent, used when the spawn call passes none.
    fn actor_name(&self) -> Option<String> {
        None
    }

    /// Spawn-per-message dispatch. Relaxes per-actor ordering.
    fn is_async(&self) -> bool {
        false
    }
}

type ReceiveFn = Box<dyn Fn(Context, Message) -> BoxFuture<'static, ()> + Send + Sync>;
type LifecycleFn = Box<dyn Fn(Context) -> BoxFuture<'static, ActorResult<()>> + Send + Sync>;

/// Closure-based [`Receiver`] for call sites that do not want to declare a
/// type.
///
/// ```ignore
/// let greeter = Actor::new(|_ctx, msg| async move {
///     msg.reply("hello");
/// });
/// ```
pub struct Actor {
    name: Option<String>,
    async_mode: bool,
    on_receive: ReceiveFn,
    on_start: Option<LifecycleFn>,
    on_stop: Option<LifecycleFn>,
}

impl Actor {
    pub fn new<F, Fut>(on_receive: F) -> Actor
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Actor {
            name: None,
            async_mode: false,
            on_receive: Box::new(move |ctx, msg| Box::pin(on_receive(ctx, msg))),
            on_start: None,
            on_stop: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Actor {
        self.name = Some(name.into());
        self
    }

    pub fn on_start<F, Fut>(mut self, on_start: F) -> Actor
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<()>> + Send + 'static,
    {
        self.on_start = Some(Box::new(move |ctx| Box::pin(on_start(ctx))));
        self
    }

    pub fn on_stop<F, Fut>(mut self, on_stop: F) -> Actor
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<()>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move |ctx| Box::pin(on_stop(ctx))));
        self
    }

    pub fn async_mode(mut self, async_mode: bool) -> Actor {
        self.async_mode = async_mode;
        self
    }
}

#[async_trait]
impl Receiver for Actor {
    async fn pre_start(&self, ctx: &Context) -> ActorResult<()> {
        match &self.on_start {
            Some(on_start) => on_start(ctx.clone()).await,
            None => Ok(()),
        }
    }

    async fn receive(&self, ctx: &Context, msg: Message) {
        (self.on_receive)(ctx.clone(), msg).await
    }

    async fn post_stop(&self, ctx: &Context) -> ActorResult<()> {
        match &self.on_stop {
            Some(on_stop) => on_stop(ctx.clone()).await,
            None => Ok(()),
        }
    }

    fn actor_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_async(&self) -> bool {
        self.async_mode
    }
}
