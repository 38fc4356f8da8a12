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

//! A lightweight in-process actor runtime.
//!
//! Actors form a supervision tree rooted at the [`ActorSystem`]. Every
//! actor owns a bounded mailbox drained by a pool of workers; callers reach
//! it through a cheap-to-clone [`Ref`] supporting fire-and-forget `send`
//! and request/response `ask` with one-shot reply sinks. The root actor
//! hosts a publish/subscribe bus. Delivery is at-most-once within the
//! process, ordered per sender and mailbox pair.
//!
//! ```ignore
//! let system = ActorSystem::load().await?;
//! let greeter = system
//!     .execute(
//!         Actor::new(|_ctx, msg| async move {
//!             msg.reply("hello");
//!         }),
//!         "greeter",
//!         SpawnOpts::new(),
//!     )
//!     .await?;
//! let reply = greeter.ask(()).await?;
//! system.run().await;
//! ```

mod actor;
mod actor_ref;
mod cache;
mod context;
mod errors;
mod handler;
mod mailbox;
mod message;
mod pubsub;
mod settings;
mod system;
mod timer;

#[cfg(test)]
mod tests;

pub use crate::actor::{Actor, Receiver};
pub use crate::actor_ref::Ref;
pub use crate::cache::Cache;
pub use crate::context::Context;
pub use crate::errors::{ActorError, ActorResult, ErrorKind};
pub use crate::handler::ActorHandler;
pub use crate::mailbox::Mailbox;
pub use crate::message::{downcast, payload, Done, Message, Payload, ReplySink};
pub use crate::pubsub::{filter_always, filter_type, Filter, Publish, Subscribe, Unsubscribe};
pub use crate::settings::{ActorSettings, Settings, SpawnOpts, SystemSettings};
pub use crate::system::{setup_logging, ActorSystem};
pub use crate::timer::{ticker, timer, Ticker, TickerState, TimerHandle};

pub use tokio_util::sync::CancellationToken;
