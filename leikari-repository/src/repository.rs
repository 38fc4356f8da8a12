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

use async_trait::async_trait;
use leikari_actors::{ActorError, ActorResult, Context};
use leikari_query::{Query, QueryResult};

use crate::command::{
    DeleteCommand, DeletedEvent, InsertCommand, InsertedEvent, SelectCommand, SelectedEvent,
    UpdateCommand, UpdatedEvent,
};

/// Backend of a repository actor.
///
/// Implement the operations the store supports; every unimplemented
/// operation keeps its default arm and answers `NotFound`. Contract for
/// implementors:
///
/// - `insert` fails `Exists` when the key is already present,
/// - `select`, `update` and `delete` fail `NotFound` on an absent key,
/// - `query` filters the collection with the parsed expression, paginates
///   with `from`/`size` and fills `timestamp`/`took_ms`.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn insert(&self, _ctx: &Context, _cmd: InsertCommand) -> ActorResult<InsertedEvent> {
        Err(ActorError::not_found("insert not supported"))
    }

    async fn select(&self, _ctx: &Context, _cmd: SelectCommand) -> ActorResult<SelectedEvent> {
        Err(ActorError::not_found("select not supported"))
    }

    async fn update(&self, _ctx: &Context, _cmd: UpdateCommand) -> ActorResult<UpdatedEvent> {
        Err(ActorError::not_found("update not supported"))
    }

    async fn delete(&self, _ctx: &Context, _cmd: DeleteCommand) -> ActorResult<DeletedEvent> {
        Err(ActorError::not_found("delete not supported"))
    }

    async fn query(&self, _ctx: &Context, _query: Query) -> ActorResult<QueryResult> {
        Err(ActorError::not_found("query not supported"))
    }

    /// Runs once per worker before the actor accepts commands.
    async fn on_start(&self, _ctx: &Context) -> ActorResult<()> {
        Ok(())
    }

    /// Runs once per worker during shutdown.
    async fn on_stop(&self, _ctx: &Context) -> ActorResult<()> {
        Ok(())
    }
}
