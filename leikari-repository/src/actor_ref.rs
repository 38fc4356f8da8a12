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

use leikari_actors::{ActorError, ActorResult, CancellationToken, Payload, Ref};
use leikari_query::{Query, QueryResult};
use serde::Serialize;
use serde_json::Value;

use crate::command::{
    DeleteCommand, DeletedEvent, InsertCommand, InsertedEvent, SelectCommand, SelectedEvent,
    UpdateCommand, UpdatedEvent,
};

/// Typed view over a repository actor's reference.
///
/// Each method asks the actor with the matching command and downcasts the
/// reply to its event type; the `_with` variants take a cancellation token
/// that frees the caller without recalling the command.
#[derive(Debug, Clone)]
pub struct RepositoryRef {
    actor: Ref,
}

impl RepositoryRef {
    pub fn new(actor: Ref) -> Self {
        RepositoryRef { actor }
    }

    /// The untyped reference underneath, e.g. for pub/sub subscriptions.
    pub fn actor(&self) -> &Ref {
        &self.actor
    }

    pub async fn insert<E: Serialize>(&self, id: &str, entity: E) -> ActorResult<InsertedEvent> {
        let reply = self.actor.ask(insert_command(id, entity)?).await?;
        expect_event(reply)
    }

    pub async fn insert_with<E: Serialize>(
        &self,
        token: &CancellationToken,
        id: &str,
        entity: E,
    ) -> ActorResult<InsertedEvent> {
        let reply = self
            .actor
            .ask_with(token, insert_command(id, entity)?)
            .await?;
        expect_event(reply)
    }

    pub async fn select(&self, id: &str) -> ActorResult<SelectedEvent> {
        let reply = self.actor.ask(SelectCommand { id: id.to_string() }).await?;
        expect_event(reply)
    }

    pub async fn select_with(
        &self,
        token: &CancellationToken,
        id: &str,
    ) -> ActorResult<SelectedEvent> {
        let reply = self
            .actor
            .ask_with(token, SelectCommand { id: id.to_string() })
            .await?;
        expect_event(reply)
    }

    pub async fn update<E: Serialize>(&self, id: &str, entity: E) -> ActorResult<UpdatedEvent> {
        let reply = self.actor.ask(update_command(id, entity)?).await?;
        expect_event(reply)
    }

    pub async fn update_with<E: Serialize>(
        &self,
        token: &CancellationToken,
        id: &str,
        entity: E,
    ) -> ActorResult<UpdatedEvent> {
        let reply = self
            .actor
            .ask_with(token, update_command(id, entity)?)
            .await?;
        expect_event(reply)
    }

    pub async fn delete(&self, id: &str) -> ActorResult<DeletedEvent> {
        let reply = self.actor.ask(DeleteCommand { id: id.to_string() }).await?;
        expect_event(reply)
    }

    pub async fn delete_with(
        &self,
        token: &CancellationToken,
        id: &str,
    ) -> ActorResult<DeletedEvent> {
        let reply = self
            .actor
            .ask_with(token, DeleteCommand { id: id.to_string() })
            .await?;
        expect_event(reply)
    }

    pub async fn query(&self, query: Query) -> ActorResult<QueryResult> {
        let reply = self.actor.ask(query).await?;
        expect_event(reply)
    }

    pub async fn query_with(
        &self,
        token: &CancellationToken,
        query: Query,
    ) -> ActorResult<QueryResult> {
        let reply = self.actor.ask_with(token, query).await?;
        expect_event(reply)
    }
}

fn insert_command<E: Serialize>(id: &str, entity: E) -> ActorResult<InsertCommand> {
    Ok(InsertCommand {
        id: id.to_string(),
        entity: to_entity(entity)?,
    })
}

fn update_command<E: Serialize>(id: &str, entity: E) -> ActorResult<UpdateCommand> {
    Ok(UpdateCommand {
        id: id.to_string(),
        entity: to_entity(entity)?,
    })
}

fn to_entity<E: Serialize>(entity: E) -> ActorResult<Value> {
    serde_json::to_value(entity)
        .map_err(|err| ActorError::internal(format!("entity does not serialize: {}", err)))
}

fn expect_event<T: Clone + 'static>(reply: Payload) -> ActorResult<T> {
    reply
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(ActorError::unknown_command)
}
