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

use std::sync::RwLock;
use std::time::Instant;

use async_trait::async_trait;
use indexmap::IndexMap;
use leikari_actors::{ActorError, ActorResult, Context};
use leikari_query::{evaluate, Query, QueryResult};
use serde_json::Value;

use crate::command::{
    DeleteCommand, DeletedEvent, InsertCommand, InsertedEvent, SelectCommand, SelectedEvent,
    UpdateCommand, UpdatedEvent,
};
use crate::repository::Repository;

/// Map-backed repository of JSON entities.
///
/// Keeps insertion order, so query pagination is deterministic. On insert
/// the id comes from the configured field path of the entity, falling back
/// to the command id; select, update and delete go by the command id
/// alone.
pub struct MemoryRepository {
    items: RwLock<IndexMap<String, Value>>,
    key_field: String,
}

impl MemoryRepository {
    pub fn new(key_field: impl Into<String>) -> Self {
        MemoryRepository {
            items: RwLock::new(IndexMap::new()),
            key_field: key_field.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entity_id(&self, cmd: &InsertCommand) -> ActorResult<String> {
        match leikari_query::resolve(&self.key_field, &cmd.entity) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Null) | None => {
                if cmd.id.is_empty() {
                    Err(ActorError::not_found(format!(
                        "id field '{}' not present",
                        self.key_field
                    )))
                } else {
                    Ok(cmd.id.clone())
                }
            }
            Some(other) => Ok(other.to_string()),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert(&self, _ctx: &Context, cmd: InsertCommand) -> ActorResult<InsertedEvent> {
        let started = Instant::now();
        let id = self.entity_id(&cmd)?;
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.contains_key(&id) {
            return Err(ActorError::exists(format!("entity '{}' exists", id)));
        }
        items.insert(id.clone(), cmd.entity.clone());
        Ok(InsertedEvent::new(id, cmd.entity).with_took_ms(took_ms(started)))
    }

    async fn select(&self, _ctx: &Context, cmd: SelectCommand) -> ActorResult<SelectedEvent> {
        let started = Instant::now();
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        match items.get(&cmd.id) {
            Some(entity) => {
                Ok(SelectedEvent::new(cmd.id, entity.clone()).with_took_ms(took_ms(started)))
            }
            None => Err(ActorError::not_found(format!("entity '{}' not found", cmd.id))),
        }
    }

    async fn update(&self, _ctx: &Context, cmd: UpdateCommand) -> ActorResult<UpdatedEvent> {
        let started = Instant::now();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if !items.contains_key(&cmd.id) {
            return Err(ActorError::not_found(format!("entity '{}' not found", cmd.id)));
        }
        items.insert(cmd.id.clone(), cmd.entity.clone());
        Ok(UpdatedEvent::new(cmd.id, cmd.entity).with_took_ms(took_ms(started)))
    }

    async fn delete(&self, _ctx: &Context, cmd: DeleteCommand) -> ActorResult<DeletedEvent> {
        let started = Instant::now();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        // shift_remove keeps the insertion order of the remaining entities.
        match items.shift_remove(&cmd.id) {
            Some(entity) => Ok(DeletedEvent::new(cmd.id, entity).with_took_ms(took_ms(started))),
            None => Err(ActorError::not_found(format!("entity '{}' not found", cmd.id))),
        }
    }

    async fn query(&self, _ctx: &Context, query: Query) -> ActorResult<QueryResult> {
        let started = Instant::now();
        let node = query
            .parse()
            .map_err(|err| ActorError::parse(err.to_string()))?;
        let matches: Vec<Value> = {
            let items = self.items.read().unwrap_or_else(|e| e.into_inner());
            items
                .values()
                .filter(|entity| evaluate(&node, entity))
                .cloned()
                .collect()
        };
        Ok(QueryResult::paginate(&query, matches).with_took_ms(took_ms(started)))
    }
}

fn took_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}
