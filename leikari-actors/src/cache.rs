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
use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{ActorError, ActorResult};
use crate::message::{payload, Payload};

/// Key/value store shared by all workers of one handler.
///
/// Operations are linearizable per key, nothing more: receivers in async
/// dispatch mode coordinating multi-key state need their own
/// synchronization.
#[derive(Default)]
pub struct Cache {
    items: RwLock<HashMap<String, Payload>>,
}

impl Cache {
    pub fn new() -> Cache {
        Cache::default()
    }

    /// Unconditional insert-or-overwrite.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.into(), payload(value));
    }

    /// Insert; fails `Exists` when the key is present.
    pub fn add<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> ActorResult<()> {
        let key = key.into();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.contains_key(&key) {
            return Err(ActorError::exists(format!("item '{}' exists", key)));
        }
        items.insert(key, payload(value));
        Ok(())
    }

    /// Overwrite; fails `NotFound` when the key is absent.
    pub fn replace<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> ActorResult<()> {
        let key = key.into();
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if !items.contains_key(&key) {
            return Err(ActorError::not_found(format!("item '{}' not exists", key)));
        }
        items.insert(key, payload(value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }
}
