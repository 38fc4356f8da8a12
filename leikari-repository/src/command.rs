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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Commands routed by a repository actor. Entities travel as JSON values;
/// typed entities enter through `Serialize` at the [`RepositoryRef`]
/// boundary.
///
/// [`RepositoryRef`]: crate::RepositoryRef
#[derive(Debug, Clone, PartialEq)]
pub struct InsertCommand {
    pub id: String,
    pub entity: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    pub id: String,
    pub entity: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteCommand {
    pub id: String,
}

macro_rules! event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub id: String,
            pub entity: Value,
            pub timestamp: DateTime<Utc>,
            #[serde(rename = "millis")]
            pub took_ms: i64,
        }

        impl $name {
            pub fn new(id: impl Into<String>, entity: Value) -> Self {
                $name {
                    id: id.into(),
                    entity,
                    timestamp: Utc::now(),
                    took_ms: 0,
                }
            }

            pub fn with_took_ms(mut self, took_ms: i64) -> Self {
                self.took_ms = took_ms;
                self
            }
        }
    };
}

event!(
    /// Answer to a successful insert.
    InsertedEvent
);
event!(
    /// Answer to a successful select.
    SelectedEvent
);
event!(
    /// Answer to a successful update.
    UpdatedEvent
);
event!(
    /// Answer to a successful delete, carrying the removed entity.
    DeletedEvent
);
