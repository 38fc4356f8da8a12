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

//! Repository actors: typed command/event dispatch over the actor runtime,
//! answering filtered queries with the filter expression language.
//!
//! A [`Repository`] backend implements whichever of insert / select /
//! update / delete / query it supports; unimplemented operations answer
//! `NotFound`. [`repository`] wraps a backend into an actor and hands back
//! a typed [`RepositoryRef`].

mod actor;
mod actor_ref;
mod command;
mod memory;
mod repository;


pub use crate::actor::{repository, RepositoryActor};
pub use crate::actor_ref::RepositoryRef;
pub use crate::command::{
    DeleteCommand, DeletedEvent, InsertCommand, InsertedEvent, SelectCommand, SelectedEvent,
    UpdateCommand, UpdatedEvent,
};
pub use crate::memory::MemoryRepository;
pub use crate::repository::Repository;

pub use leikari_query::{Query, QueryResult};
