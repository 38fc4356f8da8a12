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

//! Filter expression language used by repository actors to answer queries
//! over in-memory collections.
//!
//! An expression is a predicate over a record, written either as a string
//! (`"iso EQ 'DE' AND name SW 'G'"`) and parsed with [`parse`], or built
//! programmatically with the constructors on [`Node`]. Evaluation resolves
//! dotted field paths against `serde_json::Value` objects, so any
//! `Serialize` record can be matched.

mod lexer;
mod node;
mod parser;
mod query;
mod record;
mod token;

pub use crate::node::{CompareOp, Literal, LogicalOp, Node, PrefixOp};
pub use crate::parser::{parse, ParseError};
pub use crate::query::{Query, QueryResult};
pub use crate::record::{evaluate, evaluate_with, matches, resolve};
