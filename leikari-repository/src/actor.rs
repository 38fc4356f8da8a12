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
use leikari_actors::{
    payload, ActorError, ActorResult, ActorSystem, Context, Message, Payload, Receiver, SpawnOpts,
};
use leikari_query::Query;
use tracing::debug;

use crate::actor_ref::RepositoryRef;
use crate::command::{DeleteCommand, InsertCommand, SelectCommand, UpdateCommand};
use crate::repository::Repository;

/// Actor routing the five repository commands to its backend.
///
/// Commands are independent, so dispatch runs async by default; switch to
/// sync when callers need ordered processing.
pub struct RepositoryActor<R: Repository> {
    repository: R,
    sync_mode: bool,
}

impl<R: Repository> RepositoryActor<R> {
    pub fn new(repository: R) -> Self {
        RepositoryActor {
            repository,
            sync_mode: false,
        }
    }

    pub fn sync_mode(mut self, sync_mode: bool) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    async fn route(&self, ctx: &Context, msg: &Message) -> ActorResult<Payload> {
        if let Some(cmd) = msg.get::<InsertCommand>() {
            debug!(id = %cmd.id, "insert");
            return self.repository.insert(ctx, cmd.clone()).await.map(payload);
        }
        if let Some(cmd) = msg.get::<SelectCommand>() {
            debug!(id = %cmd.id, "select");
            return self.repository.select(ctx, cmd.clone()).await.map(payload);
        }
        if let Some(cmd) = msg.get::<UpdateCommand>() {
            debug!(id = %cmd.id, "update");
            return self.repository.update(ctx, cmd.clone()).await.map(payload);
        }
        if let Some(cmd) = msg.get::<DeleteCommand>() {
            debug!(id = %cmd.id, "delete");
            return self.repository.delete(ctx, cmd.clone()).await.map(payload);
        }
        if let Some(query) = msg.get::<Query>() {
            debug!(expr = %query.expr, "query");
            return self.repository.query(ctx, query.clone()).await.map(payload);
        }
        Err(ActorError::unknown_command())
    }
}

#[async_trait]
impl<R: Repository> Receiver for RepositoryActor<R> {
    async fn pre_start(&self, ctx: &Context) -> ActorResult<()> {
        self.repository.on_start(ctx).await
    }

    async fn receive(&self, ctx: &Context, msg: Message) {
        match self.route(ctx, &msg).await {
            Ok(reply) => {
                msg.reply_payload(reply);
            }
            Err(err) => {
                msg.reply(err);
            }
        }
    }

    async fn post_stop(&self, ctx: &Context) -> ActorResult<()> {
        self.repository.on_stop(ctx).await
    }

    fn is_async(&self) -> bool {
        !self.sync_mode
    }
}

/// Spawns a repository actor under `/usr` and hands back its typed
/// reference.
pub async fn repository<R: Repository>(
    system: &ActorSystem,
    repository: R,
    name: &str,
    opts: SpawnOpts,
) -> ActorResult<RepositoryRef> {
    if name.is_empty() {
        return Err(ActorError::internal("repository name is not defined"));
    }
    let actor = system
        .execute(RepositoryActor::new(repository), name, opts)
        .await?;
    Ok(RepositoryRef::new(actor))
}
