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
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::actor::Receiver;
use crate::actor_ref::Ref;
use crate::cache::Cache;
use crate::context::Context;
use crate::errors::{ActorError, ActorResult};
use crate::mailbox::Mailbox;
use crate::message::{payload, Done, Message};
use crate::settings::{ActorSettings, SpawnOpts, SystemSettings};

/// One node of the supervision tree: a mailbox, a worker pool, a cache and
/// the children spawned beneath it.
///
/// Handlers are cheap to clone; the parent owns its children through the
/// children map, children hold only a weak back-reference for `path()` and
/// `root()`, so the tree carries no reference cycles.
pub struct ActorHandler {
    inner: Arc<HandlerInner>,
}

impl Clone for ActorHandler {
    fn clone(&self) -> Self {
        ActorHandler {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct HandlerInner {
    name: String,
    settings: ActorSettings,
    system_settings: Arc<SystemSettings>,
    mailbox: Mailbox,
    receiver: Arc<dyn Receiver>,
    parent: Weak<HandlerInner>,
    children: RwLock<HashMap<String, ActorHandler>>,
    workers: StdMutex<Vec<WorkerHandle>>,
    cache: Cache,
    span: Span,
    closed: AtomicBool,
}

struct WorkerHandle {
    done: CancellationToken,
    join: JoinHandle<()>,
}

impl ActorHandler {
    /// Spawns the parentless root handler.
    pub(crate) async fn spawn_root(
        system_settings: Arc<SystemSettings>,
        receiver: Arc<dyn Receiver>,
    ) -> ActorResult<ActorHandler> {
        let handler = ActorHandler::create(
            system_settings,
            Weak::new(),
            "/".to_string(),
            receiver,
            "root".to_string(),
            SpawnOpts::new(),
        );
        handler.startup().await?;
        Ok(handler)
    }

    fn create(
        system_settings: Arc<SystemSettings>,
        parent: Weak<HandlerInner>,
        path: String,
        receiver: Arc<dyn Receiver>,
        name: String,
        opts: SpawnOpts,
    ) -> ActorHandler {
        let mut opts = opts;
        if opts.async_mode.is_none() && receiver.is_async() {
            opts.async_mode = Some(true);
        }
        let settings = system_settings.actor_settings(&name, &opts);
        let mailbox = Mailbox::new(settings.message_queue);
        let span = info_span!("actor", path = %path);
        span.in_scope(|| {
            debug!(
                worker_pool = settings.worker_pool,
                message_queue = settings.message_queue,
                async_mode = settings.async_mode,
                "actor created"
            )
        });
        ActorHandler {
            inner: Arc::new(HandlerInner {
                name,
                settings,
                system_settings,
                mailbox,
                receiver,
                parent,
                children: RwLock::new(HashMap::new()),
                workers: StdMutex::new(Vec::new()),
                cache: Cache::new(),
                span,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Starts the worker pool. Each worker runs the user PreStart exactly
    /// once before entering its dispatch loop; the first failure closes the
    /// handler (already-started workers observe their done signal and run
    /// PostStop) and propagates.
    async fn startup(&self) -> ActorResult<()> {
        let pool = self.inner.settings.worker_pool;
        for worker in 0..pool {
            let ctx = self.worker_context(worker);
            if let Err(err) = self.inner.receiver.pre_start(&ctx).await {
                error!(path = %self.path(), worker, error = %err, "pre-start failed");
                self.close().await;
                return Err(err);
            }
            let done = ctx.done().clone();
            let span = ctx.span().clone();
            let join = tokio::spawn(
                worker_loop(
                    ctx,
                    self.inner.mailbox.clone(),
                    self.inner.receiver.clone(),
                    self.inner.settings.async_mode,
                )
                .instrument(span),
            );
            let mut workers = self.inner.workers.lock().unwrap_or_else(|e| e.into_inner());
            workers.push(WorkerHandle { done, join });
        }
        Ok(())
    }

    fn worker_context(&self, worker: usize) -> Context {
        let span = if self.inner.settings.worker_pool > 1 {
            info_span!("actor", path = %format!("{}-{}", self.path(), worker))
        } else {
            self.inner.span.clone()
        };
        Context::new(
            self.inner.name.clone(),
            worker,
            Ref::new(self.inner.mailbox.clone()),
            Arc::downgrade(&self.inner),
            CancellationToken::new(),
            span,
        )
    }

    /// Spawns a child actor under this handler. Sibling names are unique;
    /// a collision fails `NameExists` without starting a worker.
    pub async fn execute<R: Receiver>(
        &self,
        receiver: R,
        name: &str,
        opts: SpawnOpts,
    ) -> ActorResult<ActorHandler> {
        self.execute_dyn(Arc::new(receiver), name, opts).await
    }

    pub async fn execute_dyn(
        &self,
        receiver: Arc<dyn Receiver>,
        name: &str,
        opts: SpawnOpts,
    ) -> ActorResult<ActorHandler> {
        if self.is_closed() {
            return Err(ActorError::closed());
        }
        let name = resolve_name(name, &opts, receiver.as_ref());
        // Check and registration stay under the children lock so sibling
        // names cannot race into the map.
        let mut children = self.inner.children.write().await;
        if children.contains_key(&name) {
            return Err(ActorError::name_exists(&name));
        }
        let path = join_path(&self.path(), &name);
        let child = ActorHandler::create(
            self.inner.system_settings.clone(),
            Arc::downgrade(&self.inner),
            path,
            receiver,
            name.clone(),
            opts,
        );
        child.startup().await?;
        children.insert(name, child.clone());
        Ok(child)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> String {
        match self.parent() {
            None => "/".to_string(),
            Some(parent) => join_path(&parent.path(), &self.inner.name),
        }
    }

    pub fn root(&self) -> ActorHandler {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn parent(&self) -> Option<ActorHandler> {
        self.inner
            .parent
            .upgrade()
            .map(|inner| ActorHandler { inner })
    }

    pub async fn child(&self, name: &str) -> Option<ActorHandler> {
        let children = self.inner.children.read().await;
        children.get(name).cloned()
    }

    pub async fn children(&self) -> Vec<ActorHandler> {
        let children = self.inner.children.read().await;
        children.values().cloned().collect()
    }

    /// Resolves a path to a handler: `/` is the root, `/a/b` descends from
    /// the root, `../x` from the parent, `./x` from this handler, `x/y`
    /// through the children. Missing segments yield `None`.
    pub async fn at(&self, path: &str) -> Option<ActorHandler> {
        if path.is_empty() {
            return None;
        }
        let (mut current, rest) = match path.strip_prefix('/') {
            Some(stripped) => (self.root(), stripped),
            None => (self.clone(), path),
        };
        for segment in rest.split('/') {
            current = match segment {
                "" | "." => current,
                ".." => current.parent()?,
                name => current.child(name).await?,
            };
        }
        Some(current)
    }

    pub fn create_ref(&self) -> Ref {
        Ref::new(self.inner.mailbox.clone())
    }

    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub fn settings(&self) -> &ActorSettings {
        &self.inner.settings
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Closes the subtree: all children first (concurrently, joined), then
    /// this handler's own workers, then the mailbox. Both stages share one
    /// shutdown deadline; when it expires a warning is logged and the
    /// mailbox closes regardless, failing still-enqueued asks with
    /// `Closed`. Idempotent.
    ///
    /// Written as an explicit boxed future (rather than `async fn`) because
    /// the recursive call into children's `close()` below defeats rustc's
    /// auto-`Send` inference for the opaque future type.
    pub fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            let deadline = Instant::now() + self.inner.system_settings.shutdown_timeout();

            let children: Vec<ActorHandler> = {
                let mut children = self.inner.children.write().await;
                children.drain().map(|(_, child)| child).collect()
            };
            // Children reach Terminated before this handler's own PostStop
            // runs. On a blown budget the child closes keep running detached.
            let child_joins: Vec<JoinHandle<()>> = children
                .into_iter()
                .map(|child| tokio::spawn(async move { child.close().await }))
                .collect();
            if timeout_at(deadline, join_all(child_joins)).await.is_err() {
                warn!(path = %self.path(), "shutdown timeout while closing children");
            }

            let workers: Vec<WorkerHandle> = {
                let mut workers = self.inner.workers.lock().unwrap_or_else(|e| e.into_inner());
                workers.drain(..).collect()
            };
            for worker in &workers {
                worker.done.cancel();
            }
            let worker_joins = join_all(workers.into_iter().map(|worker| worker.join));
            if timeout_at(deadline, worker_joins).await.is_err() {
                warn!(path = %self.path(), "shutdown timeout while stopping workers");
            }
            self.inner.mailbox.close();
        })
    }
}

impl fmt::Debug for ActorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorHandler({})", self.path())
    }
}

pub(crate) fn upgrade_handler(weak: &Weak<HandlerInner>) -> Option<ActorHandler> {
    weak.upgrade().map(|inner| ActorHandler { inner })
}

fn join_path(parent_path: &str, name: &str) -> String {
    if parent_path.ends_with('/') {
        format!("{}{}", parent_path, name)
    } else {
        format!("{}/{}", parent_path, name)
    }
}

fn resolve_name(name: &str, opts: &SpawnOpts, receiver: &dyn Receiver) -> String {
    if !name.is_empty() {
        return name.to_string();
    }
    opts.name
        .clone()
        .or_else(|| receiver.actor_name())
        .unwrap_or_else(|| format!("actor-{}", Uuid::new_v4()))
}

/// Drains the mailbox until the done signal fires or the mailbox closes,
/// then runs the user PostStop. In async dispatch mode every message is
/// processed on its own task; in sync mode one message at a time per
/// worker.
async fn worker_loop(
    ctx: Context,
    mailbox: Mailbox,
    receiver: Arc<dyn Receiver>,
    async_mode: bool,
) {
    loop {
        tokio::select! {
            biased;
            _ = ctx.done().cancelled() => break,
            message = mailbox.pop() => match message {
                Some(message) => {
                    if async_mode {
                        let receiver = receiver.clone();
                        let ctx = ctx.clone();
                        let span = ctx.span().clone();
                        tokio::spawn(dispatch(receiver, ctx, message).instrument(span));
                    } else {
                        dispatch(receiver.clone(), ctx.clone(), message).await;
                    }
                }
                None => break,
            },
        }
    }
    debug!("worker stopped");
    if let Err(err) = receiver.post_stop(&ctx).await {
        error!(error = %err, "post-stop failed");
    }
}

/// Invokes the receiver and settles the reply sink: an unanswered ask gets
/// a `Done` marker, a panicking receiver an `Internal` error. Panics never
/// take the worker down.
async fn dispatch(receiver: Arc<dyn Receiver>, ctx: Context, message: Message) {
    let sink = message.sink();
    let outcome = AssertUnwindSafe(receiver.receive(&ctx, message))
        .catch_unwind()
        .await;
    match outcome {
        Ok(()) => {
            if let Some(sink) = sink {
                sink.complete(payload(Done));
            }
        }
        Err(panic) => {
            let reason = panic_message(panic);
            error!(reason = %reason, "receiver panicked");
            if let Some(sink) = sink {
                sink.complete(payload(ActorError::internal(reason)));
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "receiver panicked".to_string()
    }
}
