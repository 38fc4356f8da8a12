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
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;

use crate::actor::Receiver;
use crate::actor_ref::Ref;
use crate::context::Context;
use crate::errors::{ActorError, ActorResult};
use crate::handler::ActorHandler;
use crate::message::{payload, Message};
use crate::pubsub::{Filter, Publish, RootActor, Subscribe, Unsubscribe};
use crate::settings::{SpawnOpts, SystemSettings};
use crate::timer::{ticker, timer, Ticker, TimerHandle};

const SIGNATURE: &str = r#"
 _     _____ ___ _  __    _    ____  ___
| |   | ____|_ _| |/ /   / \  |  _ \|_ _|
| |   |  _|  | || ' /   / _ \ | |_) || |
| |___| |___ | || . \  / ___ \|  _ < | |
|_____|_____|___|_|\_\/_/   \_\_| \_\___|
"#;

/// Anchor of the `usr` and `svc` subtrees; has no behavior of its own.
struct SubtreeActor;

#[async_trait]
impl Receiver for SubtreeActor {
    async fn receive(&self, _ctx: &Context, _msg: Message) {}
}

/// Top-level owner of the actor tree.
///
/// Holds the root (which hosts pub/sub) and its two well-known subtrees:
/// `usr` for user actors and `svc` for long-running services. Interrupt and
/// termination signals trigger a graceful `terminate(0)`.
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl Clone for ActorSystem {
    fn clone(&self) -> Self {
        ActorSystem {
            inner: self.inner.clone(),
        }
    }
}

struct SystemInner {
    settings: Arc<SystemSettings>,
    root: ActorHandler,
    usr: ActorHandler,
    svc: ActorHandler,
    exit_tx: mpsc::Sender<i32>,
    exit_rx: StdMutex<Option<mpsc::Receiver<i32>>>,
}

impl ActorSystem {
    pub async fn new(settings: SystemSettings) -> ActorResult<ActorSystem> {
        let settings = Arc::new(settings);
        if !settings.no_signature() {
            println!("{}", SIGNATURE);
        }
        let root = ActorHandler::spawn_root(settings.clone(), Arc::new(RootActor::default())).await?;
        let usr = root.execute(SubtreeActor, "usr", SpawnOpts::new()).await?;
        let svc = root.execute(SubtreeActor, "svc", SpawnOpts::new()).await?;
        let (exit_tx, exit_rx) = mpsc::channel(1);
        let system = ActorSystem {
            inner: Arc::new(SystemInner {
                settings,
                root,
                usr,
                svc,
                exit_tx,
                exit_rx: StdMutex::new(Some(exit_rx)),
            }),
        };
        system.install_signal_handler();
        Ok(system)
    }

    /// System from the discovered config file and environment.
    pub async fn load() -> ActorResult<ActorSystem> {
        ActorSystem::new(SystemSettings::load()).await
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.inner.settings
    }

    pub fn root(&self) -> &ActorHandler {
        &self.inner.root
    }

    /// Spawns a user actor under `/usr`.
    pub async fn execute<R: Receiver>(
        &self,
        receiver: R,
        name: &str,
        opts: SpawnOpts,
    ) -> ActorResult<Ref> {
        let handler = self.inner.usr.execute(receiver, name, opts).await?;
        Ok(handler.create_ref())
    }

    /// Spawns a long-running service under `/svc`, handing back the
    /// handler for lifecycle control.
    pub async fn execute_service<R: Receiver>(
        &self,
        receiver: R,
        name: &str,
        opts: SpawnOpts,
    ) -> ActorResult<ActorHandler> {
        self.inner.svc.execute(receiver, name, opts).await
    }

    /// A reference for the actor at an absolute path, or `NotFound`.
    pub async fn at(&self, path: &str) -> ActorResult<Ref> {
        match self.inner.root.at(path).await {
            Some(handler) => Ok(handler.create_ref()),
            None => Err(ActorError::not_found(format!("no actor at '{}'", path))),
        }
    }

    pub async fn subscribe(&self, subscriber: Ref, filter: Filter) -> ActorResult<()> {
        self.inner
            .root
            .create_ref()
            .send(Subscribe { subscriber, filter })
            .await
    }

    pub async fn unsubscribe(&self, subscriber: Ref) -> ActorResult<()> {
        self.inner
            .root
            .create_ref()
            .send(Unsubscribe { subscriber })
            .await
    }

    pub async fn publish<T: Any + Send + Sync>(&self, value: T) -> ActorResult<()> {
        self.inner
            .root
            .create_ref()
            .send(Publish {
                content: payload(value),
            })
            .await
    }

    /// Fires `f` once after `duration`.
    pub fn timer<F>(&self, duration: Duration, f: F) -> TimerHandle
    where
        F: FnOnce(DateTime<Utc>) + Send + 'static,
    {
        timer(duration, f)
    }

    /// Fires `f` every `duration` until the returned controller is stopped
    /// or dropped.
    #[must_use]
    pub fn ticker<F>(&self, duration: Duration, f: F) -> Ticker
    where
        F: Fn(DateTime<Utc>) + Send + Sync + 'static,
    {
        ticker(duration, f)
    }

    fn install_signal_handler(&self) {
        let system = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            info!(signal, "received signal");
            system.terminate(0);
        });
    }

    /// Initiates graceful shutdown in the background and arranges for
    /// [`ActorSystem::run`] to exit with `code`.
    pub fn terminate(&self, code: i32) {
        let system = self.clone();
        tokio::spawn(async move {
            system.shutdown().await;
            let _ = system.inner.exit_tx.send(code).await;
        });
    }

    /// Closes the tree bottom-up, then sleeps briefly so in-flight replies
    /// drain.
    pub async fn shutdown(&self) {
        self.inner.root.close().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    /// Resolves with the exit code once [`ActorSystem::terminate`] ran.
    pub async fn terminated(&self) -> i32 {
        let exit_rx = {
            let mut guard = self.inner.exit_rx.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        match exit_rx {
            Some(mut exit_rx) => exit_rx.recv().await.unwrap_or(0),
            None => 0,
        }
    }

    /// Blocks until termination and exits the process with its code.
    pub async fn run(&self) -> ! {
        let code = self.terminated().await;
        std::process::exit(code)
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};
    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(mut interrupt), Ok(mut terminate)) => {
            tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            }
        }
        _ => {
            let _ = tokio::signal::ctrl_c().await;
            "interrupt"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "interrupt"
}

/// Installs a fmt subscriber honoring the `loglevel` setting. A no-op when
/// a global subscriber is already set.
pub fn setup_logging(settings: &SystemSettings) {
    let level = match settings.loglevel().to_uppercase().as_str() {
        "DEBUG" => tracing::Level::DEBUG,
        "WARN" => tracing::Level::WARN,
        "ERROR" | "FATAL" | "PANIC" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
