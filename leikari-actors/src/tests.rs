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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::actor::{Actor, Receiver};
use crate::context::Context;
use crate::errors::{ActorError, ActorResult, ErrorKind};
use crate::message::{Done, Message, Payload};
use crate::pubsub::{filter_always, filter_type};
use crate::settings::{SpawnOpts, SystemSettings};
use crate::system::ActorSystem;

async fn test_system() -> ActorSystem {
    ActorSystem::new(SystemSettings::from_value(json!({ "nosignature": true })))
        .await
        .unwrap()
}

// Replies with the length of string payloads.
struct LenActor;

#[async_trait]
impl Receiver for LenActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        match msg.get::<String>() {
            Some(text) => {
                msg.reply(text.len());
            }
            None => {
                msg.reply(ActorError::unknown_command());
            }
        }
    }
}

#[tokio::test]
async fn test_ask_replies_with_length() {
    let system = test_system().await;
    let actor = system
        .execute(LenActor, "len", SpawnOpts::new())
        .await
        .unwrap();
    let reply = actor.ask("hello".to_string()).await.unwrap();
    assert_eq!(reply.downcast_ref::<usize>(), Some(&5));
    system.shutdown().await;
}

#[tokio::test]
async fn test_ask_surfaces_error_replies() {
    let system = test_system().await;
    let actor = system
        .execute(LenActor, "len", SpawnOpts::new())
        .await
        .unwrap();
    let err = actor.ask(42u32).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    system.shutdown().await;
}

struct NoReplyActor;

#[async_trait]
impl Receiver for NoReplyActor {
    async fn receive(&self, _ctx: &Context, _msg: Message) {}
}

#[tokio::test]
async fn test_unanswered_ask_completes_with_done() {
    let system = test_system().await;
    let actor = system
        .execute(NoReplyActor, "quiet", SpawnOpts::new())
        .await
        .unwrap();
    let reply = actor.ask(()).await.unwrap();
    assert!(reply.downcast_ref::<Done>().is_some());
    system.shutdown().await;
}

struct PanicActor;

#[async_trait]
impl Receiver for PanicActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        if msg.get::<String>().is_some() {
            panic!("boom");
        }
        msg.reply(1u32);
    }
}

#[tokio::test]
async fn test_receiver_panic_maps_to_internal_error() {
    let system = test_system().await;
    let actor = system
        .execute(PanicActor, "panicky", SpawnOpts::new())
        .await
        .unwrap();
    let err = actor.ask("blow up".to_string()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.message(), "boom");
    // The worker survives the panic.
    let reply = actor.ask(()).await.unwrap();
    assert_eq!(reply.downcast_ref::<u32>(), Some(&1));
    system.shutdown().await;
}

#[tokio::test]
async fn test_name_collision_fails_second_spawn() {
    let system = test_system().await;
    let parent = system
        .execute_service(NoReplyActor, "p", SpawnOpts::new())
        .await
        .unwrap();
    parent
        .execute(NoReplyActor, "w", SpawnOpts::new())
        .await
        .unwrap();
    let err = parent
        .execute(NoReplyActor, "w", SpawnOpts::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameExists);
    assert_eq!(parent.children().await.len(), 1);
    system.shutdown().await;
}

// Records post-stop order across a tree.
struct TreeActor {
    label: &'static str,
    stops: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Receiver for TreeActor {
    async fn receive(&self, _ctx: &Context, _msg: Message) {}

    async fn post_stop(&self, _ctx: &Context) -> ActorResult<()> {
        self.stops.lock().unwrap().push(self.label);
        Ok(())
    }
}

#[tokio::test]
async fn test_hierarchical_close_stops_children_first() {
    let system = test_system().await;
    let stops: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let tree = |label| TreeActor {
        label,
        stops: stops.clone(),
    };
    let a = system
        .execute_service(tree("a"), "a", SpawnOpts::new())
        .await
        .unwrap();
    let b = a.execute(tree("b"), "b", SpawnOpts::new()).await.unwrap();
    a.execute(tree("c"), "c", SpawnOpts::new()).await.unwrap();
    b.execute(tree("d"), "d", SpawnOpts::new()).await.unwrap();

    system.shutdown().await;

    let order = stops.lock().unwrap().clone();
    let position = |label| order.iter().position(|l| *l == label).unwrap();
    assert_eq!(order.len(), 4);
    assert!(position("d") < position("b"));
    assert!(position("b") < position("a"));
    assert!(position("c") < position("a"));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let system = test_system().await;
    let stops: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let handler = system
        .execute_service(
            TreeActor {
                label: "once",
                stops: stops.clone(),
            },
            "once",
            SpawnOpts::new(),
        )
        .await
        .unwrap();
    handler.close().await;
    handler.close().await;
    assert_eq!(stops.lock().unwrap().len(), 1);
    system.shutdown().await;
}

// Collects u32 payloads; asks answer with the collected snapshot.
struct CollectActor {
    seen: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Receiver for CollectActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        match msg.get::<u32>() {
            Some(n) => {
                self.seen.lock().unwrap().push(*n);
            }
            None => {
                msg.reply(self.seen.lock().unwrap().clone());
            }
        }
    }
}

#[tokio::test]
async fn test_single_worker_preserves_send_order() {
    let system = test_system().await;
    let seen = Arc::default();
    let actor = system
        .execute(
            CollectActor {
                seen: Arc::clone(&seen),
            },
            "collect",
            SpawnOpts::new(),
        )
        .await
        .unwrap();
    for n in 0..100u32 {
        actor.send(n).await.unwrap();
    }
    // The ask queues behind the tells, so the reply is the full sequence.
    let reply = actor.ask(()).await.unwrap();
    let collected = reply.downcast_ref::<Vec<u32>>().unwrap();
    assert_eq!(*collected, (0..100).collect::<Vec<u32>>());
    system.shutdown().await;
}

struct SlowActor {
    delay: Duration,
}

#[async_trait]
impl Receiver for SlowActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        tokio::time::sleep(self.delay).await;
        msg.reply(Done);
    }
}

#[tokio::test]
async fn test_close_fails_queued_asks_with_closed() {
    let system = test_system().await;
    let handler = system
        .execute_service(
            SlowActor {
                delay: Duration::from_millis(200),
            },
            "slow",
            SpawnOpts::new(),
        )
        .await
        .unwrap();
    let actor = handler.create_ref();
    // Occupy the single worker, then queue an ask behind it.
    actor.send(()).await.unwrap();
    let queued = {
        let actor = actor.clone();
        tokio::spawn(async move { actor.ask(()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    handler.close().await;
    let err = queued.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    // Sends after close fail fast.
    let err = actor.send(()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    system.shutdown().await;
}

#[tokio::test]
async fn test_try_send_fails_full_at_capacity() {
    let system = test_system().await;
    let actor = system
        .execute(
            SlowActor {
                delay: Duration::from_millis(200),
            },
            "busy",
            SpawnOpts::new().message_queue(1),
        )
        .await
        .unwrap();
    actor.send(()).await.unwrap();
    // Suspends until the worker picks the first message up, then fills the
    // single slot.
    actor.send(()).await.unwrap();
    let err = actor.try_send(()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Full);
    system.shutdown().await;
}

#[tokio::test]
async fn test_ask_cancellation_frees_the_caller() {
    let system = test_system().await;
    let actor = system
        .execute(
            SlowActor {
                delay: Duration::from_millis(300),
            },
            "sleepy",
            SpawnOpts::new(),
        )
        .await
        .unwrap();
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
    }
    let start = Instant::now();
    let err = actor.ask_with(&token, ()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(start.elapsed() < Duration::from_millis(250));
    // The receiver still runs and its late reply is discarded quietly.
    system.shutdown().await;
}

struct FlakyStart {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_at: usize,
}

#[async_trait]
impl Receiver for FlakyStart {
    async fn pre_start(&self, _ctx: &Context) -> ActorResult<()> {
        if self.starts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(ActorError::internal("pre-start refused"));
        }
        Ok(())
    }

    async fn receive(&self, _ctx: &Context, _msg: Message) {}

    async fn post_stop(&self, _ctx: &Context) -> ActorResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_pre_start_failure_rolls_back_started_workers() {
    let system = test_system().await;
    let starts = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));
    let err = system
        .execute(
            FlakyStart {
                starts: starts.clone(),
                stops: stops.clone(),
                fail_at: 3,
            },
            "flaky",
            SpawnOpts::new().worker_pool(3),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(starts.load(Ordering::SeqCst), 3);
    // Workers 0 and 1 had started and observed their done signal.
    assert_eq!(stops.load(Ordering::SeqCst), 2);
    // The name never registered.
    assert!(system.at("/usr/flaky").await.is_err());
    system.shutdown().await;
}

// Stores every delivered payload.
struct SinkActor {
    seen: Arc<Mutex<Vec<Payload>>>,
}

#[async_trait]
impl Receiver for SinkActor {
    async fn receive(&self, _ctx: &Context, msg: Message) {
        self.seen.lock().unwrap().push(msg.value().clone());
    }
}

#[tokio::test]
async fn test_pubsub_filters_and_orders_deliveries() {
    let system = test_system().await;
    let seen1: Arc<Mutex<Vec<Payload>>> = Arc::default();
    let seen2: Arc<Mutex<Vec<Payload>>> = Arc::default();
    let r1 = system
        .execute(SinkActor { seen: seen1.clone() }, "r1", SpawnOpts::new())
        .await
        .unwrap();
    let r2 = system
        .execute(SinkActor { seen: seen2.clone() }, "r2", SpawnOpts::new())
        .await
        .unwrap();
    system.subscribe(r1, filter_type::<i32>()).await.unwrap();
    system.subscribe(r2, filter_always()).await.unwrap();

    system.publish(42i32).await.unwrap();
    system.publish("x").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let seen1 = seen1.lock().unwrap();
    assert_eq!(seen1.len(), 1);
    assert_eq!(seen1[0].downcast_ref::<i32>(), Some(&42));

    let seen2 = seen2.lock().unwrap();
    assert_eq!(seen2.len(), 2);
    assert_eq!(seen2[0].downcast_ref::<i32>(), Some(&42));
    assert_eq!(seen2[1].downcast_ref::<&str>(), Some(&"x"));
    system.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribe_removes_every_entry() {
    let system = test_system().await;
    let seen: Arc<Mutex<Vec<Payload>>> = Arc::default();
    let subscriber = system
        .execute(SinkActor { seen: seen.clone() }, "sub", SpawnOpts::new())
        .await
        .unwrap();
    // Duplicate subscriptions deliver duplicates.
    system
        .subscribe(subscriber.clone(), filter_always())
        .await
        .unwrap();
    system
        .subscribe(subscriber.clone(), filter_always())
        .await
        .unwrap();
    system.publish(1i32).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().len(), 2);

    system.unsubscribe(subscriber).await.unwrap();
    system.publish(2i32).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
    system.shutdown().await;
}

#[tokio::test]
async fn test_path_and_lookup() {
    let system = test_system().await;
    let a = system
        .execute_service(NoReplyActor, "a", SpawnOpts::new())
        .await
        .unwrap();
    let b = a.execute(NoReplyActor, "b", SpawnOpts::new()).await.unwrap();
    assert_eq!(a.path(), "/svc/a");
    assert_eq!(b.path(), "/svc/a/b");
    assert_eq!(system.root().path(), "/");

    assert_eq!(b.at("/").await.unwrap().path(), "/");
    assert_eq!(b.at("/svc/a/b").await.unwrap().path(), "/svc/a/b");
    assert_eq!(b.at("..").await.unwrap().path(), "/svc/a");
    assert_eq!(b.at("../b").await.unwrap().path(), "/svc/a/b");
    assert_eq!(a.at("./b").await.unwrap().path(), "/svc/a/b");
    assert_eq!(a.at("b").await.unwrap().path(), "/svc/a/b");
    assert_eq!(b.at("/usr").await.unwrap().path(), "/usr");
    assert!(a.at("missing").await.is_none());
    assert!(system.at("/nope").await.is_err());
    system.shutdown().await;
}

#[tokio::test]
async fn test_actor_builder_and_name_fallback() {
    let system = test_system().await;
    let doubler = Actor::new(|_ctx, msg| async move {
        if let Some(n) = msg.get::<i32>() {
            msg.reply(n * 2);
        }
    })
    .named("doubler");
    let actor = system.execute(doubler, "", SpawnOpts::new()).await.unwrap();
    let reply = actor.ask(21i32).await.unwrap();
    assert_eq!(reply.downcast_ref::<i32>(), Some(&42));
    assert!(system.at("/usr/doubler").await.is_ok());
    system.shutdown().await;
}

#[tokio::test]
async fn test_async_mode_processes_messages_concurrently() {
    let system = test_system().await;
    let actor = system
        .execute(
            SlowActor {
                delay: Duration::from_millis(100),
            },
            "parallel",
            SpawnOpts::new().async_mode(true),
        )
        .await
        .unwrap();
    let start = Instant::now();
    let asks = (0..5).map(|_| actor.ask(()));
    let replies = futures::future::join_all(asks).await;
    assert!(replies.into_iter().all(|reply| reply.is_ok()));
    // Five 100ms messages on one worker finish together, not serially.
    assert!(start.elapsed() < Duration::from_millis(400));
    system.shutdown().await;
}

#[tokio::test]
async fn test_worker_pool_drains_in_parallel() {
    let system = test_system().await;
    let actor = system
        .execute(
            SlowActor {
                delay: Duration::from_millis(100),
            },
            "pooled",
            SpawnOpts::new().worker_pool(2),
        )
        .await
        .unwrap();
    let start = Instant::now();
    let replies = futures::future::join_all(vec![actor.ask(()), actor.ask(())]).await;
    assert!(replies.into_iter().all(|reply| reply.is_ok()));
    assert!(start.elapsed() < Duration::from_millis(180));
    system.shutdown().await;
}

#[tokio::test]
async fn test_settings_drive_spawn_configuration() {
    let system = ActorSystem::new(SystemSettings::from_value(json!({
        "nosignature": true,
        "actor": { "cfg": { "workerPool": 2, "messageQueue": 7, "async": true } }
    })))
    .await
    .unwrap();
    let handler = system
        .execute_service(NoReplyActor, "cfg", SpawnOpts::new())
        .await
        .unwrap();
    assert_eq!(handler.settings().worker_pool, 2);
    assert_eq!(handler.settings().message_queue, 7);
    assert!(handler.settings().async_mode);
    system.shutdown().await;
}

#[tokio::test]
async fn test_terminate_reports_exit_code() {
    let system = test_system().await;
    system.terminate(3);
    assert_eq!(system.terminated().await, 3);
}

// Spawns a child from inside receive and proxies asks through to it.
struct ProxyActor;

#[async_trait]
impl Receiver for ProxyActor {
    async fn receive(&self, ctx: &Context, msg: Message) {
        let child = match ctx.at("child").await {
            Ok(child) => child,
            Err(_) => match ctx.spawn(LenActor, "child", SpawnOpts::new()).await {
                Ok(child) => child,
                Err(err) => {
                    msg.reply(err);
                    return;
                }
            },
        };
        match child.ask_payload(msg.value().clone()).await {
            Ok(reply) => msg.reply_payload(reply),
            Err(err) => msg.reply(err),
        };
    }
}

#[tokio::test]
async fn test_context_spawn_and_relative_lookup() {
    let system = test_system().await;
    let proxy = system
        .execute(ProxyActor, "proxy", SpawnOpts::new())
        .await
        .unwrap();
    let reply = proxy.ask("four".to_string()).await.unwrap();
    assert_eq!(reply.downcast_ref::<usize>(), Some(&4));
    assert!(system.at("/usr/proxy/child").await.is_ok());
    system.shutdown().await;
}
