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

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::spawn;
use tokio::time;

/// Handle of a one-shot timer; cancelling is optional.
pub struct TimerHandle {
    join: tokio::task::JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.join.abort();
    }
}

/// Fires `f` once after `duration` on a background task.
pub fn timer<F>(duration: Duration, f: F) -> TimerHandle
where
    F: FnOnce(DateTime<Utc>) + Send + 'static,
{
    let join = spawn(async move {
        time::sleep(duration).await;
        f(Utc::now());
    });
    TimerHandle { join }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    Running,
    Stopped,
}

/// Controller of a repeating timer. The tick loop observes the controller
/// through a weak reference, so dropping it stops the loop as well.
pub struct Ticker {
    state: Arc<RwLock<TickerState>>,
}

impl Ticker {
    pub fn stop(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = TickerState::Stopped;
    }

    pub fn state(&self) -> TickerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fires `f` every `duration` until the returned controller is stopped or
/// dropped.
#[must_use]
pub fn ticker<F>(duration: Duration, f: F) -> Ticker
where
    F: Fn(DateTime<Utc>) + Send + Sync + 'static,
{
    let state = Arc::new(RwLock::new(TickerState::Running));
    let state_weak = Arc::downgrade(&state);
    spawn(async move {
        let mut interval = time::interval(duration);
        // The first tick completes immediately; the cadence starts after
        // one full period.
        interval.tick().await;
        loop {
            interval.tick().await;
            match state_weak.upgrade() {
                Some(state) => {
                    let snapshot = *state.read().unwrap_or_else(|e| e.into_inner());
                    if snapshot == TickerState::Stopped {
                        return;
                    }
                    f(Utc::now());
                }
                None => {
                    return;
                }
            }
        }
    });
    Ticker { state }
}
