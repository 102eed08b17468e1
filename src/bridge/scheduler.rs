// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device recurring poll timers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Function invoked on every poll.
///
/// It must not block: implementations spawn the actual fetch, so that
/// overlapping polls of the same device are possible.
pub type PollFn = Arc<dyn Fn() + Send + Sync>;

struct PollTask {
    poll: PollFn,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl PollTask {
    fn is_active(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn restart(&mut self, interval: Duration) {
        self.cancel();
        self.interval = interval;
        self.timer = Some(spawn_timer(Arc::clone(&self.poll), interval));
    }
}

/// Table of poll tasks keyed by device id.
///
/// Holds at most one recurring timer per device. The scheduler is owned by a
/// single task and is not shared, so none of its operations lock.
///
/// Operations on an unknown device id are no-ops; lifecycle events and
/// commands may legitimately race.
#[derive(Default)]
pub struct PollScheduler {
    tasks: HashMap<String, PollTask>,
}

impl PollScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `poll` to `device_id` and starts its recurring timer.
    ///
    /// A timer already running for `device_id` is cancelled first.
    pub fn register(&mut self, device_id: &str, poll: PollFn, interval: Duration) {
        if let Some(mut previous) = self.tasks.remove(device_id) {
            previous.cancel();
        }

        let mut task = PollTask {
            poll,
            interval,
            timer: None,
        };
        task.restart(interval);
        self.tasks.insert(device_id.to_string(), task);

        tracing::debug!(device_id, interval_ms = interval.as_millis(), "Registered poll task");
    }

    /// Restarts the timer of a registered device.
    ///
    /// Returns `false` if `device_id` was never registered.
    pub fn start(&mut self, device_id: &str, interval: Duration) -> bool {
        let Some(task) = self.tasks.get_mut(device_id) else {
            tracing::debug!(device_id, "Ignoring start for unregistered device");
            return false;
        };
        task.restart(interval);
        tracing::debug!(device_id, interval_ms = interval.as_millis(), "Started poll task");
        true
    }

    /// Cancels the timer of `device_id`, keeping its binding.
    ///
    /// Returns `false` if `device_id` was never registered.
    pub fn stop(&mut self, device_id: &str) -> bool {
        let Some(task) = self.tasks.get_mut(device_id) else {
            tracing::debug!(device_id, "Ignoring stop for unregistered device");
            return false;
        };
        task.cancel();
        tracing::debug!(device_id, "Stopped poll task");
        true
    }

    /// Runs the bound poll function once without touching the schedule.
    ///
    /// Returns `false` if `device_id` was never registered.
    pub fn trigger_now(&self, device_id: &str) -> bool {
        let Some(task) = self.tasks.get(device_id) else {
            tracing::debug!(device_id, "Ignoring trigger for unregistered device");
            return false;
        };
        (task.poll)();
        true
    }

    /// Returns `true` if `device_id` has a poll function bound.
    #[must_use]
    pub fn is_registered(&self, device_id: &str) -> bool {
        self.tasks.contains_key(device_id)
    }

    /// Returns `true` if the timer of `device_id` is running.
    #[must_use]
    pub fn is_active(&self, device_id: &str) -> bool {
        self.tasks.get(device_id).is_some_and(PollTask::is_active)
    }

    /// Returns the interval of the last (re)start of `device_id`.
    #[must_use]
    pub fn interval(&self, device_id: &str) -> Option<Duration> {
        self.tasks.get(device_id).map(|task| task.interval)
    }

    /// Returns the number of running timers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|task| task.is_active()).count()
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollScheduler")
            .field("registered", &self.tasks.len())
            .field("active", &self.active_count())
            .finish()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        for task in self.tasks.values_mut() {
            task.cancel();
        }
    }
}

fn spawn_timer(poll: PollFn, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            poll();
        }
    })
}
