// Copyright 2017 The Gfx-rs Developers.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};

/// An auto-reset, single-producer/single-consumer readiness signal.
///
/// An acquisition worker calls [`signal`](Self::signal) once it has finished its share of an
/// accumulation cycle; the paired writer calls [`wait`](Self::wait) and is released exactly
/// once per signal. Shutdown also calls `signal` directly on every event so a writer blocked
/// here wakes up and can observe the cleared run flag instead of hanging forever.
pub struct ReadyEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl ReadyEvent {
    pub fn new() -> Self {
        ReadyEvent { signaled: Mutex::new(false), cond: Condvar::new() }
    }

    pub fn signal(&self) {
        *self.signaled.lock().unwrap() = true;
        self.cond.notify_all();
    }

    /// Block until signaled, then reset.
    pub fn wait(&self) {
        let mut g = self.signaled.lock().unwrap();
        while !*g {
            g = self.cond.wait(g).unwrap();
        }
        *g = false;
    }
}

impl Default for ReadyEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-region, per-camera count of frames the board reported still queued at the moment of a
/// wait-completion. A proxy for "the writer fell behind the acquisition rate".
#[derive(Default)]
pub struct LagCounter {
    count: AtomicU32,
}

impl LagCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u32) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Read and reset to zero; called by the writer once it has reported the count.
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::SeqCst)
    }

    /// Read without resetting; used for a cumulative report that doesn't own the counter's
    /// reset point (the region's own writer still drains it with `take`).
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn signal_wakes_a_blocked_waiter() {
        let event = Arc::new(ReadyEvent::new());
        let waiter = event.clone();
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(20));
        event.signal();
        handle.join().unwrap();
    }

    #[test]
    fn lag_counter_accumulates_and_resets() {
        let lag = LagCounter::new();
        lag.add(3);
        lag.add(2);
        assert_eq!(lag.take(), 5);
        assert_eq!(lag.take(), 0);
    }

    #[test]
    fn lag_counter_peek_does_not_reset() {
        let lag = LagCounter::new();
        lag.add(4);
        assert_eq!(lag.peek(), 4);
        assert_eq!(lag.peek(), 4);
        assert_eq!(lag.take(), 4);
    }
}
