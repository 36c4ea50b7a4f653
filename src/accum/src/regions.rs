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

use crate::event::{LagCounter, ReadyEvent};
use crate::region::AccumRegion;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Which half of the double buffer an acquisition cycle is currently targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    X,
    Y,
}

impl RegionId {
    pub fn flip(self) -> RegionId {
        match self {
            RegionId::X => RegionId::Y,
            RegionId::Y => RegionId::X,
        }
    }
}

/// One accumulation region plus the readiness events and lag counters that coordinate its
/// acquisition-worker/writer-worker hand-off.
pub struct RegionSlot {
    pub buffer: Mutex<AccumRegion>,
    /// Indexed by camera (0, 1).
    pub ready: [ReadyEvent; 2],
    /// Indexed by camera (0, 1).
    pub lag: [LagCounter; 2],
    /// UTC timestamp of the start of the current writing phase; only Cam0 sets this, to avoid
    /// a race between the two acquisition workers.
    pub timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl RegionSlot {
    fn new() -> Self {
        RegionSlot {
            buffer: Mutex::new(AccumRegion::new()),
            ready: [ReadyEvent::new(), ReadyEvent::new()],
            lag: [LagCounter::new(), LagCounter::new()],
            timestamp: Mutex::new(None),
        }
    }
}

/// The X and Y accumulation regions shared between the two acquisition workers and the two
/// writer workers.
pub struct Regions {
    pub x: RegionSlot,
    pub y: RegionSlot,
}

impl Regions {
    pub fn new() -> Self {
        Regions { x: RegionSlot::new(), y: RegionSlot::new() }
    }

    pub fn slot(&self, id: RegionId) -> &RegionSlot {
        match id {
            RegionId::X => &self.x,
            RegionId::Y => &self.y,
        }
    }

    /// Signal every readiness event across both regions. Used during shutdown to release any
    /// writer blocked in [`RegionSlot::ready`](ReadyEvent::wait).
    pub fn signal_all(&self) {
        for slot in [&self.x, &self.y] {
            for event in &slot.ready {
                event.signal();
            }
        }
    }
}

impl Default for Regions {
    fn default() -> Self {
        Self::new()
    }
}
