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

//! The accumulation engine: acquisition workers, the double-buffered accumulation regions
//! they fill, and the readiness events that hand a completed region off to its writer.
//!
//! This crate owns everything between a [`kcor_board::Board`] and a narrowed, written-out
//! file: LUT-indexed accumulation for averaging mode (`worker`), the unaccumulated ring used
//! by stream mode (`stream`), and the shared region/event/lag-counter state both modes
//! coordinate through (`regions`, `event`, `region`).

mod config;
mod event;
mod region;
mod regions;
mod stream;
mod worker;

pub use config::AveragingConfig;
pub use event::{LagCounter, ReadyEvent};
pub use region::{AccumRegion, HALF_LEN};
pub use regions::{RegionId, RegionSlot, Regions};
pub use stream::{run_stream_worker, StreamRing};
pub use worker::run_averaging_worker;
