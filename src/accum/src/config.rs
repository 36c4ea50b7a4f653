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

/// Parameters captured once, at the start of an `avging start` command, and held fixed for the
/// lifetime of the averaging session that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragingConfig {
    /// Integrations accumulated per quad state before a region is handed to its writer.
    pub num_integrations: u32,
    /// Accepted and logged, otherwise unused; see the design notes on `qIndxStart`.
    pub starting_quad_state: u32,
    /// Whether the last ring of raw frames is dumped to disk on stop/gentle-stop.
    pub dump_avg_images: bool,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        AveragingConfig { num_integrations: 512, starting_quad_state: 0, dump_avg_images: false }
    }
}
