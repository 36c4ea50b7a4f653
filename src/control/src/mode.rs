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

/// Which acquisition mode the workers are currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    None,
    Stream,
    Averaging,
}

/// The process-wide acquisition status, independent of which program is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Closed,
    Opened,
    Running,
    Stopped,
}

/// The process-wide `(program, status)` pair. Mutated only by [`crate::transition::transition`]
/// under the serial command stream, and once more by the Cam0-elected teardown at the end of
/// an averaging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub program: Program,
    pub status: Status,
}

impl ModeState {
    pub const fn initial() -> Self {
        ModeState { program: Program::None, status: Status::Closed }
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::initial()
    }
}
