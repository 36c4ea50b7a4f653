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

//! Top-level startup failures. Everything that can go wrong once the process is up and running
//! (a board that won't open, a write that fails, a client that drops) is logged where it
//! happens instead of unwinding here: this enum only covers failures that keep the process from
//! ever reaching its main loop.

/// Failure to stand the process up at all.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Control(#[from] kcor_control::ControlError),
}
