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

//! The control plane: the ASCII command parser, the `(program, status)` state machine, and
//! the single-client TCP socket that feeds commands to it and carries outbound reports.

mod command;
mod error;
mod mode;
mod socket;
mod transition;

pub use command::{parse, Command, DesiredStatus};
pub use error::ControlError;
pub use mode::{ModeState, Program, Status};
pub use socket::{spawn_accept_thread, SocketAnnouncer, MESSAGE_LEN};
pub use transition::{quit_actions, transition, Action, AVERAGING_RING_DEPTH, STREAM_RING_DEPTH};
