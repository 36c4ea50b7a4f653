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

/// Sends an 80-byte fixed outbound message to whatever client is currently connected.
///
/// Implemented by the control plane's socket writer; writer workers, acquisition workers and
/// the state machine all go through this instead of touching the socket directly, so that
/// concurrent emitters never interleave a partial message.
pub trait Announce: Send + Sync {
    fn announce(&self, message: &str);
}

/// An [`Announce`] that only logs; used when no client is connected and by tests.
pub struct LoggingAnnouncer;

impl Announce for LoggingAnnouncer {
    fn announce(&self, message: &str) {
        log::info!("(no client) {message}");
    }
}
