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

/// Failures standing up the control socket. Per the error design these are startup-only: once
/// the accept thread is running, connection-level failures are logged and the accept loop
/// continues rather than surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("could not bind control socket on port {port}: {source}")]
    Bind { port: u16, #[source] source: std::io::Error },

    #[error("could not spawn control accept thread: {0}")]
    ThreadSpawn(std::io::Error),
}
