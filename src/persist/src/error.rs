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

/// Failures writing a completed accumulation or stream flush to disk.
///
/// Per the error-handling design, nothing here is retried: the writer logs and proceeds to
/// its next cycle.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("could not create output directory {path}: {source}")]
    CreateDir { path: std::path::PathBuf, #[source] source: std::io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: std::path::PathBuf, #[source] source: std::io::Error },
}
