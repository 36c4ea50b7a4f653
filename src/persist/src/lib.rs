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

//! Turns a completed accumulation region, or a stopped stream ring, into files on disk, and
//! reports what happened back to the control socket through [`Announce`].

mod announce;
mod avg_writer;
mod error;
mod layout;
mod narrow;
mod stream_writer;

pub use announce::{Announce, LoggingAnnouncer};
pub use avg_writer::run_avg_writer;
pub use error::PersistError;
pub use layout::{avg_file_path, stream_dir_path, stream_frame_path};
pub use narrow::{narrow16, payload_bytes, PayloadFormat, FITS_HEADER_BYTES};
pub use stream_writer::flush_stream_rings;
