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

//! Frame-grabber board abstraction.
//!
//! This is the only place the specific vendor capture SDK would be touched by a real
//! deployment. Everything above a [`Board`] sees only this trait: open a board, size its
//! circular buffer, start/stop/pause/abort it, block for the next completed frame, and
//! release that frame back to the board's free list.
//!
//! [`sim`] provides an in-process backend with no physical hardware, used by tests and by
//! development builds that run without a frame grabber attached.

mod sim;

pub use sim::{ConstantFrameGenerator, FrameGenerator, SimulatedBoardFactory};

use std::fmt;

/// Raw frame width in pixels.
pub const FRAME_WIDTH: usize = 1024;
/// Raw frame height in pixels.
pub const FRAME_HEIGHT: usize = 1024;
/// Pixels per raw frame (`FRAME_WIDTH * FRAME_HEIGHT`).
pub const PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Failure modes surfaced by the board abstraction.
///
/// Variant names mirror the vendor SDK's status codes one-for-one so the mapping from a
/// real backend's return codes stays mechanical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The board could not be opened (hardware absent, already owned, driver failure).
    #[error("board hardware unavailable")]
    HardwareUnavailable,
    /// Circular acquisition was hard-aborted while a caller was waiting.
    #[error("acquisition aborted")]
    Aborted,
    /// Circular acquisition was cooperatively stopped while a caller was waiting.
    #[error("acquisition stopped")]
    Stopped,
    /// No frame arrived within the wait.
    #[error("wait for completed frame timed out")]
    Timeout,
    /// The circular buffer held nothing to return.
    #[error("frame queue is empty")]
    QueueEmpty,
    /// The wait primitive itself failed (a driver or OS-level failure, not a frame-side one).
    #[error("internal wait failed")]
    InternalWaitFailed,
}

/// Cumulative capture counters for a board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureCounters {
    /// Total frames successfully captured since the board was opened.
    pub captured: u64,
    /// Total frames the board reports as missed (never landed in the ring).
    pub missed: u64,
}

/// An asynchronous, board-level error observed outside the frame wait path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAsyncError(pub String);

impl fmt::Display for BoardAsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handle to one completed raw frame living in board memory.
///
/// Must be released back to the board exactly once. There is deliberately no `Clone` impl:
/// the type system, not a runtime check, is what keeps a handle from being released twice or
/// leaked into two accumulation paths at once.
pub struct FrameHandle {
    pixels: std::sync::Arc<[u16]>,
    /// Frames the board reported still queued behind this one at the moment it was returned.
    pub queued_behind: u32,
}

impl FrameHandle {
    /// Construct a handle over already-captured pixel data. Backends call this; acquisition
    /// workers only ever receive handles, never build them.
    pub fn new(pixels: std::sync::Arc<[u16]>, queued_behind: u32) -> Self {
        debug_assert_eq!(pixels.len(), PIXELS);
        FrameHandle { pixels, queued_behind }
    }

    /// The raw 16-bit samples, in row-major order.
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }
}

/// The circular-buffer frame-grabber interface.
///
/// All methods are synchronous from the caller's point of view, even though a real backend
/// drives an asynchronous vendor API underneath: `start`/`stop`/`pause`/`resume`/`abort` return
/// once the request has been issued, not once it has taken effect, and `wait_done` is the one
/// call that blocks for real work to complete.
pub trait Board: Send + Sync {
    /// Resize the circular buffer. Must be called before `start`; the caller picks `n` to match
    /// the active mode (1984 for stream, 1032 for averaging).
    fn set_buffers(&mut self, n: u32) -> Result<(), BoardError>;

    /// Begin circular acquisition. Asynchronous: does not wait for the first frame.
    fn start(&self) -> Result<(), BoardError>;

    /// Cooperative stop: acquisition winds down, in-flight frames are not discarded.
    fn stop(&self) -> Result<(), BoardError>;

    /// Pause acquisition without releasing resources.
    fn pause(&self) -> Result<(), BoardError>;

    /// Resume a paused board.
    fn resume(&self) -> Result<(), BoardError>;

    /// Hard abort: acquisition stops immediately, in-flight frames are discarded.
    fn abort(&self) -> Result<(), BoardError>;

    /// Block until the next frame completes, or until the board is cleaned up.
    fn wait_done(&self) -> Result<FrameHandle, BoardError>;

    /// Return a handle to the board's free list. Must be called exactly once per handle
    /// returned by `wait_done`.
    fn release(&self, handle: FrameHandle);

    /// Number of completed frames currently queued behind the most recently returned one.
    fn queue_size(&self) -> u32;

    /// Cumulative captured/missed counters.
    fn capture_counters(&self) -> CaptureCounters;

    /// Block until the board reports an asynchronous error (not tied to a particular frame).
    fn wait_error(&self) -> BoardAsyncError;

    /// Drain and return every asynchronous error currently queued, without blocking.
    fn drain_errors(&self) -> Vec<BoardAsyncError>;

    /// True once `stop`/`abort` has fully quiesced the board and callers blocked in
    /// `wait_done` should unblock and exit rather than retry.
    fn is_cleanup(&self) -> bool;
}

/// Opens boards by index. A real deployment implements this against the vendor SDK; tests and
/// development builds use [`SimulatedBoardFactory`].
pub trait BoardFactory: Send + Sync {
    /// Open board `index`. On failure the board is considered closed and must not be used.
    fn open(&self, index: u32) -> Result<Box<dyn Board>, BoardError>;
}
