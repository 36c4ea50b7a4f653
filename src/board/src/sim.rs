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

//! A simulated board backend with no physical hardware behind it.
//!
//! Used by tests and by development builds that need to exercise the acquisition pipeline
//! without a frame grabber attached. A background thread plays the role of the vendor's DMA
//! engine, pushing synthetic frames into a bounded ring; callers pull them out through the
//! ordinary [`Board`](crate::Board) interface, including a queue depth that grows if the
//! consumer falls behind.

use crate::{BoardAsyncError, BoardError, BoardFactory, CaptureCounters, FrameHandle, PIXELS};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Produces the raw pixel content of one simulated frame.
pub trait FrameGenerator: Send {
    /// Build the pixel buffer for `frame_index` (monotonically increasing per board).
    fn generate(&mut self, frame_index: u64) -> Arc<[u16]>;
}

/// A generator whose pixel value is simply `pixel_index % 4096`, independent of which frame
/// or camera it belongs to. Matches the synthetic frames used in the cold-start averaging
/// test scenario, where every raw sample is expected to land in `0..4096`.
#[derive(Clone, Default)]
pub struct ConstantFrameGenerator;

impl FrameGenerator for ConstantFrameGenerator {
    fn generate(&mut self, _frame_index: u64) -> Arc<[u16]> {
        (0..PIXELS).map(|i| (i % 4096) as u16).collect()
    }
}

struct Inner {
    queue: Mutex<VecDeque<Arc<[u16]>>>,
    not_empty: Condvar,
    capacity: Mutex<u32>,
    running: AtomicBool,
    aborted: AtomicBool,
    stopped: AtomicBool,
    next_index: AtomicU64,
    captured: AtomicU64,
    missed: AtomicU64,
    async_errors: Mutex<VecDeque<BoardAsyncError>>,
    async_cond: Condvar,
    generator: Mutex<Box<dyn FrameGenerator>>,
    frame_limit: Option<u64>,
    producer: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Inner {
    fn is_cleanup(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
            || (self.stopped.load(Ordering::SeqCst) && self.queue.lock().unwrap().is_empty())
    }
}

/// A single simulated board. Cameras 0 and 1 each get their own instance from the same
/// [`SimulatedBoardFactory`], each with its own generator and ring.
pub struct SimulatedBoard {
    inner: Arc<Inner>,
}

impl SimulatedBoard {
    fn new(generator: Box<dyn FrameGenerator>, frame_limit: Option<u64>) -> Self {
        SimulatedBoard {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                not_empty: Condvar::new(),
                capacity: Mutex::new(1032),
                running: AtomicBool::new(false),
                aborted: AtomicBool::new(false),
                stopped: AtomicBool::new(true),
                next_index: AtomicU64::new(0),
                captured: AtomicU64::new(0),
                missed: AtomicU64::new(0),
                async_errors: Mutex::new(VecDeque::new()),
                async_cond: Condvar::new(),
                generator: Mutex::new(generator),
                frame_limit,
                producer: Mutex::new(None),
            }),
        }
    }
}

impl crate::Board for SimulatedBoard {
    fn set_buffers(&mut self, n: u32) -> Result<(), BoardError> {
        *self.inner.capacity.lock().unwrap() = n;
        Ok(())
    }

    fn start(&self) -> Result<(), BoardError> {
        self.inner.aborted.store(false, Ordering::SeqCst);
        self.inner.stopped.store(false, Ordering::SeqCst);
        self.inner.running.store(true, Ordering::SeqCst);

        let inner = self.inner.clone();
        let handle = thread::spawn(move || {
            loop {
                if !inner.running.load(Ordering::SeqCst) {
                    break;
                }
                let idx = inner.next_index.fetch_add(1, Ordering::SeqCst);
                if let Some(limit) = inner.frame_limit {
                    if idx >= limit {
                        // Production is exhausted; idle until told to stop.
                        thread::sleep(Duration::from_millis(1));
                        continue;
                    }
                }
                let frame = inner.generator.lock().unwrap().generate(idx);
                let mut q = inner.queue.lock().unwrap();
                let cap = *inner.capacity.lock().unwrap() as usize;
                if q.len() >= cap {
                    inner.missed.fetch_add(1, Ordering::SeqCst);
                } else {
                    q.push_back(frame);
                    inner.captured.fetch_add(1, Ordering::SeqCst);
                }
                drop(q);
                inner.not_empty.notify_one();
            }
        });
        *self.inner.producer.lock().unwrap() = Some(handle);
        log::debug!("simulated board started");
        Ok(())
    }

    fn stop(&self) -> Result<(), BoardError> {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.not_empty.notify_all();
        Ok(())
    }

    fn pause(&self) -> Result<(), BoardError> {
        self.inner.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), BoardError> {
        self.inner.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn abort(&self) -> Result<(), BoardError> {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.queue.lock().unwrap().clear();
        self.inner.not_empty.notify_all();
        Ok(())
    }

    fn wait_done(&self) -> Result<FrameHandle, BoardError> {
        let mut q = self.inner.queue.lock().unwrap();
        loop {
            if self.inner.aborted.load(Ordering::SeqCst) {
                return Err(BoardError::Aborted);
            }
            if let Some(pixels) = q.pop_front() {
                let queued_behind = q.len() as u32;
                return Ok(FrameHandle::new(pixels, queued_behind));
            }
            if self.inner.stopped.load(Ordering::SeqCst) {
                return Err(BoardError::Stopped);
            }
            q = self.inner.not_empty.wait(q).unwrap();
        }
    }

    fn release(&self, _handle: FrameHandle) {
        // Nothing to recycle: the simulated backend allocates a fresh Arc per frame.
    }

    fn queue_size(&self) -> u32 {
        self.inner.queue.lock().unwrap().len() as u32
    }

    fn capture_counters(&self) -> CaptureCounters {
        CaptureCounters {
            captured: self.inner.captured.load(Ordering::SeqCst),
            missed: self.inner.missed.load(Ordering::SeqCst),
        }
    }

    fn wait_error(&self) -> BoardAsyncError {
        let mut errs = self.inner.async_errors.lock().unwrap();
        loop {
            if let Some(e) = errs.pop_front() {
                return e;
            }
            errs = self.inner.async_cond.wait(errs).unwrap();
        }
    }

    fn drain_errors(&self) -> Vec<BoardAsyncError> {
        self.inner.async_errors.lock().unwrap().drain(..).collect()
    }

    fn is_cleanup(&self) -> bool {
        self.inner.is_cleanup()
    }
}

impl Drop for SimulatedBoard {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.not_empty.notify_all();
        if let Some(handle) = self.inner.producer.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// Opens [`SimulatedBoard`]s instead of talking to real frame-grabber hardware.
pub struct SimulatedBoardFactory {
    make_generator: Box<dyn Fn(u32) -> Box<dyn FrameGenerator> + Send + Sync>,
    frame_limit: Option<u64>,
}

impl SimulatedBoardFactory {
    /// Build a factory whose boards are seeded by `make_generator(camera_index)`.
    pub fn new<F>(make_generator: F) -> Self
    where
        F: Fn(u32) -> Box<dyn FrameGenerator> + Send + Sync + 'static,
    {
        SimulatedBoardFactory {
            make_generator: Box::new(make_generator),
            frame_limit: None,
        }
    }

    /// A factory whose boards all use [`ConstantFrameGenerator`].
    pub fn constant() -> Self {
        Self::new(|_camera| Box::new(ConstantFrameGenerator))
    }

    /// Cap the number of frames each opened board will ever produce; used by tests that need
    /// a run to terminate deterministically instead of producing forever.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }
}

impl BoardFactory for SimulatedBoardFactory {
    fn open(&self, index: u32) -> Result<Box<dyn crate::Board>, BoardError> {
        let generator = (self.make_generator)(index);
        Ok(Box::new(SimulatedBoard::new(generator, self.frame_limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Board;

    #[test]
    fn wait_done_delivers_frames_in_order() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(8);
        let mut board = factory.open(0).unwrap();
        board.set_buffers(16).unwrap();
        board.start().unwrap();

        let h = board.wait_done().unwrap();
        assert_eq!(h.pixels().len(), PIXELS);
        assert_eq!(h.pixels()[0], 0);
        assert_eq!(h.pixels()[4096], 0);
        board.release(h);
    }

    #[test]
    fn stop_drains_then_reports_stopped() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(2);
        let mut board = factory.open(0).unwrap();
        board.set_buffers(16).unwrap();
        board.start().unwrap();

        // Give the producer thread a moment to push its two frames.
        std::thread::sleep(Duration::from_millis(20));
        board.stop().unwrap();

        let mut drained = 0;
        loop {
            match board.wait_done() {
                Ok(h) => {
                    drained += 1;
                    board.release(h);
                }
                Err(BoardError::Stopped) => break,
                Err(e) => panic!("unexpected error {e:?}"),
            }
        }
        assert_eq!(drained, 2);
        assert!(board.is_cleanup());
    }

    #[test]
    fn abort_discards_queued_frames() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(5);
        let mut board = factory.open(0).unwrap();
        board.set_buffers(16).unwrap();
        board.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));

        board.abort().unwrap();
        match board.wait_done() {
            Err(BoardError::Aborted) => {}
            other => panic!("expected Aborted, got {other:?}"),
        }
    }
}
