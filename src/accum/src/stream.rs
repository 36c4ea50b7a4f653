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

use kcor_board::{Board, PIXELS};
use kcor_lut::LutSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Holds the most recent `capacity` stream frames for one camera.
///
/// Streams are never accumulated; persistence happens only at `stop`, when the ring is
/// flushed to disk. This stands in for the vendor board's own physical DMA ring, which keeps
/// frame data readable for some time after `release` returns a buffer to the free list.
pub struct StreamRing {
    frames: Mutex<VecDeque<Arc<[u16]>>>,
    capacity: usize,
}

impl StreamRing {
    pub fn new(capacity: usize) -> Self {
        StreamRing { frames: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub(crate) fn push(&self, frame: Arc<[u16]>) {
        let mut q = self.frames.lock().unwrap();
        if q.len() == self.capacity {
            q.pop_front();
        }
        q.push_back(frame);
    }

    /// Remove and return every buffered frame, oldest first.
    pub fn drain(&self) -> Vec<Arc<[u16]>> {
        self.frames.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the stream-mode acquisition worker for camera `cam`.
///
/// Unlike the averaging worker there is no accumulation region: each frame, optionally passed
/// through `stream_lut`, is appended to `ring` and the handle is released immediately.
pub fn run_stream_worker(
    cam: usize,
    board: &dyn Board,
    stream_lut: Option<&LutSet>,
    keep_running_cam: &AtomicBool,
    ring: &StreamRing,
) {
    while !board.is_cleanup() && keep_running_cam.load(Ordering::SeqCst) {
        let handle = match board.wait_done() {
            Ok(h) => h,
            Err(e) => {
                log::warn!("cam {cam}: stream wait_done failed: {e}");
                continue;
            }
        };

        if handle.queued_behind > 0 {
            log::trace!("cam {cam}: stream lag {}", handle.queued_behind);
        }

        let raw = handle.pixels();
        let frame: Arc<[u16]> = match stream_lut {
            // §4.4 calls for a spatial pattern distinct from averaging's `i % 4` cycle; this
            // walks the same four tables in reverse (3, 2, 1, 0) over adjacent pixels.
            Some(set) => (0..PIXELS)
                .map(|i| {
                    let quad = 3 - (i % 4);
                    set.get(cam, quad).apply(raw[i]) as u16
                })
                .collect(),
            None => Arc::from(raw),
        };
        ring.push(frame);
        board.release(handle);
    }
    log::debug!("cam {cam}: stream worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcor_board::{BoardFactory, SimulatedBoardFactory};

    #[test]
    fn ring_keeps_only_the_most_recent_frames() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(5);
        let mut board = factory.open(0).unwrap();
        board.set_buffers(1984).unwrap();
        board.start().unwrap();

        let ring = StreamRing::new(3);
        let keep_running_cam = AtomicBool::new(true);
        std::thread::sleep(std::time::Duration::from_millis(30));
        board.stop().unwrap();

        run_stream_worker(0, board.as_ref(), None, &keep_running_cam, &ring);
        assert!(ring.len() <= 3);
        let drained = ring.drain();
        assert!(ring.is_empty());
        assert!(!drained.is_empty());
    }
}
