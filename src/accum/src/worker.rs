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

use crate::config::AveragingConfig;
use crate::regions::{RegionId, Regions};
use crate::stream::StreamRing;
use chrono::Utc;
use kcor_board::{Board, PIXELS};
use kcor_lut::LutSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run the averaging-mode acquisition worker for camera `cam` until the board reaches cleanup
/// or `keep_running_cam` is cleared.
///
/// Returns once the outer loop exits. The caller (the thread that owns camera 0) is
/// responsible for the one-time teardown described in the module docs: this function only
/// ever drives the accumulate/signal/flip cycle.
///
/// `dump_ring`, when present, receives a copy of every raw frame consumed, bounded to its own
/// capacity; it backs the `DoAvgImageDump` raw-frame dump issued on stop/gentle-stop, distinct
/// from the accumulated cube the writer workers persist.
///
/// Each region half holds four `pixels`-sized planes, one per quad state. A frame's plane is
/// its position within the current integration (0..4, reset every integration); the four LUTs
/// still cycle spatially over adjacent raw pixels within that frame. Over `num_integrations`
/// integrations each plane is written exactly once per integration, so every plane ends up
/// summing exactly `num_integrations` frames.
pub fn run_averaging_worker(
    cam: usize,
    board: &dyn Board,
    luts: Option<&LutSet>,
    regions: &Regions,
    keep_running_cam: &AtomicBool,
    config: &AveragingConfig,
    dump_ring: Option<&StreamRing>,
) {
    if config.starting_quad_state != 0 {
        log::warn!(
            "cam {cam}: starting_quad_state={} is accepted but has no effect",
            config.starting_quad_state
        );
    }

    let mut current = RegionId::X;
    while !board.is_cleanup() && keep_running_cam.load(Ordering::SeqCst) {
        let slot = regions.slot(current);

        if cam == 0 {
            *slot.timestamp.lock().unwrap() = Some(Utc::now());
        }

        let integrations = config.num_integrations;
        let mut errored = false;

        'cycle: for it in 0..(integrations as u64 * 4) {
            let handle = match board.wait_done() {
                Ok(h) => h,
                Err(e) => {
                    log::warn!("cam {cam}: wait_done failed mid-cycle: {e}");
                    slot.buffer.lock().unwrap().half_mut(cam).fill(0);
                    errored = true;
                    break 'cycle;
                }
            };

            if handle.queued_behind > 0 {
                slot.lag[cam].add(handle.queued_behind);
            }

            if board.is_cleanup() {
                board.release(handle);
                return;
            }

            {
                let raw = handle.pixels();
                let mut buf = slot.buffer.lock().unwrap();
                let half = buf.half_mut(cam);
                // Each of an integration's four quad sub-frames gets its own pixels-sized
                // plane, selected by this frame's position within the integration (it % 4)
                // and reset every integration; within a frame the four LUTs still cycle
                // spatially over adjacent pixels.
                let plane = (it % 4) as usize * PIXELS;
                for j in 0..(PIXELS / 4) {
                    for q in 0..4 {
                        let i = 4 * j + q;
                        let sample = raw[i];
                        let value = match luts {
                            Some(set) => set.get(cam, q).apply(sample),
                            None => sample as u32,
                        };
                        half[plane + i] = half[plane + i].wrapping_add(value);
                    }
                }
                if let Some(ring) = dump_ring {
                    ring.push(std::sync::Arc::from(raw));
                }
            }
            board.release(handle);
        }

        if !errored {
            slot.ready[cam].signal();
        }
        current = current.flip();
    }

    log::debug!("cam {cam}: averaging worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcor_board::{BoardFactory, SimulatedBoardFactory};
    use std::sync::Arc;

    #[test]
    fn accumulates_and_signals_without_lut() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(8);
        let mut board0 = factory.open(0).unwrap();
        board0.set_buffers(1032).unwrap();
        board0.start().unwrap();

        let regions = Regions::new();
        let keep_running_cam = AtomicBool::new(true);
        let config = AveragingConfig { num_integrations: 2, starting_quad_state: 0, dump_avg_images: false };

        // Constrain to a single cycle by flipping the flag once the first region is ready.
        let keep_running_cam = Arc::new(keep_running_cam);
        let stopper = keep_running_cam.clone();
        let regions = Arc::new(regions);
        let watch_regions = regions.clone();
        let watcher = std::thread::spawn(move || {
            watch_regions.x.ready[0].wait();
            stopper.store(false, Ordering::SeqCst);
        });

        run_averaging_worker(0, board0.as_ref(), None, &regions, &keep_running_cam, &config, None);
        watcher.join().unwrap();

        let buf = regions.x.buffer.lock().unwrap();
        // raw[i] = i % 4096, accumulated unmodified (no LUT). Each of the 4 quad planes is
        // written once per integration, so over 2 integrations each plane sums exactly 2
        // frames' worth of raw[4]=4, not all 8 captured frames.
        let half = buf.as_slice();
        assert_eq!(half[0], 0);
        assert_eq!(half[4], 2 * 4);
        // The other three quad planes (previously always zero) are populated too.
        assert_eq!(half[PIXELS + 4], 2 * 4);
        assert_eq!(half[2 * PIXELS + 4], 2 * 4);
        assert_eq!(half[3 * PIXELS + 4], 2 * 4);
    }

    #[test]
    fn dump_ring_receives_a_copy_of_every_consumed_frame() {
        let factory = SimulatedBoardFactory::constant().with_frame_limit(8);
        let mut board0 = factory.open(0).unwrap();
        board0.set_buffers(1032).unwrap();
        board0.start().unwrap();

        let regions = Arc::new(Regions::new());
        let keep_running_cam = Arc::new(AtomicBool::new(true));
        let config = AveragingConfig { num_integrations: 2, starting_quad_state: 0, dump_avg_images: true };
        let dump_ring = crate::stream::StreamRing::new(8);

        let stopper = keep_running_cam.clone();
        let watch_regions = regions.clone();
        let watcher = std::thread::spawn(move || {
            watch_regions.x.ready[0].wait();
            stopper.store(false, Ordering::SeqCst);
        });

        run_averaging_worker(
            0,
            board0.as_ref(),
            None,
            &regions,
            &keep_running_cam,
            &config,
            Some(&dump_ring),
        );
        watcher.join().unwrap();

        // One raw frame pushed per consumed frame: 2 integrations * 4 quad sub-frames.
        assert_eq!(dump_ring.len(), 8);
    }
}
