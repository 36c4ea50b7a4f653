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

use crate::announce::Announce;
use crate::layout::{stream_dir_path, stream_frame_path};
use chrono::Utc;
use kcor_accum::StreamRing;
use std::fs;
use std::path::Path;

/// Flush both cameras' stream rings to disk, one `.raw` file per buffered frame.
///
/// Called at `stop`/`gent` in stream mode and for an averaging session's optional raw-frame
/// dump; `label` distinguishes the two in the completion announcement (`"stream"` or
/// `"avging"`), since both write through the same per-frame layout.
pub fn flush_stream_rings(
    root: &Path,
    rings: [&StreamRing; 2],
    announce: &dyn Announce,
    label: &str,
) {
    let stamp = Utc::now();
    let dir = stream_dir_path(root, stamp);
    if let Err(e) = fs::create_dir_all(&dir) {
        log::warn!("could not create stream flush directory {}: {e}", dir.display());
        return;
    }

    let mut counts = [0usize; 2];
    for (cam, ring) in rings.into_iter().enumerate() {
        for (index, frame) in ring.drain().into_iter().enumerate() {
            let path = stream_frame_path(&dir, cam, index);
            let bytes: Vec<u8> = frame.iter().flat_map(|p| p.to_le_bytes()).collect();
            if let Err(e) = fs::write(&path, &bytes) {
                log::warn!("failed to write {}: {e}", path.display());
                continue;
            }
            counts[cam] += 1;
        }
    }

    announce.announce(&format!("write {label} done {} {}", counts[0], counts[1]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcor_board::{Board, BoardFactory, SimulatedBoardFactory};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    struct Captured(Mutex<Vec<String>>);
    impl Announce for Captured {
        fn announce(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn flush_writes_one_file_per_buffered_frame() {
        let dir = tempfile::tempdir().unwrap();
        let ring0 = StreamRing::new(4);
        let ring1 = StreamRing::new(4);

        let factory = SimulatedBoardFactory::constant().with_frame_limit(2);
        let mut board = factory.open(0).unwrap();
        board.set_buffers(1984).unwrap();
        board.start().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        board.stop().unwrap();
        let keep_running_cam = AtomicBool::new(true);
        kcor_accum::run_stream_worker(0, board.as_ref(), None, &keep_running_cam, &ring0);

        let announcer = Captured(Mutex::new(Vec::new()));
        flush_stream_rings(dir.path(), [&ring0, &ring1], &announcer, "stream");

        let messages = announcer.0.lock().unwrap();
        assert_eq!(messages[0], "write stream done 2 0");
        assert!(ring0.is_empty());
    }
}
