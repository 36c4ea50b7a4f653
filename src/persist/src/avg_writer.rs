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
use crate::error::PersistError;
use crate::layout::avg_file_path;
use crate::narrow::{payload_bytes, PayloadFormat, FITS_HEADER_BYTES};
use chrono::Utc;
use kcor_accum::{RegionId, Regions};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run the writer worker for one accumulation region until `keep_running` is cleared.
///
/// Each cycle waits for both of the region's readiness events, narrows and writes the
/// accumulated payload, zeroes the region, then reports lag on the client socket.
pub fn run_avg_writer(
    region_id: RegionId,
    regions: &Regions,
    root: &Path,
    payload: PayloadFormat,
    announce: &dyn Announce,
    keep_running: &AtomicBool,
) {
    let slot = regions.slot(region_id);
    let letter = match region_id {
        RegionId::X => "X",
        RegionId::Y => "Y",
    };

    while keep_running.load(Ordering::SeqCst) {
        slot.ready[0].wait();
        slot.ready[1].wait();

        if !keep_running.load(Ordering::SeqCst) {
            return;
        }

        let stamp = slot.timestamp.lock().unwrap().take().unwrap_or_else(Utc::now);
        let path = avg_file_path(root, stamp);

        let write_result = {
            let mut buf = slot.buffer.lock().unwrap();
            let bytes = payload_bytes(buf.as_slice(), payload);
            let result = write_cube(&path, &bytes);
            buf.zero();
            result
        };

        match write_result {
            Ok(()) => log::debug!("wrote {}", path.display()),
            Err(e) => log::warn!("failed to write {}: {e}", path.display()),
        }

        let lag0 = slot.lag[0].take();
        let lag1 = slot.lag[1].take();
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        announce.announce(&format!("img {filename} lagged{letter} {lag0} {lag1}"));
    }
}

fn write_cube(path: &Path, payload: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| PersistError::CreateDir { path: parent.to_path_buf(), source })?;
    }
    let mut file = fs::File::create(path)
        .map_err(|source| PersistError::Write { path: path.to_path_buf(), source })?;
    file.write_all(&[0u8; FITS_HEADER_BYTES])
        .and_then(|_| file.write_all(payload))
        .map_err(|source| PersistError::Write { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::Announce;
    use kcor_accum::HALF_LEN;
    use std::sync::Mutex as StdMutex;

    struct Captured(StdMutex<Vec<String>>);
    impl Announce for Captured {
        fn announce(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn writes_header_then_payload_and_zeroes_region() {
        let dir = tempfile::tempdir().unwrap();
        let regions = Regions::new();
        {
            let mut buf = regions.x.buffer.lock().unwrap();
            buf.half_mut(0).fill(0x0001_0000);
        }
        regions.x.lag[0].add(3);
        regions.x.lag[1].add(1);

        let keep_running = AtomicBool::new(true);
        let announcer = Captured(StdMutex::new(Vec::new()));

        // Signal both events, then flip keep_running so the worker drains exactly one cycle.
        regions.x.ready[0].signal();
        regions.x.ready[1].signal();
        std::thread::scope(|scope| {
            let flipper = &keep_running;
            let handle = scope.spawn(|| {
                run_avg_writer(
                    RegionId::X,
                    &regions,
                    dir.path(),
                    PayloadFormat::Narrow16,
                    &announcer,
                    &keep_running,
                );
            });
            std::thread::sleep(std::time::Duration::from_millis(30));
            flipper.store(false, Ordering::SeqCst);
            regions.x.ready[0].signal();
            regions.x.ready[1].signal();
            handle.join().unwrap();
        });

        let messages = announcer.0.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("img "));
        assert!(messages[0].contains("laggedX 3 1"));

        {
            let buf = regions.x.buffer.lock().unwrap();
            assert!(buf.is_zero());
        }

        let written = fs::read_dir(dir.path().join(
            chrono::Utc::now().format("%Y%m%d").to_string(),
        ).join("avg"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
        let bytes = fs::read(written.path()).unwrap();
        assert_eq!(bytes.len(), FITS_HEADER_BYTES + HALF_LEN * 2 * 2);
        assert!(bytes[..FITS_HEADER_BYTES].iter().all(|&b| b == 0));
    }
}
