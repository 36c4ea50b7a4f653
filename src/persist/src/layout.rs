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

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// `<root>/YYYYMMDD/avg/YYYYMMDD_HHMMSS_kcor.bin`.
pub fn avg_file_path(root: &Path, stamp: DateTime<Utc>) -> PathBuf {
    root.join(stamp.format("%Y%m%d").to_string())
        .join("avg")
        .join(format!("{}_kcor.bin", stamp.format("%Y%m%d_%H%M%S")))
}

/// `<root>/HHMMSSraw/YYYYMMDD_HHMMSS/`, the directory a stream flush's per-frame files land in.
pub fn stream_dir_path(root: &Path, stamp: DateTime<Utc>) -> PathBuf {
    root.join(format!("{}raw", stamp.format("%H%M%S")))
        .join(stamp.format("%Y%m%d_%H%M%S").to_string())
}

/// `cam<0|1>_NNNN.raw` within a stream flush directory.
pub fn stream_frame_path(dir: &Path, cam: usize, index: usize) -> PathBuf {
    dir.join(format!("cam{cam}_{index:04}.raw"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn avg_path_matches_the_published_layout() {
        let stamp = Utc.with_ymd_and_hms(2026, 7, 27, 13, 5, 9).unwrap();
        let path = avg_file_path(Path::new("/data"), stamp);
        assert_eq!(path, Path::new("/data/20260727/avg/20260727_130509_kcor.bin"));
    }

    #[test]
    fn stream_frame_path_is_zero_padded() {
        let dir = Path::new("/data/130509raw/20260727_130509");
        assert_eq!(stream_frame_path(dir, 1, 7), dir.join("cam1_0007.raw"));
    }
}
