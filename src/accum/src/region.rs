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

use kcor_board::PIXELS;

/// Entries per camera half of an [`AccumRegion`]: one 32-bit accumulator per pixel per quad
/// state.
pub const HALF_LEN: usize = PIXELS * 4;

/// A 32-bit accumulation buffer laid out `[cam0_q0, cam0_q1, cam0_q2, cam0_q3, cam1_q0, ...]`.
///
/// Logically owned alternately by one acquisition worker pair (writing phase) and one writer
/// worker (draining phase); never touched by both at once.
pub struct AccumRegion {
    data: Box<[u32]>,
}

impl AccumRegion {
    pub fn new() -> Self {
        AccumRegion { data: vec![0u32; HALF_LEN * 2].into_boxed_slice() }
    }

    /// The mutable slice of this region belonging to camera `cam` (0 or 1).
    pub fn half_mut(&mut self, cam: usize) -> &mut [u32] {
        let start = cam * HALF_LEN;
        &mut self.data[start..start + HALF_LEN]
    }

    /// The full region, both cameras' halves, in `[cam0.., cam1..]` order.
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Zero every entry. Called by the writer after narrowing and writing a completed cycle,
    /// and by an acquisition worker when it abandons a cycle on error.
    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }
}

impl Default for AccumRegion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_are_disjoint_and_zeroed() {
        let mut r = AccumRegion::new();
        assert!(r.is_zero());
        r.half_mut(0)[0] = 7;
        r.half_mut(1)[0] = 9;
        assert_eq!(r.half_mut(0)[0], 7);
        assert_eq!(r.half_mut(1)[0], 9);
        assert_eq!(r.as_slice()[0], 7);
        assert_eq!(r.as_slice()[HALF_LEN], 9);
        r.zero();
        assert!(r.is_zero());
    }
}
