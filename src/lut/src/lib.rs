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

//! Per-quad-state pixel lookup tables.
//!
//! Eight immutable 4096-entry tables, indexed `[camera][quad]`, convert a raw 16-bit sample
//! into a calibrated 32-bit value. They are loaded once, at startup, from a small text config
//! that names eight binary LUT files; anything that goes wrong while loading one of the eight
//! leaves that table at its default (all ones) rather than failing startup.

use std::fs;
use std::path::Path;

/// Entries per lookup table.
pub const LUT_SIZE: usize = 4096;

/// A single immutable 4096-entry lookup table.
#[derive(Clone)]
pub struct Lut {
    table: [u32; LUT_SIZE],
}

impl Lut {
    /// Look up the calibrated value for a raw 12-bit sample packed in a 16-bit word.
    ///
    /// `raw` is expected to be `< LUT_SIZE`; the ADC backing a real board only ever produces
    /// 12-bit samples, so this indexes directly rather than masking.
    #[inline]
    pub fn apply(&self, raw: u16) -> u32 {
        self.table[raw as usize]
    }
}

impl Default for Lut {
    fn default() -> Self {
        Lut { table: [1; LUT_SIZE] }
    }
}

/// The eight tables for both cameras, `[cam][quad]`.
pub struct LutSet {
    tables: [[Lut; 4]; 2],
}

impl LutSet {
    /// The table for camera `cam`'s quad state `quad`.
    pub fn get(&self, cam: usize, quad: usize) -> &Lut {
        &self.tables[cam][quad]
    }
}

impl Default for LutSet {
    fn default() -> Self {
        LutSet {
            tables: [
                [Lut::default(), Lut::default(), Lut::default(), Lut::default()],
                [Lut::default(), Lut::default(), Lut::default(), Lut::default()],
            ],
        }
    }
}

/// Load a [`LutSet`] from a text config file.
///
/// The file is scanned line by line for a line containing the token `LUT_Names`; the eight
/// lines that follow are taken, each trimmed, as the eight LUT file paths, assigned
/// `[cam][quad] = file[cam*4 + quad]`. If the config file cannot be read, if `LUT_Names` is
/// never found, or if fewer than eight filename lines follow it, the whole set is left at its
/// all-ones default and a warning is logged. Per-file problems (missing file, short read)
/// leave only that one table at its default.
pub fn load(config_path: &Path) -> LutSet {
    let text = match fs::read_to_string(config_path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("could not open lut config {}: {e}", config_path.display());
            return LutSet::default();
        }
    };

    let lines: Vec<&str> = text.lines().collect();
    let Some(marker) = lines
        .iter()
        .position(|line| line.split_whitespace().any(|tok| tok == "LUT_Names"))
    else {
        log::warn!("could not find LUT_Names in {}", config_path.display());
        return LutSet::default();
    };

    let names: Vec<&str> = lines
        .iter()
        .skip(marker + 1)
        .take(8)
        .map(|l| l.trim())
        .collect();
    if names.len() < 8 {
        log::warn!(
            "LUT_Names in {} is followed by only {} lines, expected 8",
            config_path.display(),
            names.len()
        );
        return LutSet::default();
    }

    let mut set = LutSet::default();
    for (fi, name) in names.into_iter().enumerate() {
        let cam = fi / 4;
        let quad = fi % 4;
        match load_one(Path::new(name)) {
            Some(table) => set.tables[cam][quad] = table,
            None => log::warn!(
                "lut file '{name}' for cam {cam} quad {quad} missing or short, keeping defaults"
            ),
        }
    }
    set
}

fn load_one(path: &Path) -> Option<Lut> {
    let bytes = fs::read(path).ok()?;
    let needed = LUT_SIZE * std::mem::size_of::<u32>();
    if bytes.len() < needed {
        return None;
    }
    let mut table = [0u32; LUT_SIZE];
    for (i, chunk) in bytes[..needed].chunks_exact(4).enumerate() {
        table[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(Lut { table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_yields_all_ones() {
        let set = load(Path::new("/nonexistent/kcoConfig.ini"));
        assert_eq!(set.get(0, 0).apply(42), 1);
        assert_eq!(set.get(1, 3).apply(4095), 1);
    }

    #[test]
    fn loads_eight_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut names = Vec::new();
        for fi in 0..8u32 {
            let path = dir.path().join(format!("lut{fi}.bin"));
            let mut f = fs::File::create(&path).unwrap();
            let bytes: Vec<u8> = (0..LUT_SIZE as u32)
                .flat_map(|v| (v + fi).to_le_bytes())
                .collect();
            f.write_all(&bytes).unwrap();
            names.push(path.display().to_string());
        }

        let config_path = dir.path().join("kcoConfig.ini");
        let mut config = fs::File::create(&config_path).unwrap();
        writeln!(config, "; kcor config").unwrap();
        writeln!(config, "LUT_Names").unwrap();
        for n in &names {
            writeln!(config, "{n}").unwrap();
        }
        drop(config);

        let set = load(&config_path);
        assert_eq!(set.get(0, 0).apply(10), 10);
        assert_eq!(set.get(0, 1).apply(10), 11);
        assert_eq!(set.get(1, 3).apply(10), 17);
    }

    #[test]
    fn short_file_keeps_default_for_that_table_only() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.bin");
        fs::write(&good, vec![0u8; LUT_SIZE * 4]).unwrap();
        let short = dir.path().join("short.bin");
        fs::write(&short, vec![0u8; 1024]).unwrap();

        let config_path = dir.path().join("kcoConfig.ini");
        let mut config = fs::File::create(&config_path).unwrap();
        writeln!(config, "LUT_Names").unwrap();
        writeln!(config, "{}", short.display()).unwrap();
        for _ in 0..7 {
            writeln!(config, "{}", good.display()).unwrap();
        }
        drop(config);

        let set = load(&config_path);
        // cam 0 quad 0 used the short file: stays at the all-ones default.
        assert_eq!(set.get(0, 0).apply(5), 1);
        // Every other table loaded the all-zero 'good' file.
        assert_eq!(set.get(0, 1).apply(5), 0);
    }
}
