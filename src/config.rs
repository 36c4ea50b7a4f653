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

//! Process configuration: where the LUT config, output files and logs live, which TCP port
//! the control socket binds, and which payload width averaged cubes are narrowed to.
//!
//! Read from a small whitespace-tokenized `key value` text file, in the same unfussy style as
//! the LUT config (`kcor_lut::load`): the vendor-specific INI reader is explicitly out of
//! scope, so this is the smallest reader that satisfies the interface rather than a
//! general-purpose config crate. Every field has a historical default, so a missing or
//! partial config file degrades gracefully instead of failing startup.

use kcor_persist::PayloadFormat;
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the LUT config naming the eight per-camera/quad lookup table files.
    pub lut_config_path: PathBuf,
    /// Root directory averaged cubes and stream flushes are written under.
    pub output_root: PathBuf,
    /// Directory the per-day log file is appended to.
    pub log_dir: PathBuf,
    /// TCP port the control socket binds.
    pub port: u16,
    /// Payload width averaged cubes are narrowed to before writing.
    pub payload: PayloadFormat,
    /// Whether the LUT is applied in averaging mode. Disabling this feeds raw samples
    /// directly into the accumulation, matching the build-time `#ifdef` toggle in the
    /// original implementation.
    pub lut_enabled: bool,
    /// Whether the LUT is applied in stream mode; independently configurable per §6.
    pub stream_lut_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lut_config_path: PathBuf::from("kcoConfig.ini"),
            output_root: PathBuf::from("."),
            log_dir: PathBuf::from("socketcamLogs"),
            port: 9028,
            payload: PayloadFormat::Narrow16,
            lut_enabled: true,
            stream_lut_enabled: false,
        }
    }
}

/// Load a [`Config`] from `path`. Unreadable files, unrecognized keys, and malformed values
/// are logged and fall back to the matching default field rather than failing startup.
pub fn load(path: &Path) -> Config {
    let mut config = Config::default();

    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("could not open process config {}: {e}, using defaults", path.display());
            return config;
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else { continue };
        let Some(value) = tokens.next() else {
            log::warn!("config key '{key}' in {} has no value, ignoring", path.display());
            continue;
        };

        match key {
            "LutConfigPath" => config.lut_config_path = PathBuf::from(value),
            "OutputRoot" => config.output_root = PathBuf::from(value),
            "LogDir" => config.log_dir = PathBuf::from(value),
            "Port" => match value.parse() {
                Ok(port) => config.port = port,
                Err(e) => log::warn!("invalid Port '{value}' in {}: {e}", path.display()),
            },
            "Payload" => match value {
                "narrow16" => config.payload = PayloadFormat::Narrow16,
                "raw32" => config.payload = PayloadFormat::Raw32,
                other => log::warn!("unknown Payload '{other}' in {}, keeping default", path.display()),
            },
            "LutEnabled" => config.lut_enabled = parse_bool(value, config.lut_enabled, path),
            "StreamLutEnabled" => {
                config.stream_lut_enabled = parse_bool(value, config.stream_lut_enabled, path)
            }
            other => log::warn!("unrecognized config key '{other}' in {}, ignoring", path.display()),
        }
    }

    config
}

fn parse_bool(value: &str, default: bool, path: &Path) -> bool {
    match value {
        "0" | "false" => false,
        "1" | "true" => true,
        other => {
            log::warn!("invalid boolean '{other}' in {}, keeping default", path.display());
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/nonexistent/kcorsocketcam.conf"));
        assert_eq!(config.port, 9028);
        assert_eq!(config.payload, PayloadFormat::Narrow16);
        assert!(config.lut_enabled);
    }

    #[test]
    fn overrides_recognized_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socketcam.conf");
        fs::write(
            &path,
            "Port 9100\nPayload raw32\nLutEnabled false\nOutputRoot /data\n",
        )
        .unwrap();

        let config = load(&path);
        assert_eq!(config.port, 9100);
        assert_eq!(config.payload, PayloadFormat::Raw32);
        assert!(!config.lut_enabled);
        assert_eq!(config.output_root, PathBuf::from("/data"));
    }

    #[test]
    fn malformed_value_keeps_default_and_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socketcam.conf");
        fs::write(&path, "Port not-a-number\n").unwrap();

        let config = load(&path);
        assert_eq!(config.port, 9028);
    }
}
