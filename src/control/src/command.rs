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

use crate::mode::Program;
use kcor_accum::AveragingConfig;

/// The status half of a parsed command's `(desired_program, desired_status)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredStatus {
    Running,
    Stopped,
    /// Gentle stop: workers finish their current cycle before tearing down. Bookkeeping still
    /// ends up at `Status::Stopped`; see the state machine in `transition`.
    Gentle,
}

/// One parsed command from the 80-byte ASCII control channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Stream(DesiredStatus),
    Averaging(DesiredStatus, AveragingConfig),
    Quit,
}

impl Command {
    /// The `(desired_program, desired_status)` pair this command implies, for commands that
    /// participate in the mode state machine. `Quit` has no such pair; it is handled directly.
    pub fn desired(&self) -> Option<(Program, DesiredStatus)> {
        match self {
            Command::Stream(ds) => Some((Program::Stream, *ds)),
            Command::Averaging(ds, _) => Some((Program::Averaging, *ds)),
            Command::Quit => None,
        }
    }
}

/// Parse one command message. Unrecognized input returns `None`: per the spec this is treated
/// as "no change", not an error.
pub fn parse(message: &str) -> Option<Command> {
    let mut tokens = message.split_whitespace();
    match tokens.next()? {
        "stream" => parse_status(tokens.next()?).map(Command::Stream),
        "avging" => {
            let status = parse_status(tokens.next()?)?;
            let config = if status == DesiredStatus::Running {
                let num_integrations =
                    tokens.next().and_then(|t| t.parse().ok()).unwrap_or(512);
                let starting_quad_state =
                    tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0);
                let dump_avg_images =
                    tokens.next().and_then(|t| t.parse::<u32>().ok()).unwrap_or(0) != 0;
                AveragingConfig { num_integrations, starting_quad_state, dump_avg_images }
            } else {
                AveragingConfig::default()
            };
            Some(Command::Averaging(status, config))
        }
        "quit" => Some(Command::Quit),
        _ => None,
    }
}

fn parse_status(token: &str) -> Option<DesiredStatus> {
    match token {
        "start" => Some(DesiredStatus::Running),
        "stop" => Some(DesiredStatus::Stopped),
        "gent" => Some(DesiredStatus::Gentle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_start() {
        assert_eq!(parse("stream start"), Some(Command::Stream(DesiredStatus::Running)));
    }

    #[test]
    fn parses_avging_start_with_defaults() {
        assert_eq!(
            parse("avging start"),
            Some(Command::Averaging(DesiredStatus::Running, AveragingConfig::default()))
        );
    }

    #[test]
    fn parses_avging_start_with_explicit_args() {
        let cmd = parse("avging start 4 0 1").unwrap();
        assert_eq!(
            cmd,
            Command::Averaging(
                DesiredStatus::Running,
                AveragingConfig { num_integrations: 4, starting_quad_state: 0, dump_avg_images: true }
            )
        );
    }

    #[test]
    fn parses_gentle_stop_and_quit() {
        assert_eq!(parse("avging gent"), Some(Command::Averaging(DesiredStatus::Gentle, AveragingConfig::default())));
        assert_eq!(parse("quit"), Some(Command::Quit));
    }

    #[test]
    fn unrecognized_input_is_none() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("bogus"), None);
        assert_eq!(parse("stream bogus"), None);
    }
}
