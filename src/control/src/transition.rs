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

use crate::command::{Command, DesiredStatus};
use crate::mode::{ModeState, Program, Status};
use kcor_accum::AveragingConfig;

/// Ring depth used while in stream mode.
pub const STREAM_RING_DEPTH: u32 = 1984;
/// Ring depth used while in averaging mode.
pub const AVERAGING_RING_DEPTH: u32 = 1032;

/// One concrete step the caller must perform to carry out a transition. `transition` only
/// decides *what* has to happen and what the resulting [`ModeState`] is; executing an action
/// (actually opening a board, spawning a worker thread) is the caller's job, since only the
/// caller holds the board handles and worker plumbing.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    StopBoards,
    CloseBoards,
    OpenBoards { ring_depth: u32 },
    BindStream,
    BindAveraging(AveragingConfig),
    StartBoards,
    SetCooperativeRun(bool),
    FlushStreamToDisk,
    DumpAvgImages,
    Announce(String),
}

fn desired_matches(ds: DesiredStatus, status: Status) -> bool {
    matches!(
        (ds, status),
        (DesiredStatus::Running, Status::Running) | (DesiredStatus::Stopped, Status::Stopped) | (DesiredStatus::Gentle, Status::Stopped)
    )
}

/// Apply one parsed command to the current mode state, per the rules in the control-plane
/// design: a program change tears the old program down and stands the new one up; a
/// status-only change starts, stops, or gently stops the current program; `Quit` is handled
/// by the caller directly and never reaches this function.
pub fn transition(current: ModeState, command: &Command) -> (ModeState, Vec<Action>) {
    let Some((dp, ds)) = command.desired() else {
        return (current, Vec::new());
    };

    // Nothing is open, and the request isn't asking to start: there is nothing to stop or
    // gently stop, so this is a no-op rather than a reason to open hardware. This is what
    // keeps the Cam0-elected teardown's synthetic re-arm command (an "averaging stop" issued
    // against an already-(NONE, CLOSED) state) from reopening boards it just closed.
    if current.program == Program::None && ds != DesiredStatus::Running {
        return (current, Vec::new());
    }

    if dp != current.program {
        let mut actions = Vec::new();
        if current.program != Program::None {
            actions.push(Action::StopBoards);
            actions.push(Action::CloseBoards);
        }

        let new_status = match dp {
            Program::None => Status::Closed,
            _ => {
                if ds == DesiredStatus::Running {
                    Status::Running
                } else {
                    Status::Opened
                }
            }
        };

        match dp {
            Program::Stream => {
                actions.push(Action::OpenBoards { ring_depth: STREAM_RING_DEPTH });
                actions.push(Action::BindStream);
                if ds == DesiredStatus::Running {
                    actions.push(Action::StartBoards);
                }
                actions.push(Action::Announce("cam ready stream".to_string()));
            }
            Program::Averaging => {
                let config = match command {
                    Command::Averaging(_, cfg) => *cfg,
                    _ => AveragingConfig::default(),
                };
                actions.push(Action::OpenBoards { ring_depth: AVERAGING_RING_DEPTH });
                actions.push(Action::SetCooperativeRun(true));
                actions.push(Action::BindAveraging(config));
                if ds == DesiredStatus::Running {
                    actions.push(Action::StartBoards);
                }
                actions.push(Action::Announce("cam ready avging".to_string()));
            }
            Program::None => {}
        }

        return (ModeState { program: dp, status: new_status }, actions);
    }

    if desired_matches(ds, current.status) {
        return (current, Vec::new());
    }

    let mut actions = Vec::new();
    let new_status;
    match ds {
        DesiredStatus::Running => {
            actions.push(Action::SetCooperativeRun(true));
            actions.push(Action::StartBoards);
            new_status = Status::Running;
        }
        DesiredStatus::Stopped => {
            actions.push(Action::StopBoards);
            actions.push(Action::SetCooperativeRun(false));
            if current.program == Program::Stream {
                actions.push(Action::FlushStreamToDisk);
            } else if current.program == Program::Averaging {
                if let Command::Averaging(_, cfg) = command {
                    if cfg.dump_avg_images {
                        actions.push(Action::DumpAvgImages);
                    }
                }
            }
            new_status = Status::Stopped;
        }
        DesiredStatus::Gentle => {
            actions.push(Action::SetCooperativeRun(false));
            if current.program == Program::Stream {
                actions.push(Action::StopBoards);
                actions.push(Action::FlushStreamToDisk);
            }
            new_status = Status::Stopped;
        }
    }

    (ModeState { program: current.program, status: new_status }, actions)
}

/// The actions for a `quit` command: tear down whatever program is active and return to the
/// initial state. The caller clears the top-level run flag and exits after running these.
pub fn quit_actions(current: ModeState) -> Vec<Action> {
    let mut actions = Vec::new();
    if current.program != Program::None {
        actions.push(Action::StopBoards);
        actions.push(Action::CloseBoards);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_start_from_closed_opens_and_starts() {
        let (state, actions) = transition(
            ModeState::initial(),
            &Command::Averaging(DesiredStatus::Running, AveragingConfig::default()),
        );
        assert_eq!(state, ModeState { program: Program::Averaging, status: Status::Running });
        assert!(actions.contains(&Action::OpenBoards { ring_depth: AVERAGING_RING_DEPTH }));
        assert!(actions.contains(&Action::StartBoards));
    }

    #[test]
    fn repeating_the_same_running_command_is_a_no_op() {
        let running = ModeState { program: Program::Averaging, status: Status::Running };
        let (state, actions) = transition(
            running,
            &Command::Averaging(DesiredStatus::Running, AveragingConfig::default()),
        );
        assert_eq!(state, running);
        assert!(actions.is_empty());
    }

    #[test]
    fn stop_while_already_closed_is_a_no_op() {
        let (state, actions) = transition(
            ModeState::initial(),
            &Command::Averaging(DesiredStatus::Stopped, AveragingConfig::default()),
        );
        assert_eq!(state, ModeState::initial());
        assert!(actions.is_empty());
    }

    #[test]
    fn mode_switch_stops_and_closes_before_reopening() {
        let running = ModeState { program: Program::Averaging, status: Status::Running };
        let (state, actions) =
            transition(running, &Command::Stream(DesiredStatus::Running));
        assert_eq!(state, ModeState { program: Program::Stream, status: Status::Running });
        assert_eq!(
            actions[0..2],
            [Action::StopBoards, Action::CloseBoards]
        );
        assert!(actions.contains(&Action::OpenBoards { ring_depth: STREAM_RING_DEPTH }));
    }

    #[test]
    fn gentle_stop_clears_cooperative_run_without_touching_boards_in_averaging() {
        let running = ModeState { program: Program::Averaging, status: Status::Running };
        let (state, actions) = transition(
            running,
            &Command::Averaging(DesiredStatus::Gentle, AveragingConfig::default()),
        );
        assert_eq!(state.status, Status::Stopped);
        assert_eq!(actions, vec![Action::SetCooperativeRun(false)]);
    }

    #[test]
    fn gentle_stop_in_stream_is_a_hard_stop() {
        let running = ModeState { program: Program::Stream, status: Status::Running };
        let (_, actions) = transition(running, &Command::Stream(DesiredStatus::Gentle));
        assert!(actions.contains(&Action::StopBoards));
        assert!(actions.contains(&Action::FlushStreamToDisk));
    }
}
