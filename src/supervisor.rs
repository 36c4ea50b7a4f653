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

//! Wires the board, LUT, accumulation, persistence and control-plane crates into the running
//! process: owns the board handles for whichever mode is active, spawns and (where the state
//! machine calls for it) joins the worker threads, and carries out the `Action`s the control
//! plane's transition function decides on.
//!
//! The one piece of cross-worker choreography that lives here rather than in `kcor_accum` is
//! the Cam0-elected teardown: when an averaging session's camera-0 acquisition worker returns
//! (because the board reached cleanup, or because a gentle stop let it finish one more cycle),
//! this module is what stops the boards if they're still running, optionally dumps the last
//! ring of raw frames, closes the boards, resets the mode state to `(NONE, CLOSED)`, and
//! re-enters the state machine with a synthetic `"avging stop"` so bookkeeping never needs a
//! human to notice the session quietly ended on its own.

use crate::config::Config;
use kcor_accum::{
    run_averaging_worker, run_stream_worker, AveragingConfig, RegionId, Regions, StreamRing,
};
use kcor_board::{Board, BoardFactory};
use kcor_control::{
    parse, quit_actions, transition, Action, Command, DesiredStatus, ModeState, Program,
    SocketAnnouncer, AVERAGING_RING_DEPTH,
};
use kcor_lut::LutSet;
use kcor_persist::{flush_stream_rings, run_avg_writer, Announce};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Everything an in-progress averaging session needs torn down, owned jointly by the camera-0
/// worker (the usual path) and an explicit `CloseBoards` action (a program switch that preempts
/// the session before it winds down on its own). Whichever side successfully `take()`s this out
/// of its `Mutex<Option<_>>` is the one that runs; the other finds `None` and does nothing,
/// which is what rules out a double stop/close.
struct AveragingSession {
    boards: [Arc<dyn Board>; 2],
    /// Filled in immediately after the camera-0 thread is spawned. Only the external
    /// `CloseBoards` path ever joins this; camera 0's own teardown obviously can't join itself.
    cam0_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    cam1_handle: JoinHandle<()>,
    writer_handles: [JoinHandle<()>; 2],
    writer_run: Arc<AtomicBool>,
    dump_rings: Option<[Arc<StreamRing>; 2]>,
}

struct StreamSession {
    boards: [Arc<dyn Board>; 2],
    cam0_handle: JoinHandle<()>,
    cam1_handle: JoinHandle<()>,
    rings: [Arc<StreamRing>; 2],
}

/// The running process, minus the socket plumbing itself (see [`kcor_control::spawn_accept_thread`]).
pub struct Supervisor {
    config: Config,
    board_factory: Arc<dyn BoardFactory>,
    luts: Arc<LutSet>,
    announcer: Arc<SocketAnnouncer>,
    regions: Arc<Regions>,
    mode: Mutex<ModeState>,
    keep_running_cam: Arc<AtomicBool>,
    pending_boards: Mutex<Option<[Arc<dyn Board>; 2]>>,
    averaging: Mutex<Option<AveragingSession>>,
    stream: Mutex<Option<StreamSession>>,
    quit: AtomicBool,
}

impl Supervisor {
    pub fn new(
        config: Config,
        board_factory: Arc<dyn BoardFactory>,
        luts: Arc<LutSet>,
        announcer: Arc<SocketAnnouncer>,
    ) -> Arc<Self> {
        Arc::new(Supervisor {
            config,
            board_factory,
            luts,
            announcer,
            regions: Arc::new(Regions::new()),
            mode: Mutex::new(ModeState::initial()),
            keep_running_cam: Arc::new(AtomicBool::new(false)),
            pending_boards: Mutex::new(None),
            averaging: Mutex::new(None),
            stream: Mutex::new(None),
            quit: AtomicBool::new(false),
        })
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn is_quitting(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Entry point for every message the control socket receives, after the `"cam <echo>"`
    /// acknowledgement has already gone out. Unrecognized text is dropped silently, per the
    /// command language's "no change" rule.
    pub fn handle_message(self: &Arc<Self>, text: &str) {
        match parse(text) {
            Some(command) => self.dispatch(command),
            None => log::debug!("ignoring unrecognized command: {text:?}"),
        }
    }

    fn dispatch(self: &Arc<Self>, command: Command) {
        if matches!(command, Command::Quit) {
            self.handle_quit();
            return;
        }

        let mut mode = self.mode.lock().unwrap();
        let current = *mode;
        let (next, actions) = transition(current, &command);
        *mode = next;
        drop(mode);

        log::info!("{current:?} -> {next:?} ({command:?})");
        self.execute(&actions);
    }

    fn handle_quit(self: &Arc<Self>) {
        let current = *self.mode.lock().unwrap();
        if current.program != Program::None {
            // `quit_actions` pairs StopBoards with CloseBoards, but closing right away would
            // skip the grace period: run everything except the close now, then wait, then
            // close, so workers blocked in a wait actually get the 3 seconds to escape it.
            for action in quit_actions(current) {
                if !matches!(action, Action::CloseBoards) {
                    self.execute(std::slice::from_ref(&action));
                }
            }
            self.keep_running_cam.store(false, Ordering::SeqCst);
            // Writers must stop before their readiness events are signaled, or a writer
            // blocked in `run_avg_writer` wakes, still sees its run flag set, and persists an
            // in-progress, unsignaled region. `close_boards`/`cam0_teardown` clear this flag
            // themselves once they run, but quit needs it cleared up front, before the grace
            // sleep, not after it.
            if let Some(session) = self.averaging.lock().unwrap().as_ref() {
                session.writer_run.store(false, Ordering::SeqCst);
            }
            self.regions.signal_all();
            thread::sleep(GRACE_PERIOD);
            self.close_boards();
        }
        *self.mode.lock().unwrap() = ModeState::initial();
        self.quit.store(true, Ordering::SeqCst);
    }

    fn execute(self: &Arc<Self>, actions: &[Action]) {
        for action in actions {
            match action {
                Action::Announce(message) => self.announcer.announce(message),
                Action::StopBoards => self.stop_boards(),
                Action::CloseBoards => self.close_boards(),
                Action::OpenBoards { ring_depth } => self.open_boards(*ring_depth),
                Action::BindStream => self.bind_stream(),
                Action::BindAveraging(cfg) => self.bind_averaging(*cfg),
                Action::StartBoards => self.start_boards(),
                Action::SetCooperativeRun(run) => {
                    self.keep_running_cam.store(*run, Ordering::SeqCst)
                }
                Action::FlushStreamToDisk => self.flush_stream(),
                Action::DumpAvgImages => self.dump_avg_images(),
            }
        }
    }

    fn open_boards(&self, ring_depth: u32) {
        let mut opened: Vec<Arc<dyn Board>> = Vec::with_capacity(2);
        for cam in 0..2u32 {
            let mut board = match self.board_factory.open(cam) {
                Ok(board) => board,
                Err(e) => {
                    log::error!("cam {cam}: board open failed: {e}, aborting this bind");
                    return;
                }
            };
            if let Err(e) = board.set_buffers(ring_depth) {
                log::error!("cam {cam}: set_buffers({ring_depth}) failed: {e}");
            }
            let board: Arc<dyn Board> = Arc::from(board);
            spawn_error_drain(cam, board.clone());
            opened.push(board);
        }
        *self.pending_boards.lock().unwrap() = Some([opened[0].clone(), opened[1].clone()]);
    }

    fn take_pending_boards(&self) -> Option<[Arc<dyn Board>; 2]> {
        self.pending_boards.lock().unwrap().take()
    }

    fn start_boards(&self) {
        for board in self.active_boards() {
            if let Err(e) = board.start() {
                log::error!("board start failed: {e}");
            }
        }
    }

    fn stop_boards(&self) {
        let boards = self.active_boards();
        if boards.is_empty() {
            return;
        }
        for board in &boards {
            if let Err(e) = board.stop() {
                log::error!("board stop failed: {e}");
            }
        }
        // Cumulative per-board queue-size counts, per §6, not the instantaneous queue depth at
        // the moment of stop: each region's lag counter already accumulates `queued_behind`
        // across every `wait_done` for that camera, so sum the two regions without taking them
        // (each region's own writer still drains its counter with `take` for its own report).
        let lagged = |cam: usize| self.regions.x.lag[cam].peek() + self.regions.y.lag[cam].peek();
        self.announcer.announce(&format!("cam lagged {} {}", lagged(0), lagged(1)));
    }

    fn active_boards(&self) -> Vec<Arc<dyn Board>> {
        if let Some(session) = self.averaging.lock().unwrap().as_ref() {
            return session.boards.to_vec();
        }
        if let Some(session) = self.stream.lock().unwrap().as_ref() {
            return session.boards.to_vec();
        }
        Vec::new()
    }

    fn close_boards(&self) {
        if let Some(session) = self.averaging.lock().unwrap().take() {
            if let Some(handle) = session.cam0_handle.lock().unwrap().take() {
                let _ = handle.join();
            }
            let _ = session.cam1_handle.join();
            session.writer_run.store(false, Ordering::SeqCst);
            self.regions.signal_all();
            for handle in session.writer_handles {
                let _ = handle.join();
            }
            log::info!("averaging boards closed");
            return;
        }
        if let Some(session) = self.stream.lock().unwrap().take() {
            let _ = session.cam0_handle.join();
            let _ = session.cam1_handle.join();
            log::info!("stream boards closed");
        }
    }

    fn bind_stream(self: &Arc<Self>) {
        let Some(boards) = self.take_pending_boards() else {
            log::error!("bind_stream: no boards were opened, aborting bind");
            return;
        };
        let rings: [Arc<StreamRing>; 2] = [
            Arc::new(StreamRing::new(stream_ring_capacity())),
            Arc::new(StreamRing::new(stream_ring_capacity())),
        ];

        // `transition` only asserts this flag explicitly for averaging's program entry and for
        // a status-only resume; a fresh stream bind needs it too; there's only ever one program
        // bound at a time, so sharing the flag across both is safe.
        self.keep_running_cam.store(true, Ordering::SeqCst);

        let mut spawned: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        for cam in 0..2usize {
            let sup = self.clone();
            let board = boards[cam].clone();
            let ring = rings[cam].clone();
            match thread::Builder::new().name(format!("acq-stream-{cam}")).spawn(move || {
                let luts = sup.stream_luts();
                run_stream_worker(cam, board.as_ref(), luts.as_deref(), &sup.keep_running_cam, &ring);
            }) {
                Ok(handle) => spawned.push(handle),
                Err(e) => {
                    log::error!("cam {cam}: failed to spawn stream acquisition thread: {e}");
                    self.keep_running_cam.store(false, Ordering::SeqCst);
                    for handle in spawned {
                        let _ = handle.join();
                    }
                    log::error!("bind_stream: aborting due to thread-spawn failure");
                    return;
                }
            }
        }
        let mut handles = spawned.into_iter();
        let cam0_handle = handles.next().unwrap();
        let cam1_handle = handles.next().unwrap();

        *self.stream.lock().unwrap() = Some(StreamSession { boards, cam0_handle, cam1_handle, rings });
    }

    fn bind_averaging(self: &Arc<Self>, config: AveragingConfig) {
        let Some(boards) = self.take_pending_boards() else {
            log::error!("bind_averaging: no boards were opened, aborting bind");
            return;
        };
        self.keep_running_cam.store(true, Ordering::SeqCst);

        let writer_run = Arc::new(AtomicBool::new(true));
        let mut writer_handles: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        for region_id in [RegionId::X, RegionId::Y] {
            let regions = self.regions.clone();
            let announcer = self.announcer.clone();
            let run = writer_run.clone();
            let root = self.config.output_root.clone();
            let payload = self.config.payload;
            match thread::Builder::new().name(format!("writer-{region_id:?}")).spawn(move || {
                run_avg_writer(region_id, &regions, &root, payload, announcer.as_ref(), &run);
            }) {
                Ok(handle) => writer_handles.push(handle),
                Err(e) => {
                    log::error!("failed to spawn {region_id:?} writer thread: {e}");
                    self.keep_running_cam.store(false, Ordering::SeqCst);
                    writer_run.store(false, Ordering::SeqCst);
                    self.regions.signal_all();
                    for handle in writer_handles {
                        let _ = handle.join();
                    }
                    log::error!("bind_averaging: aborting due to thread-spawn failure");
                    return;
                }
            }
        }
        let writer_handles: [JoinHandle<()>; 2] =
            writer_handles.try_into().unwrap_or_else(|_| unreachable!());

        let dump_rings = if config.dump_avg_images {
            Some([
                Arc::new(StreamRing::new(averaging_ring_capacity())),
                Arc::new(StreamRing::new(averaging_ring_capacity())),
            ])
        } else {
            None
        };

        let cam1_ring = dump_rings.as_ref().map(|r| r[1].clone());
        let sup1 = self.clone();
        let cam1_board = boards[1].clone();
        let cam1_handle = match thread::Builder::new().name("acq-avg-1".into()).spawn(move || {
            let luts = sup1.averaging_luts();
            run_averaging_worker(
                1,
                cam1_board.as_ref(),
                luts.as_deref(),
                &sup1.regions,
                &sup1.keep_running_cam,
                &config,
                cam1_ring.as_deref(),
            );
        }) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("failed to spawn cam1 averaging thread: {e}");
                self.keep_running_cam.store(false, Ordering::SeqCst);
                writer_run.store(false, Ordering::SeqCst);
                self.regions.signal_all();
                for handle in writer_handles {
                    let _ = handle.join();
                }
                log::error!("bind_averaging: aborting due to thread-spawn failure");
                return;
            }
        };

        let cam0_handle_slot: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));

        *self.averaging.lock().unwrap() = Some(AveragingSession {
            boards: boards.clone(),
            cam0_handle: cam0_handle_slot.clone(),
            cam1_handle,
            writer_handles,
            writer_run,
            dump_rings: dump_rings.clone(),
        });

        let cam0_ring = dump_rings.as_ref().map(|r| r[0].clone());
        let sup0 = self.clone();
        let cam0_board = boards[0].clone();
        let spawn_result = thread::Builder::new().name("acq-avg-0".into()).spawn(move || {
            let luts = sup0.averaging_luts();
            run_averaging_worker(
                0,
                cam0_board.as_ref(),
                luts.as_deref(),
                &sup0.regions,
                &sup0.keep_running_cam,
                &config,
                cam0_ring.as_deref(),
            );
            sup0.cam0_teardown();
        });

        match spawn_result {
            Ok(handle) => *cam0_handle_slot.lock().unwrap() = Some(handle),
            Err(e) => {
                log::error!("failed to spawn cam0 averaging thread: {e}");
                self.keep_running_cam.store(false, Ordering::SeqCst);
                // The session is already stored (cam1's handle is in it); no cam0 thread will
                // ever run to tear it down, so do it here instead.
                if let Some(session) = self.averaging.lock().unwrap().take() {
                    let _ = session.cam1_handle.join();
                    session.writer_run.store(false, Ordering::SeqCst);
                    self.regions.signal_all();
                    for handle in session.writer_handles {
                        let _ = handle.join();
                    }
                }
                log::error!("bind_averaging: aborting due to thread-spawn failure");
            }
        }
    }

    /// The Cam0-elected teardown: runs on the camera-0 acquisition thread itself, once its
    /// outer loop has exited. Only one of this function and an external `CloseBoards` ever
    /// actually tears the session down; whichever loses the race over `self.averaging` does
    /// nothing.
    fn cam0_teardown(self: &Arc<Self>) {
        let Some(session) = self.averaging.lock().unwrap().take() else {
            log::debug!("cam0 teardown superseded by an explicit close, nothing to do");
            return;
        };

        // Unconditional and idempotent: an explicit "stop" has already stopped these boards by
        // the time this runs, and a gentle stop never did, so there is no status bit reliable
        // enough to gate this on (dispatch() always flips to Stopped before this thread notices
        // `keep_running_cam` went false, whether or not StopBoards ran).
        for board in &session.boards {
            if let Err(e) = board.stop() {
                log::warn!("cam0 teardown: board stop failed: {e}");
            }
        }

        if let Some(rings) = &session.dump_rings {
            let root = self.config.output_root.clone();
            flush_stream_rings(&root, [rings[0].as_ref(), rings[1].as_ref()], self.announcer.as_ref(), "avging");
        }

        let _ = session.cam1_handle.join();
        session.writer_run.store(false, Ordering::SeqCst);
        self.regions.signal_all();
        for handle in session.writer_handles {
            let _ = handle.join();
        }

        *self.mode.lock().unwrap() = ModeState::initial();
        log::info!("averaging session torn down by cam0, re-arming");

        // Synthetic restart: re-enter the state machine from (NONE, CLOSED). Per the
        // transition guard added for exactly this call, requesting "stop" against an
        // already-closed program is a no-op, so this settles bookkeeping without
        // reopening hardware the loop just closed.
        self.dispatch(Command::Averaging(DesiredStatus::Stopped, AveragingConfig::default()));
    }

    fn flush_stream(&self) {
        let guard = self.stream.lock().unwrap();
        let Some(session) = guard.as_ref() else {
            log::debug!("FlushStreamToDisk requested but no stream session is active");
            return;
        };
        let root = self.config.output_root.clone();
        flush_stream_rings(&root, [session.rings[0].as_ref(), session.rings[1].as_ref()], self.announcer.as_ref(), "stream");
    }

    fn dump_avg_images(&self) {
        let guard = self.averaging.lock().unwrap();
        let Some(session) = guard.as_ref() else {
            log::debug!("DumpAvgImages requested but no averaging session is active");
            return;
        };
        let Some(rings) = &session.dump_rings else {
            log::debug!("DumpAvgImages requested but no dump ring was configured for this session");
            return;
        };
        let root = self.config.output_root.clone();
        flush_stream_rings(&root, [rings[0].as_ref(), rings[1].as_ref()], self.announcer.as_ref(), "avging");
    }

    fn averaging_luts(&self) -> Option<Arc<LutSet>> {
        self.config.lut_enabled.then(|| self.luts.clone())
    }

    fn stream_luts(&self) -> Option<Arc<LutSet>> {
        self.config.stream_lut_enabled.then(|| self.luts.clone())
    }
}

fn stream_ring_capacity() -> usize {
    kcor_control::STREAM_RING_DEPTH as usize
}

fn averaging_ring_capacity() -> usize {
    AVERAGING_RING_DEPTH as usize
}

fn spawn_error_drain(cam: u32, board: Arc<dyn Board>) {
    let spawned = thread::Builder::new().name(format!("board-error-{cam}")).spawn(move || loop {
        let error = board.wait_error();
        log::error!("cam {cam}: asynchronous board error: {error}");
    });
    if let Err(e) = spawned {
        // Diagnostics-only: the board is still usable without its error drain, so this
        // doesn't abort the bind the way a worker/writer thread failure does.
        log::error!("cam {cam}: failed to spawn board error drain thread: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcor_board::SimulatedBoardFactory;
    use kcor_control::{Program, Status};
    use std::path::Path;

    /// The returned `TempDir` must be kept alive by the caller for as long as the supervisor
    /// might still be writing to it; it is deleted when dropped.
    fn test_supervisor(frame_limit: u64) -> (Arc<Supervisor>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_root: dir.path().to_path_buf(),
            lut_enabled: false,
            stream_lut_enabled: false,
            ..Config::default()
        };
        let board_factory: Arc<dyn BoardFactory> =
            Arc::new(SimulatedBoardFactory::constant().with_frame_limit(frame_limit));
        let luts = Arc::new(kcor_lut::load(Path::new("/nonexistent-kcor-lut.conf")));
        (Supervisor::new(config, board_factory, luts, SocketAnnouncer::new()), dir)
    }

    fn wait_until(mut check: impl FnMut() -> bool, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        check()
    }

    #[test]
    fn mode_switch_stops_closes_and_rebinds_to_stream() {
        let (sup, _dir) = test_supervisor(256);
        sup.handle_message("avging start 1 0 0");
        assert!(wait_until(|| sup.averaging.lock().unwrap().is_some(), Duration::from_secs(1)));

        sup.handle_message("stream start");
        assert!(wait_until(|| sup.stream.lock().unwrap().is_some(), Duration::from_secs(1)));
        assert!(sup.averaging.lock().unwrap().is_none());
        assert_eq!(
            *sup.mode.lock().unwrap(),
            ModeState { program: Program::Stream, status: Status::Running }
        );

        sup.handle_message("quit");
        assert!(sup.is_quitting());
        assert!(sup.stream.lock().unwrap().is_none());
    }

    #[test]
    fn gentle_stop_settles_at_none_closed_via_cam0_teardown() {
        let (sup, _dir) = test_supervisor(256);
        sup.handle_message("avging start 1 0 0");
        assert!(wait_until(|| sup.averaging.lock().unwrap().is_some(), Duration::from_secs(1)));

        sup.handle_message("avging gent");
        let settled = wait_until(
            || *sup.mode.lock().unwrap() == ModeState::initial(),
            Duration::from_secs(2),
        );
        assert!(settled, "expected (NONE, CLOSED) after the Cam0-elected teardown ran");
        assert!(sup.averaging.lock().unwrap().is_none());
    }

    #[test]
    fn quit_under_load_releases_every_wait_within_the_grace_period() {
        let (sup, _dir) = test_supervisor(256);
        sup.handle_message("avging start 1 0 0");
        assert!(wait_until(|| sup.averaging.lock().unwrap().is_some(), Duration::from_secs(1)));

        // handle_quit blocks for the full grace period itself; returning at all means every
        // worker it joins escaped its wait instead of hanging forever.
        sup.handle_message("quit");
        assert!(sup.is_quitting());
        assert!(sup.averaging.lock().unwrap().is_none());
    }

    #[test]
    fn repeating_the_same_running_command_is_a_no_op_through_the_supervisor() {
        let (sup, _dir) = test_supervisor(256);
        sup.handle_message("avging start 1 0 0");
        assert!(wait_until(|| sup.averaging.lock().unwrap().is_some(), Duration::from_secs(1)));

        // A second identical "start" must not rebind (no fresh session swapped in).
        sup.handle_message("avging start 1 0 0");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(
            *sup.mode.lock().unwrap(),
            ModeState { program: Program::Averaging, status: Status::Running }
        );

        sup.handle_message("quit");
        assert!(sup.is_quitting());
    }

    #[test]
    fn stream_mode_from_cold_start_actually_acquires_frames() {
        let (sup, _dir) = test_supervisor(256);
        sup.handle_message("stream start");
        assert!(wait_until(|| sup.stream.lock().unwrap().is_some(), Duration::from_secs(1)));

        let got_frames = wait_until(
            || {
                let guard = sup.stream.lock().unwrap();
                guard.as_ref().map(|s| !s.rings[0].is_empty()).unwrap_or(false)
            },
            Duration::from_secs(1),
        );
        assert!(got_frames, "a fresh stream bind must start producing frames immediately");

        sup.handle_message("quit");
        assert!(sup.is_quitting());
    }
}
