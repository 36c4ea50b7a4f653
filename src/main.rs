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

//! Entry point: loads configuration and LUTs, stands up the control socket, and blocks until a
//! `quit` command (or a signal handler the init system wires up) asks the [`Supervisor`] to shut
//! down. All of the interesting behavior lives in `supervisor`; this is just wiring.

mod config;
mod error;
mod supervisor;

use crate::error::StartupError;
use crate::supervisor::Supervisor;
use kcor_board::{BoardFactory, SimulatedBoardFactory};
use kcor_control::{spawn_accept_thread, SocketAnnouncer};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("kcorsocketcam.conf"));
    let config = config::load(&config_path);

    if let Err(e) = run(config) {
        log::error!("fatal startup failure: {e}");
        std::process::exit(1);
    }
}

fn run(config: config::Config) -> Result<(), StartupError> {
    let luts = Arc::new(kcor_lut::load(&config.lut_config_path));

    // The vendor capture SDK a real deployment would link against is out of scope; the
    // simulated backend is what stands in for it everywhere above `kcor_board::Board`.
    let board_factory: Arc<dyn BoardFactory> = Arc::new(SimulatedBoardFactory::constant());

    let announcer = SocketAnnouncer::new();
    let accept_keep_running = Arc::new(AtomicBool::new(true));

    let supervisor = Supervisor::new(config, board_factory, luts, announcer.clone());
    let port = supervisor.port();

    let on_message: Arc<dyn Fn(&str) + Send + Sync> = {
        let supervisor = supervisor.clone();
        Arc::new(move |text: &str| supervisor.handle_message(text))
    };

    let _accept_handle =
        spawn_accept_thread(port, announcer, on_message, accept_keep_running.clone())?;
    log::info!("socketcam control socket listening on port {port}");

    while !supervisor.is_quitting() {
        std::thread::sleep(Duration::from_millis(100));
    }

    accept_keep_running.store(false, Ordering::SeqCst);
    log::info!("socketcam exiting");
    Ok(())
}
