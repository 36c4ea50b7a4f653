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

use crate::error::ControlError;
use kcor_persist::Announce;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Every control message, inbound or outbound, is exactly this many bytes.
pub const MESSAGE_LEN: usize = 80;

fn pad(message: &str) -> [u8; MESSAGE_LEN] {
    let mut buf = [b' '; MESSAGE_LEN];
    let bytes = message.as_bytes();
    let n = bytes.len().min(MESSAGE_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

/// Writes outbound messages on whichever client socket is currently connected.
///
/// Every emitter (writer workers, the acquisition workers' lag reports, the state machine's
/// own acknowledgements) goes through the same instance, so concurrent writers never interleave
/// a partial 80-byte message: each call holds the stream lock for the whole write.
pub struct SocketAnnouncer {
    stream: Mutex<Option<TcpStream>>,
}

impl SocketAnnouncer {
    pub fn new() -> Arc<Self> {
        Arc::new(SocketAnnouncer { stream: Mutex::new(None) })
    }

    fn set_stream(&self, stream: Option<TcpStream>) {
        *self.stream.lock().unwrap() = stream;
    }
}

impl Announce for SocketAnnouncer {
    fn announce(&self, message: &str) {
        let mut guard = self.stream.lock().unwrap();
        let Some(stream) = guard.as_mut() else {
            log::debug!("no client connected, dropping message: {message}");
            return;
        };
        let buf = pad(message);
        if let Err(e) = stream.write_all(&buf) {
            log::warn!("control socket write failed, closing connection: {e}");
            *guard = None;
        }
    }
}

/// Bind the control socket and spawn the accept thread.
///
/// One client at a time: the accept thread blocks in `accept`, hands the stream to
/// `announcer` and spawns a receive thread for it, then loops back to accept the next client.
/// Each receive iteration reads one fixed-size message, echoes `"cam <msg>"`, and hands the
/// trimmed text to `on_message`.
pub fn spawn_accept_thread(
    port: u16,
    announcer: Arc<SocketAnnouncer>,
    on_message: Arc<dyn Fn(&str) + Send + Sync>,
    keep_running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, ControlError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .map_err(|source| ControlError::Bind { port, source })?;

    thread::Builder::new()
        .name("control-accept".into())
        .spawn(move || {
            while keep_running.load(Ordering::SeqCst) {
                let (stream, addr) = match listener.accept() {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::warn!("control accept failed: {e}");
                        continue;
                    }
                };
                log::info!("control client connected from {addr}");
                let read_stream = match stream.try_clone() {
                    Ok(s) => s,
                    Err(e) => {
                        log::warn!("could not clone control stream: {e}");
                        continue;
                    }
                };
                announcer.set_stream(Some(stream));
                spawn_receive_thread(read_stream, announcer.clone(), on_message.clone());
            }
        })
        .map_err(ControlError::ThreadSpawn)
}

fn spawn_receive_thread(
    mut stream: TcpStream,
    announcer: Arc<SocketAnnouncer>,
    on_message: Arc<dyn Fn(&str) + Send + Sync>,
) {
    thread::spawn(move || {
        let mut buf = [0u8; MESSAGE_LEN];
        loop {
            match stream.read_exact(&mut buf) {
                Ok(()) => {
                    let text = String::from_utf8_lossy(&buf);
                    let trimmed = text.trim_end_matches(['\0', ' ']).to_string();
                    announcer.announce(&format!("cam {trimmed}"));
                    on_message(&trimmed);
                }
                Err(_) => {
                    log::info!("control client disconnected");
                    announcer.set_stream(None);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_truncates_and_space_fills() {
        let short = pad("cam ready stream");
        assert_eq!(short.len(), MESSAGE_LEN);
        assert_eq!(&short[..17], b"cam ready stream");
        assert!(short[17..].iter().all(|&b| b == b' '));

        let long = "x".repeat(200);
        let padded = pad(&long);
        assert_eq!(padded.len(), MESSAGE_LEN);
    }

    #[test]
    fn announce_without_a_client_does_not_panic() {
        let announcer = SocketAnnouncer::new();
        announcer.announce("cam ready stream");
    }
}
