// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! LiveWire packet-sniffer collaborator seam.
//!
//! The real sniffer owns a capture thread feeding a mutex-protected ring
//! that the main thread drains into a session grid during `update()`. This
//! stub keeps that exact concurrency shape (worker thread, mutex ring,
//! main-thread drain) with no capture backend behind it, so a libpcap
//! implementation can drop in without touching the core.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// One captured-packet summary line.
pub type CaptureLine = String;

#[derive(Debug, Default)]
pub struct LiveWireRing {
    lines: Mutex<Vec<CaptureLine>>,
}

impl LiveWireRing {
    /// Worker side.
    pub fn push(&self, line: CaptureLine) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() < 1024 {
            lines.push(line);
        }
    }

    /// Main-thread side, called once per frame.
    pub fn drain(&self) -> Vec<CaptureLine> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }
}

#[derive(Debug)]
pub struct LiveWire {
    ring: Arc<LiveWireRing>,
    worker: Option<JoinHandle<()>>,
    stop: Arc<std::sync::atomic::AtomicBool>,
}

impl LiveWire {
    #[must_use]
    pub fn start() -> Self {
        let ring = Arc::new(LiveWireRing::default());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let worker_stop = stop.clone();
        // The stub worker parks until stopped; a capture backend would
        // loop on pcap_next here and push summaries.
        let worker = std::thread::spawn(move || {
            while !worker_stop.load(std::sync::atomic::Ordering::Relaxed) {
                std::thread::park_timeout(std::time::Duration::from_millis(100));
            }
        });
        Self { ring, worker: Some(worker), stop }
    }

    #[must_use]
    pub fn ring(&self) -> Arc<LiveWireRing> { self.ring.clone() }

    pub fn stop(&mut self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            let _ = worker.join();
        }
    }
}

impl Drop for LiveWire {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_hand_off_and_clean_shutdown() {
        let mut lw = LiveWire::start();
        lw.ring().push("TCP 10.0.0.1:22 -> 10.0.0.2:51000 64B".into());
        let drained = lw.ring().drain();
        assert_eq!(drained.len(), 1);
        assert!(lw.ring().drain().is_empty());
        lw.stop();
    }
}
