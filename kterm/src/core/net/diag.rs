// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Network diagnostic sub-operations: traceroute, extended ping, port
//! scan, whois, speedtest, HTTP probe, MTU probe, and fragmentation test.
//!
//! Each is an independent little state machine owning its socket, advanced
//! exactly one step per `update()` tick, cancellable as a set
//! (`EXT;net;cancel_diag`). Completion produces a text report the terminal
//! prints into the owning session.
//!
//! These run unprivileged: reachability uses connected-UDP ICMP errors and
//! TCP connect timing rather than raw sockets, and the MTU probe reports
//! the local-stack bound (true path MTU would need the DF bit, which the
//! portable socket API cannot set).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
    (host, port).to_socket_addrs().ok()?.next()
}

/// One diagnostic's lifecycle outcome per tick.
enum Step {
    Pending,
    Report(String),
    Done(String),
}

trait DiagOp: Send {
    fn tick(&mut self) -> Step;
    fn name(&self) -> &'static str;
}

/// The per-connection set of running diagnostics.
#[derive(Default)]
pub struct DiagSet {
    ops: Vec<Box<dyn DiagOp>>,
}

impl std::fmt::Debug for DiagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagSet").field("running", &self.ops.len()).finish()
    }
}

impl DiagSet {
    #[must_use]
    pub fn running(&self) -> usize { self.ops.len() }

    /// `EXT;net;cancel_diag`.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.ops.len();
        self.ops.clear();
        cancelled
    }

    /// Advance every running op one step; finished ops report and retire.
    pub fn tick(&mut self) -> Vec<String> {
        let mut reports = Vec::new();
        let mut remaining = Vec::new();
        for mut op in self.ops.drain(..) {
            match op.tick() {
                Step::Pending => remaining.push(op),
                Step::Report(text) => {
                    reports.push(text);
                    remaining.push(op);
                }
                Step::Done(text) => reports.push(format!("{}: {text}", op.name())),
            }
        }
        self.ops = remaining;
        reports
    }

    pub fn start_traceroute(&mut self, host: &str, max_hops: u8, timeout_ms: u64) {
        self.ops.push(Box::new(Traceroute::new(host, max_hops, timeout_ms)));
    }

    pub fn start_ping(&mut self, host: &str, count: u32) {
        self.ops.push(Box::new(PingExt::new(host, count)));
    }

    pub fn start_port_scan(&mut self, host: &str, first: u16, last: u16) {
        self.ops.push(Box::new(PortScan::new(host, first, last)));
    }

    pub fn start_whois(&mut self, query: &str) {
        self.ops.push(Box::new(Whois::new(query)));
    }

    pub fn start_speedtest(&mut self, host: &str, port: u16, seconds: u64) {
        self.ops.push(Box::new(Speedtest::new(host, port, seconds)));
    }

    pub fn start_http_probe(&mut self, host: &str, port: u16, path: &str) {
        self.ops.push(Box::new(HttpProbe::new(host, port, path)));
    }

    pub fn start_mtu_probe(&mut self, host: &str) {
        self.ops.push(Box::new(MtuProbe::new(host)));
    }

    pub fn start_frag_test(&mut self, host: &str, size: usize) {
        self.ops.push(Box::new(FragTest::new(host, size)));
    }
}

// ── Traceroute ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceState {
    Resolve,
    Probe,
    Wait,
    Done,
}

struct Traceroute {
    host: String,
    addr: Option<SocketAddr>,
    socket: Option<UdpSocket>,
    state: TraceState,
    hop: u8,
    max_hops: u8,
    timeout: Duration,
    sent_at: Instant,
}

impl Traceroute {
    fn new(host: &str, max_hops: u8, timeout_ms: u64) -> Self {
        Self {
            host: host.to_string(),
            addr: None,
            socket: None,
            state: TraceState::Resolve,
            hop: 1,
            max_hops: max_hops.clamp(1, 64),
            timeout: Duration::from_millis(timeout_ms.max(50)),
            sent_at: Instant::now(),
        }
    }
}

impl DiagOp for Traceroute {
    fn name(&self) -> &'static str { "traceroute" }

    fn tick(&mut self) -> Step {
        match self.state {
            TraceState::Resolve => {
                // Classic UDP probe port range.
                let Some(addr) = resolve(&self.host, 33434) else {
                    self.state = TraceState::Done;
                    return Step::Done(format!("cannot resolve {}", self.host));
                };
                self.addr = Some(addr);
                self.state = TraceState::Probe;
                Step::Report(format!("traceroute to {} ({addr}), {} hops max", self.host, self.max_hops))
            }
            TraceState::Probe => {
                let Some(addr) = self.addr else {
                    self.state = TraceState::Done;
                    return Step::Done("lost address".into());
                };
                let probe = (|| -> std::io::Result<UdpSocket> {
                    let socket = UdpSocket::bind("0.0.0.0:0")?;
                    socket.set_nonblocking(true)?;
                    socket.set_ttl(u32::from(self.hop))?;
                    socket.connect(addr)?;
                    socket.send(b"kterm-probe")?;
                    Ok(socket)
                })();
                match probe {
                    Ok(socket) => {
                        self.socket = Some(socket);
                        self.sent_at = Instant::now();
                        self.state = TraceState::Wait;
                        Step::Pending
                    }
                    Err(err) => {
                        self.state = TraceState::Done;
                        Step::Done(format!("probe failed: {err}"))
                    }
                }
            }
            TraceState::Wait => {
                let mut buf = [0u8; 64];
                let reached = match self.socket.as_ref().map(|s| s.recv(&mut buf)) {
                    // A port-unreachable from the destination surfaces as
                    // ConnectionRefused on a connected UDP socket.
                    Some(Err(err)) if err.kind() == std::io::ErrorKind::ConnectionRefused => true,
                    Some(Ok(_)) => true,
                    _ => false,
                };
                if reached {
                    let rtt = self.sent_at.elapsed();
                    self.state = TraceState::Done;
                    return Step::Done(format!(
                        "{:2}  {}  {:.2} ms  (reached)",
                        self.hop,
                        self.host,
                        rtt.as_secs_f64() * 1000.0
                    ));
                }
                if self.sent_at.elapsed() > self.timeout {
                    let hop = self.hop;
                    self.hop += 1;
                    if self.hop > self.max_hops {
                        self.state = TraceState::Done;
                        return Step::Done("max hops exceeded".into());
                    }
                    self.state = TraceState::Probe;
                    return Step::Report(format!("{hop:2}  *  *  *"));
                }
                Step::Pending
            }
            TraceState::Done => Step::Done(String::new()),
        }
    }
}

// ── Extended ping (TCP connect timing) ──────────────────────────────────

struct PingExt {
    host: String,
    sent: u32,
    count: u32,
    samples: Vec<f64>,
}

impl PingExt {
    fn new(host: &str, count: u32) -> Self {
        Self {
            host: host.to_string(),
            sent: 0,
            count: count.clamp(1, 64),
            samples: Vec::new(),
        }
    }
}

impl DiagOp for PingExt {
    fn name(&self) -> &'static str { "ping" }

    /// One bounded connect-timing sample per tick.
    fn tick(&mut self) -> Step {
        if self.sent < self.count {
            self.sent += 1;
            if let Some(addr) = resolve(&self.host, 80) {
                let started = Instant::now();
                if TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_ok() {
                    self.samples.push(started.elapsed().as_secs_f64() * 1000.0);
                }
            }
            if self.sent < self.count {
                return Step::Pending;
            }
        }
        let received = self.samples.len();
        let avg = if received == 0 {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / received as f64
        };
        Step::Done(format!(
            "{} samples, {received} ok, avg {avg:.2} ms",
            self.sent
        ))
    }
}

// ── Port scan ───────────────────────────────────────────────────────────

struct PortScan {
    host: String,
    current: u16,
    last: u16,
    open: Vec<u16>,
}

impl PortScan {
    fn new(host: &str, first: u16, last: u16) -> Self {
        Self {
            host: host.to_string(),
            current: first.min(last),
            last: first.max(last),
            open: Vec::new(),
        }
    }
}

impl DiagOp for PortScan {
    fn name(&self) -> &'static str { "port-scan" }

    fn tick(&mut self) -> Step {
        // One port per tick keeps the scan cooperative and slow-scan polite.
        if self.current > self.last {
            return Step::Done(format!("open ports: {:?}", self.open));
        }
        let port = self.current;
        self.current = self.current.saturating_add(1);
        if let Some(addr) = resolve(&self.host, port)
            && TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
        {
            self.open.push(port);
        }
        if self.current > self.last {
            Step::Done(format!("open ports: {:?}", self.open))
        } else {
            Step::Pending
        }
    }
}

// ── Whois ───────────────────────────────────────────────────────────────

enum WhoisState {
    Connect,
    Read(TcpStream, Vec<u8>, Instant),
}

struct Whois {
    query: String,
    state: WhoisState,
}

impl Whois {
    fn new(query: &str) -> Self {
        Self { query: query.to_string(), state: WhoisState::Connect }
    }
}

impl DiagOp for Whois {
    fn name(&self) -> &'static str { "whois" }

    fn tick(&mut self) -> Step {
        match &mut self.state {
            WhoisState::Connect => {
                let Some(addr) = resolve("whois.iana.org", 43) else {
                    return Step::Done("cannot resolve whois server".into());
                };
                match TcpStream::connect_timeout(&addr, Duration::from_secs(5)) {
                    Ok(mut stream) => {
                        let _ = stream.write_all(format!("{}\r\n", self.query).as_bytes());
                        let _ = stream.set_nonblocking(true);
                        self.state = WhoisState::Read(stream, Vec::new(), Instant::now());
                        Step::Pending
                    }
                    Err(err) => Step::Done(format!("connect failed: {err}")),
                }
            }
            WhoisState::Read(stream, buf, started) => {
                let mut scratch = [0u8; 4096];
                loop {
                    match stream.read(&mut scratch) {
                        Ok(0) => {
                            let text = String::from_utf8_lossy(buf).into_owned();
                            return Step::Done(text);
                        }
                        Ok(n) if buf.len() + n < 64 * 1024 => buf.extend_from_slice(&scratch[..n]),
                        Ok(_) => return Step::Done(String::from_utf8_lossy(buf).into_owned()),
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                        Err(err) => return Step::Done(format!("read failed: {err}")),
                    }
                }
                if started.elapsed() > CONNECT_TIMEOUT {
                    return Step::Done(String::from_utf8_lossy(buf).into_owned());
                }
                Step::Pending
            }
        }
    }
}

// ── Speedtest (raw TCP throughput) ──────────────────────────────────────

enum SpeedState {
    Connect,
    Stream(TcpStream, Instant, u64),
}

struct Speedtest {
    host: String,
    port: u16,
    duration: Duration,
    state: SpeedState,
}

impl Speedtest {
    fn new(host: &str, port: u16, seconds: u64) -> Self {
        Self {
            host: host.to_string(),
            port,
            duration: Duration::from_secs(seconds.clamp(1, 30)),
            state: SpeedState::Connect,
        }
    }
}

impl DiagOp for Speedtest {
    fn name(&self) -> &'static str { "speedtest" }

    fn tick(&mut self) -> Step {
        match &mut self.state {
            SpeedState::Connect => {
                let Some(addr) = resolve(&self.host, self.port) else {
                    return Step::Done(format!("cannot resolve {}", self.host));
                };
                match TcpStream::connect_timeout(&addr, Duration::from_secs(5)) {
                    Ok(mut stream) => {
                        let request =
                            format!("GET / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", self.host);
                        let _ = stream.write_all(request.as_bytes());
                        let _ = stream.set_nonblocking(true);
                        self.state = SpeedState::Stream(stream, Instant::now(), 0);
                        Step::Pending
                    }
                    Err(err) => Step::Done(format!("connect failed: {err}")),
                }
            }
            SpeedState::Stream(stream, started, received) => {
                let mut scratch = [0u8; 16384];
                let mut finished = false;
                loop {
                    match stream.read(&mut scratch) {
                        Ok(0) => {
                            finished = true;
                            break;
                        }
                        Ok(n) => *received += n as u64,
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                        Err(_) => {
                            finished = true;
                            break;
                        }
                    }
                }
                let elapsed = started.elapsed();
                if finished || elapsed >= self.duration {
                    let secs = elapsed.as_secs_f64().max(0.001);
                    let mbps = (*received as f64 * 8.0) / secs / 1_000_000.0;
                    return Step::Done(format!(
                        "{received} bytes in {secs:.2} s ({mbps:.2} Mbit/s)"
                    ));
                }
                Step::Pending
            }
        }
    }
}

// ── HTTP probe ──────────────────────────────────────────────────────────

enum HttpState {
    Connect,
    Read(TcpStream, Vec<u8>, Instant),
}

struct HttpProbe {
    host: String,
    port: u16,
    path: String,
    state: HttpState,
}

impl HttpProbe {
    fn new(host: &str, port: u16, path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            state: HttpState::Connect,
        }
    }
}

impl DiagOp for HttpProbe {
    fn name(&self) -> &'static str { "http-probe" }

    fn tick(&mut self) -> Step {
        match &mut self.state {
            HttpState::Connect => {
                let Some(addr) = resolve(&self.host, self.port) else {
                    return Step::Done(format!("cannot resolve {}", self.host));
                };
                let started = Instant::now();
                match TcpStream::connect_timeout(&addr, Duration::from_secs(5)) {
                    Ok(mut stream) => {
                        let request = format!(
                            "HEAD {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
                            self.path, self.host
                        );
                        let _ = stream.write_all(request.as_bytes());
                        let _ = stream.set_nonblocking(true);
                        self.state = HttpState::Read(stream, Vec::new(), started);
                        Step::Pending
                    }
                    Err(err) => Step::Done(format!("connect failed: {err}")),
                }
            }
            HttpState::Read(stream, buf, started) => {
                let mut scratch = [0u8; 1024];
                match stream.read(&mut scratch) {
                    Ok(n) if n > 0 => buf.extend_from_slice(&scratch[..n]),
                    _ => {}
                }
                let has_line = buf.windows(2).any(|w| w == b"\r\n");
                if has_line || started.elapsed() > CONNECT_TIMEOUT {
                    let text = String::from_utf8_lossy(buf);
                    let status = text.lines().next().unwrap_or("no response").to_string();
                    let ms = started.elapsed().as_secs_f64() * 1000.0;
                    return Step::Done(format!("{status} ({ms:.1} ms)"));
                }
                Step::Pending
            }
        }
    }
}

// ── MTU probe / fragmentation test ──────────────────────────────────────

struct MtuProbe {
    host: String,
    low: usize,
    high: usize,
    best: usize,
}

impl MtuProbe {
    fn new(host: &str) -> Self {
        Self { host: host.to_string(), low: 576, high: 9000, best: 0 }
    }
}

impl DiagOp for MtuProbe {
    fn name(&self) -> &'static str { "mtu-probe" }

    fn tick(&mut self) -> Step {
        // Binary search on the largest datagram the local stack accepts;
        // one probe size per tick.
        let Some(addr) = resolve(&self.host, 33434) else {
            return Step::Done(format!("cannot resolve {}", self.host));
        };
        if self.low > self.high {
            return Step::Done(format!("largest accepted datagram: {} bytes", self.best));
        }
        let size = usize::midpoint(self.low, self.high);
        let ok = (|| -> std::io::Result<()> {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.connect(addr)?;
            socket.send(&vec![0u8; size])?;
            Ok(())
        })()
        .is_ok();
        if ok {
            self.best = self.best.max(size);
            self.low = size + 1;
        } else {
            self.high = size - 1;
        }
        Step::Pending
    }
}

struct FragTest {
    host: String,
    sizes: Vec<usize>,
    results: Vec<(usize, bool)>,
}

impl FragTest {
    fn new(host: &str, size: usize) -> Self {
        let base = size.clamp(576, 65000);
        Self {
            host: host.to_string(),
            sizes: vec![base / 2, base, base + base / 2],
            results: Vec::new(),
        }
    }
}

impl DiagOp for FragTest {
    fn name(&self) -> &'static str { "frag-test" }

    fn tick(&mut self) -> Step {
        let Some(addr) = resolve(&self.host, 33434) else {
            return Step::Done(format!("cannot resolve {}", self.host));
        };
        let Some(size) = self.sizes.pop() else {
            let summary: Vec<String> = self
                .results
                .iter()
                .map(|(size, ok)| format!("{size}:{}", if *ok { "sent" } else { "refused" }))
                .collect();
            return Step::Done(summary.join(" "));
        };
        let ok = (|| -> std::io::Result<()> {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.connect(addr)?;
            socket.send(&vec![0u8; size])?;
            Ok(())
        })()
        .is_ok();
        self.results.push((size, ok));
        Step::Pending
    }
}
