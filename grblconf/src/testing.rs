//! Scripted doubles shared by the unit tests: a mock port with canned
//! response bursts, a mock connector, and a recording notifier.

use crate::error::{Error, Result};
use crate::orchestrator::{Connector, Notifier};
use crate::port::Port;
use crate::scan::PortDescriptor;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct PortState {
    // Each entry is either a chunk of incoming bytes or a timeout marker
    // that ends the current read burst.
    reads: VecDeque<Option<Vec<u8>>>,
    written: Vec<u8>,
    write_attempts: usize,
    fail_writes: usize,
    clear_count: usize,
    closed: bool,
}

/// Serial port double driven by a script of response bursts.
pub(crate) struct MockPort {
    state: Arc<Mutex<PortState>>,
    timeout: Duration,
}

/// Handle kept by the test to script and inspect a [`MockPort`] after it has
/// been moved into a channel or orchestrator.
#[derive(Clone)]
pub(crate) struct MockPortHandle(Arc<Mutex<PortState>>);

impl MockPort {
    pub(crate) fn new() -> (Self, MockPortHandle) {
        let state = Arc::new(Mutex::new(PortState::default()));
        (
            Self {
                state: Arc::clone(&state),
                timeout: Duration::from_millis(1000),
            },
            MockPortHandle(state),
        )
    }
}

impl MockPortHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, PortState> {
        self.0
            .lock()
            .expect("mock port state poisoned")
    }

    /// Queue one response burst: the lines arrive as a single chunk, then
    /// the next read times out.
    pub(crate) fn push_burst(&self, lines: &[&str]) {
        let mut raw = Vec::new();
        for line in lines {
            raw.extend_from_slice(line.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        let mut state = self.lock();
        state
            .reads
            .push_back(Some(raw));
        state
            .reads
            .push_back(None);
    }

    /// Queue an empty burst: the first read of the next command times out.
    pub(crate) fn push_timeout(&self) {
        self.lock()
            .reads
            .push_back(None);
    }

    /// Fail the next `n` writes with a broken-pipe I/O error.
    pub(crate) fn fail_writes(&self, n: usize) {
        self.lock()
            .fail_writes = n;
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.lock()
            .written
            .clone()
    }

    pub(crate) fn write_attempts(&self) -> usize {
        self.lock()
            .write_attempts
    }

    pub(crate) fn clear_count(&self) -> usize {
        self.lock()
            .clear_count
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock()
            .closed
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .expect("mock port state poisoned");

        match state
            .reads
            .pop_front()
        {
            Some(Some(mut chunk)) => {
                if chunk.len() > buf.len() {
                    let rest = chunk.split_off(buf.len());
                    state
                        .reads
                        .push_front(Some(rest));
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            },
            // Timeout marker or script exhausted: behave like a blocking
            // read that ran out of its per-read budget.
            Some(None) | None => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read timed out",
            )),
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .expect("mock port state poisoned");

        state.write_attempts += 1;
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted write fault",
            ));
        }

        state
            .written
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_input(&mut self) -> Result<()> {
        self.state
            .lock()
            .expect("mock port state poisoned")
            .clear_count += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn close(&mut self) -> Result<()> {
        self.state
            .lock()
            .expect("mock port state poisoned")
            .closed = true;
        Ok(())
    }
}

/// Connector double: scripted scan results and open outcomes.
pub(crate) struct MockConnector {
    scans: VecDeque<Vec<PortDescriptor>>,
    opens: VecDeque<Result<MockPort>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self {
            scans: VecDeque::new(),
            opens: VecDeque::new(),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the port list returned by one scan cycle. Once the queue is
    /// exhausted, further scans return an empty list.
    pub(crate) fn push_scan(&mut self, ports: Vec<PortDescriptor>) {
        self.scans
            .push_back(ports);
    }

    /// Queue the result of the next `open` call, in call order.
    pub(crate) fn push_open(&mut self, result: Result<MockPort>) {
        self.opens
            .push_back(result);
    }

    /// Handle listing the device paths passed to `open`, in order.
    pub(crate) fn opened_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.opened)
    }
}

impl Connector for MockConnector {
    type Port = MockPort;

    fn scan(&mut self) -> Vec<PortDescriptor> {
        self.scans
            .pop_front()
            .unwrap_or_default()
    }

    fn open(&mut self, descriptor: &PortDescriptor) -> Result<Self::Port> {
        self.opened
            .lock()
            .expect("opened list poisoned")
            .push(
                descriptor
                    .device
                    .clone(),
            );
        self.opens
            .pop_front()
            .unwrap_or_else(|| {
                Err(Error::Serial(serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    "open script exhausted",
                )))
            })
    }
}

/// One operator notification as the recording notifier saw it.
#[derive(Debug, Clone)]
pub(crate) struct Notification {
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) image_hint: Option<String>,
}

/// Notifier double that records every call.
pub(crate) struct RecordingNotifier {
    calls: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls_handle(&self) -> Arc<Mutex<Vec<Notification>>> {
        Arc::clone(&self.calls)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, title: &str, message: &str, image_hint: Option<&str>) {
        self.calls
            .lock()
            .expect("notification list poisoned")
            .push(Notification {
                title: title.to_string(),
                message: message.to_string(),
                image_hint: image_hint.map(str::to_string),
            });
    }
}
