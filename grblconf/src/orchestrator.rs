//! Top-level connection orchestration.
//!
//! One attempt (cycle) is a full scan → handshake → configure → verify pass.
//! Cycles repeat up to a configured maximum; every cycle re-scans from
//! scratch because the physical device may have changed port assignment or
//! power state between attempts. Failure classifications map to
//! operator-facing notifications, and an access-denied classification ends
//! the cycle immediately since trying another candidate cannot release a
//! port held by another program.
//!
//! Everything here is single-threaded blocking I/O; the only suspension
//! points are the per-read serial timeouts and the operator notification,
//! which blocks until acknowledged.

use crate::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::handshake::{self, GRBL_BAUD};
use crate::port::{NativePort, Port, SerialConfig};
use crate::scan::{self, PortDescriptor};
use crate::settings::{self, ParameterSet, VerificationOutcome};
use log::{debug, info, warn};

/// Default device-name marker expected in the port description.
pub const DEFAULT_MARKER: &str = "Shapeoko";

/// Default bound on full scan→configure cycles.
pub const DEFAULT_MAX_ATTEMPTS: usize = 4;

/// Operator-notification sink.
///
/// Implementations are expected to block until the operator acknowledges;
/// the orchestrator does not start the next cycle until `notify` returns.
pub trait Notifier {
    /// Show an outcome-specific message, optionally with an illustration.
    fn notify(&mut self, title: &str, message: &str, image_hint: Option<&str>);
}

/// Produces the port list and opens candidate ports.
///
/// The production implementation is [`SerialConnector`]; tests substitute a
/// scripted one.
pub trait Connector {
    /// Port type produced by `open`.
    type Port: Port;

    /// Enumerate all serial ports currently visible, in OS order.
    fn scan(&mut self) -> Vec<PortDescriptor>;

    /// Open a candidate port at the controller baud rate.
    fn open(&mut self, descriptor: &PortDescriptor) -> Result<Self::Port>;
}

/// Connector over real serial ports.
#[derive(Debug, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Port = NativePort;

    fn scan(&mut self) -> Vec<PortDescriptor> {
        scan::scan()
    }

    fn open(&mut self, descriptor: &PortDescriptor) -> Result<Self::Port> {
        NativePort::open(&SerialConfig::new(&descriptor.device, GRBL_BAUD))
    }
}

/// Classified result of one full cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Controller found, configured, and verified.
    Success,
    /// Empty enumeration or no marker-matching port.
    PortNotFound,
    /// A candidate port is claimed by another process.
    AccessDenied,
    /// A candidate answered, but never with the firmware banner.
    HandshakeFailed,
    /// Transport faults exhausted every candidate.
    IoError(String),
    /// Device reachable but one or more settings did not verify.
    VerificationFailed(VerificationOutcome),
}

/// Terminal result of an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Configuration verified; no further action needed.
    Done,
    /// Retry budget exhausted; the final notification has been sent.
    Aborted,
}

/// Orchestration parameters.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Device-name marker expected in the port description.
    pub marker: String,
    /// Maximum number of scan→configure cycles.
    pub max_attempts: usize,
    /// The parameter contract to push and verify.
    pub params: ParameterSet,
}

impl OrchestratorConfig {
    /// Configuration with default marker and attempt bound.
    pub fn new(params: ParameterSet) -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            params,
        }
    }

    /// Override the device-name marker.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Override the cycle bound.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// The discovery–handshake–configure–verify retry state machine.
pub struct Orchestrator<C: Connector, N: Notifier> {
    connector: C,
    notifier: N,
    config: OrchestratorConfig,
}

impl<C: Connector, N: Notifier> Orchestrator<C, N> {
    /// Create an orchestrator over the given connector and notifier.
    pub fn new(connector: C, notifier: N, config: OrchestratorConfig) -> Self {
        Self {
            connector,
            notifier,
            config,
        }
    }

    /// Run cycles until the controller verifies or the budget is exhausted.
    ///
    /// Every cycle-ending failure sends exactly one notification before the
    /// next cycle starts; exhaustion sends one final notification before
    /// returning [`Outcome::Aborted`].
    pub fn run(&mut self) -> Outcome {
        let max = self
            .config
            .max_attempts;

        for attempt in 1..=max {
            info!(
                "looking for {} controller, connection attempt {attempt}/{max}",
                self.config
                    .marker
            );

            match self.attempt_cycle() {
                AttemptOutcome::Success => {
                    info!(
                        "{} controller configured and verified",
                        self.config
                            .marker
                    );
                    return Outcome::Done;
                },
                outcome => {
                    warn!("attempt {attempt}/{max} failed: {outcome:?}");
                    self.notify_cycle(&outcome);
                },
            }
        }

        warn!("connection failed after {max} attempts, aborting");
        self.notify_exhausted();
        Outcome::Aborted
    }

    /// One scan → handshake → configure → verify pass.
    fn attempt_cycle(&mut self) -> AttemptOutcome {
        let ports = self
            .connector
            .scan();
        debug!("scan found {} port(s)", ports.len());

        let candidates: Vec<PortDescriptor> = scan::filter_candidates(
            &ports,
            &self
                .config
                .marker,
        )
        .into_iter()
        .cloned()
        .collect();

        if candidates.is_empty() {
            return AttemptOutcome::PortNotFound;
        }

        let mut banner_missed = false;
        let mut last_io_fault: Option<String> = None;

        for descriptor in &candidates {
            info!("checking port {}", descriptor.device);

            let port = match self
                .connector
                .open(descriptor)
            {
                Ok(port) => port,
                Err(e) if e.is_access_denied() => {
                    warn!("{e}");
                    return AttemptOutcome::AccessDenied;
                },
                Err(e) => {
                    // Candidate abandoned; the next marker match may still
                    // answer.
                    warn!("error opening {}: {e}", descriptor.device);
                    last_io_fault = Some(e.to_string());
                    continue;
                },
            };

            let mut channel = CommandChannel::new(port);

            match handshake::wake(&mut channel) {
                Ok(()) => {
                    info!(
                        "{} controller found on {}",
                        self.config
                            .marker,
                        descriptor.device
                    );
                    let outcome = settings::configure_and_verify(
                        &mut channel,
                        &self
                            .config
                            .params,
                    );
                    let _ = channel.close();

                    if outcome.is_success() {
                        return AttemptOutcome::Success;
                    }
                    return AttemptOutcome::VerificationFailed(outcome);
                },
                Err(e) => {
                    let _ = channel.close();
                    match e {
                        Error::AccessDenied { .. } => {
                            warn!("{e}");
                            return AttemptOutcome::AccessDenied;
                        },
                        Error::HandshakeFailed(reason) => {
                            warn!("no banner on {}: {reason}", descriptor.device);
                            banner_missed = true;
                        },
                        other => {
                            warn!("I/O fault on {}: {other}", descriptor.device);
                            last_io_fault = Some(other.to_string());
                        },
                    }
                },
            }
        }

        if banner_missed {
            AttemptOutcome::HandshakeFailed
        } else if let Some(details) = last_io_fault {
            AttemptOutcome::IoError(details)
        } else {
            AttemptOutcome::HandshakeFailed
        }
    }

    /// Send the one cycle-ending notification for a failed cycle.
    fn notify_cycle(&mut self, outcome: &AttemptOutcome) {
        let marker = self
            .config
            .marker
            .clone();

        match outcome {
            AttemptOutcome::Success => {},
            AttemptOutcome::PortNotFound | AttemptOutcome::HandshakeFailed => {
                self.notifier
                    .notify(
                        &format!("{marker} Controller Not Found"),
                        &format!(
                            "The {marker} controller does not appear to be turned on and/or \
                             connected to the computer. Please make sure the e-stop switch is in \
                             the reset/up position by turning it clockwise until it clicks and \
                             pops up. Click OK when you've verified that the e-stop is reset and \
                             the controller is running."
                        ),
                        Some(image::ESTOP_RESET),
                    );
            },
            AttemptOutcome::AccessDenied => {
                self.notifier
                    .notify(
                        "Access Denied",
                        &format!(
                            "An access-denied error occurred while trying to connect to the \
                             {marker} controller. This usually means another CNC program is \
                             already connected to it. Please make sure all CNC programs are \
                             closed, then try again."
                        ),
                        Some(image::OOPS),
                    );
            },
            AttemptOutcome::IoError(details) => {
                self.notifier
                    .notify(
                        "Connection Error",
                        &format!(
                            "The following error occurred while trying to connect to the \
                             {marker} controller: {details}\nPlease make sure all CNC programs \
                             are closed, then try again. You might also need to reset the \
                             controller by pressing the red E-STOP button and turning it \
                             clockwise to restore power."
                        ),
                        Some(image::ERROR),
                    );
            },
            AttemptOutcome::VerificationFailed(verification) => {
                let body = if verification.data_available {
                    let failures: Vec<String> = verification
                        .failed_keys()
                        .iter()
                        .map(|key| format!("{key} not set correctly"))
                        .collect();
                    format!(
                        "One or more failures occurred while verifying the {marker} controller \
                         configuration:\n{}\nYou might need to reset the controller by pressing \
                         the red E-STOP button and turning it clockwise to restore power.",
                        failures.join("\n")
                    )
                } else {
                    format!(
                        "Failed to verify the {marker} controller configuration with the \
                         '{}' dump command. No response received from the controller.",
                        settings::DUMP_COMMAND
                    )
                };
                self.notifier
                    .notify("Controller Configuration Error", &body, Some(image::ERROR));
            },
        }
    }

    /// Send the final notification after the retry budget is exhausted.
    fn notify_exhausted(&mut self) {
        let marker = self
            .config
            .marker
            .clone();
        let attempts = self
            .config
            .max_attempts;

        self.notifier
            .notify(
                &format!("{marker} Controller Not Found"),
                &format!(
                    "The {marker} controller still couldn't be configured after {attempts} \
                     attempts. You may need to reset the controller by pressing the red E-STOP \
                     button and turning it clockwise to restore power. If this problem persists, \
                     please report it to the workshop maintainers."
                ),
                Some(image::OHNO),
            );
    }
}

/// Illustration file names passed through as notification image hints.
pub mod image {
    /// How to reset the e-stop switch.
    pub const ESTOP_RESET: &str = "estop_reset.png";
    /// Another program holds the port.
    pub const OOPS: &str = "oops.png";
    /// Generic connection error.
    pub const ERROR: &str = "error.png";
    /// Final give-up notice.
    pub const OHNO: &str = "ohno.png";
}
