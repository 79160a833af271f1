//! # grblconf
//!
//! A library for discovering and configuring GRBL-class CNC controllers
//! (such as the Shapeoko) over a serial link.
//!
//! The crate implements the discovery–handshake–configure–verify state
//! machine with classified retry:
//!
//! - Port enumeration and marker-based candidate filtering
//! - Wake handshake against the firmware banner
//! - Line-oriented command channel with bounded I/O retry
//! - Parameter push and `$$` dump reconciliation
//! - Retry orchestration with operator notifications at a trait seam
//!
//! ## Example
//!
//! ```rust,no_run
//! use grblconf::{
//!     Notifier, Orchestrator, OrchestratorConfig, Outcome, ParameterSet, SerialConnector,
//!     ZTravelSetting,
//! };
//!
//! struct StdoutNotifier;
//!
//! impl Notifier for StdoutNotifier {
//!     fn notify(&mut self, title: &str, message: &str, _image_hint: Option<&str>) {
//!         println!("{title}\n{message}");
//!     }
//! }
//!
//! let params = ParameterSet::shapeoko(ZTravelSetting::Legacy);
//! let config = OrchestratorConfig::new(params);
//! let mut orchestrator = Orchestrator::new(SerialConnector, StdoutNotifier, config);
//!
//! match orchestrator.run() {
//!     Outcome::Done => println!("controller configured"),
//!     Outcome::Aborted => println!("gave up"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod port;
pub mod scan;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use {
    channel::{CommandChannel, SEND_RETRIES},
    error::{Error, Result},
    handshake::{BANNER_TOKEN, GRBL_BAUD, WAKE_SEQUENCE, banner_present, connect, wake},
    orchestrator::{
        AttemptOutcome, Connector, DEFAULT_MARKER, DEFAULT_MAX_ATTEMPTS, Notifier, Orchestrator,
        OrchestratorConfig, Outcome, SerialConnector,
    },
    port::{NativePort, Port, SerialConfig},
    scan::{PortDescriptor, filter_candidates, scan},
    settings::{
        DUMP_COMMAND, ParameterCheck, ParameterSet, ParameterSpec, VerificationOutcome,
        ZTravelSetting, configure_and_verify, reconcile,
    },
};
