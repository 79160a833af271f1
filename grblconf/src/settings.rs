//! Stepper/travel parameter contract, configuration, and verification.
//!
//! The configuration contract is an ordered set of `$<id>=<value>` settings.
//! After pushing them, the `$$` dump is reconciled line-by-line against the
//! expected values: a setting is considered applied when some dump line
//! contains both the key and the value as substrings. Substring containment
//! (rather than field parsing) tolerates firmware formatting variance such
//! as trailing units or whitespace.

use crate::channel::CommandChannel;
use crate::port::Port;
use log::{debug, info, warn};
use std::fmt;

/// Settings-dump request: returns one line per current setting.
pub const DUMP_COMMAND: &str = "$$";

/// One expected `key=value` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSpec {
    /// Setting key, e.g. `$100`.
    pub key: String,
    /// Expected value, e.g. `26.667`.
    pub value: String,
}

impl ParameterSpec {
    /// Create a spec from key and expected value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The set-command line for this spec.
    pub fn command(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Whether a dump line reports this setting at the expected value.
    pub fn matches_line(&self, line: &str) -> bool {
        line.contains(&self.key) && line.contains(&self.value)
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Which key the firmware uses for Z-axis maximum travel.
///
/// Controller firmware revisions disagree on the key (`$132` vs `$140`), so
/// the choice is a configuration input and is never defaulted silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZTravelSetting {
    /// `$132`, the standard GRBL Z max-travel key.
    Legacy,
    /// `$140`, used by some controller revisions.
    Extended,
}

impl ZTravelSetting {
    /// The setting key for this choice.
    pub fn key(self) -> &'static str {
        match self {
            Self::Legacy => "$132",
            Self::Extended => "$140",
        }
    }

    /// Parse from the bare setting id, with or without the `$` prefix.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim_start_matches('$') {
            "132" => Some(Self::Legacy),
            "140" => Some(Self::Extended),
            _ => None,
        }
    }
}

/// The ordered configuration contract the device must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSet {
    specs: Vec<ParameterSpec>,
}

impl ParameterSet {
    /// Build a set from an explicit ordered list.
    pub fn custom(specs: Vec<ParameterSpec>) -> Self {
        Self { specs }
    }

    /// The six-entry Shapeoko axis-calibration contract: X/Y/Z steps per
    /// millimeter and X/Y/Z maximum travel.
    pub fn shapeoko(z_travel: ZTravelSetting) -> Self {
        Self {
            specs: vec![
                ParameterSpec::new("$100", "26.667"),
                ParameterSpec::new("$101", "26.667"),
                ParameterSpec::new("$102", "200"),
                ParameterSpec::new("$130", "507"),
                ParameterSpec::new("$131", "490"),
                ParameterSpec::new(z_travel.key(), "140"),
            ],
        }
    }

    /// The specs in contract order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Number of specs in the contract.
    pub fn len(&self) -> usize {
        self.specs
            .len()
    }

    /// Whether the contract is empty.
    pub fn is_empty(&self) -> bool {
        self.specs
            .is_empty()
    }
}

/// Verification result for one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterCheck {
    /// Setting key.
    pub key: String,
    /// Expected value.
    pub value: String,
    /// Whether some dump line reported the expected value.
    pub matched: bool,
}

/// Result of reconciling a settings dump against a [`ParameterSet`].
///
/// Always holds exactly one check per spec, in spec order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerificationOutcome {
    /// Per-parameter checks, in contract order.
    pub checks: Vec<ParameterCheck>,
    /// False when the dump produced no lines at all, distinguishing
    /// "wrong values" from "could not check".
    pub data_available: bool,
}

impl VerificationOutcome {
    /// Whether verification data was available and every parameter matched.
    pub fn is_success(&self) -> bool {
        self.data_available
            && self
                .checks
                .iter()
                .all(|c| c.matched)
    }

    /// Keys of the parameters that did not verify, in contract order.
    pub fn failed_keys(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.matched)
            .map(|c| {
                c.key
                    .as_str()
            })
            .collect()
    }
}

/// Reconcile dump response lines against the expected parameter set.
///
/// Order-preserving and total: one check per spec, no omissions. Zero dump
/// lines yields all-unmatched checks with `data_available = false`.
pub fn reconcile(set: &ParameterSet, dump_lines: &[String]) -> VerificationOutcome {
    let data_available = !dump_lines.is_empty();

    let checks = set
        .specs()
        .iter()
        .map(|spec| {
            let matched = data_available
                && dump_lines
                    .iter()
                    .any(|line| spec.matches_line(line));
            ParameterCheck {
                key: spec
                    .key
                    .clone(),
                value: spec
                    .value
                    .clone(),
                matched,
            }
        })
        .collect();

    VerificationOutcome {
        checks,
        data_available,
    }
}

/// Push the parameter set to the controller, then dump and reconcile.
///
/// Set-command responses are observed but not required: firmware may echo
/// nothing or an acknowledgment, and a per-command I/O failure does not
/// abort the attempt. Verification always runs against whatever the dump
/// returns; a failed or silent dump yields an all-unmatched outcome with
/// `data_available = false`.
pub fn configure_and_verify<P: Port>(
    channel: &mut CommandChannel<P>,
    set: &ParameterSet,
) -> VerificationOutcome {
    for spec in set.specs() {
        let command = spec.command();
        match channel.send(&command) {
            Ok(lines) => debug!("{command}: {} response line(s)", lines.len()),
            Err(e) => warn!("no response to {command}: {e}"),
        }
    }

    match channel.send(DUMP_COMMAND) {
        Ok(lines) => {
            let outcome = reconcile(set, &lines);
            for check in &outcome.checks {
                if check.matched {
                    info!("{} set correctly to {}", check.key, check.value);
                } else {
                    warn!("{} not set correctly", check.key);
                }
            }
            outcome
        },
        Err(e) => {
            warn!("settings dump failed: {e}");
            reconcile(set, &[])
        },
    }
}
