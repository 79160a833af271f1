//! Best-effort shutdown of a conflicting CNC desktop application.
//!
//! A running G-code sender (e.g. Carbide Motion) keeps the serial port
//! claimed, which the orchestrator would otherwise classify as an
//! access-denied failure on every attempt.

use log::{debug, info, warn};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// Default conflicting application on Shapeoko machines.
pub const DEFAULT_CONFLICT_PROCESS: &str = "carbidemotion.exe";

/// Terminate every process whose name matches, waiting for each to exit.
///
/// Case-insensitive name comparison; returns whether anything was stopped.
/// Failures are logged and swallowed — the orchestration proceeds either
/// way and surfaces a held port as access-denied.
pub fn stop_conflicting_process(name: &str) -> bool {
    let mut system = System::new_with_specifics(
        RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()),
    );
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut stopped = false;
    for (pid, process) in system.processes() {
        let process_name = process
            .name()
            .to_string_lossy();
        if !process_name.eq_ignore_ascii_case(name) {
            continue;
        }

        info!("found running process {process_name} with PID {pid}, terminating it");
        if process.kill() {
            process.wait();
            info!("process terminated");
            stopped = true;
        } else {
            warn!("failed to terminate {process_name} (PID {pid})");
        }
    }

    if !stopped {
        debug!("{name} is not running");
    }
    stopped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_unknown_process_is_a_noop() {
        assert!(!stop_conflicting_process(
            "grblconf-no-such-process-name.exe"
        ));
    }
}
