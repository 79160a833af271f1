//! Serial port enumeration and candidate filtering.
//!
//! The controller identifies itself to the OS through its USB device
//! description (e.g. "Shapeoko XYZ"), so discovery is a plain enumeration
//! followed by a substring filter on the description — no VID/PID tables.

use log::{debug, trace};

/// One serial port visible to the operating system.
///
/// Produced by [`scan`]; valid for one scan only. The physical device may
/// change port assignment between scans, so descriptors are never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortDescriptor {
    /// Port name/path (e.g., "/dev/ttyACM0" or "COM5").
    pub device: String,
    /// Human-readable description reported by the OS.
    pub description: String,
}

impl PortDescriptor {
    /// Create a descriptor from a device path and description.
    pub fn new(device: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
        }
    }

    /// Whether the OS description carries the device marker substring.
    ///
    /// Case-sensitive, consistent with how the device reports itself.
    pub fn matches_marker(&self, marker: &str) -> bool {
        self.description
            .contains(marker)
    }
}

/// Enumerate all serial ports currently visible to the operating system.
///
/// Ports are returned in OS-reported order. This is a pure query and never
/// fails: an enumeration error yields an empty list, the same as a system
/// with no serial ports.
pub fn scan() -> Vec<PortDescriptor> {
    match serialport::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| {
                let description = describe(&p.port_type);
                trace!("found port {} ({description})", p.port_name);
                PortDescriptor {
                    device: p.port_name,
                    description,
                }
            })
            .collect(),
        Err(e) => {
            debug!("failed to enumerate serial ports: {e}");
            Vec::new()
        },
    }
}

/// Build the human-readable description for a port.
fn describe(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => info
            .product
            .clone()
            .or_else(|| {
                info.manufacturer
                    .clone()
            })
            .unwrap_or_else(|| "USB serial device".to_string()),
        serialport::SerialPortType::BluetoothPort => "Bluetooth serial device".to_string(),
        serialport::SerialPortType::PciPort => "PCI serial device".to_string(),
        serialport::SerialPortType::Unknown => "Unknown serial device".to_string(),
    }
}

/// Filter a scan to the descriptors whose description contains `marker`.
///
/// Order-preserving; returns exactly the marker-matching subset.
pub fn filter_candidates<'a>(
    ports: &'a [PortDescriptor],
    marker: &str,
) -> Vec<&'a PortDescriptor> {
    ports
        .iter()
        .filter(|p| p.matches_marker(marker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ports() -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::new("COM3", "USB Serial"),
            PortDescriptor::new("COM5", "Shapeoko XYZ"),
            PortDescriptor::new("/dev/ttyACM0", "Shapeoko controller"),
            PortDescriptor::new("COM7", "Bluetooth serial device"),
        ]
    }

    #[test]
    fn test_filter_keeps_only_marker_matches_in_order() {
        let ports = sample_ports();
        let candidates = filter_candidates(&ports, "Shapeoko");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].device, "COM5");
        assert_eq!(candidates[1].device, "/dev/ttyACM0");
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let ports = sample_ports();
        assert!(filter_candidates(&ports, "shapeoko").is_empty());
    }

    #[test]
    fn test_filter_empty_scan() {
        assert!(filter_candidates(&[], "Shapeoko").is_empty());
    }

    #[test]
    fn test_filter_no_match() {
        let ports = sample_ports();
        assert!(filter_candidates(&ports, "Nomad").is_empty());
    }

    #[test]
    fn test_scan_does_not_panic() {
        // Just make sure enumeration never fails outright
        let _ = scan();
    }
}
