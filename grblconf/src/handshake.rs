//! Controller wake-up and firmware banner detection.
//!
//! A GRBL controller answers two blank lines with its firmware banner
//! (e.g. `Grbl 1.1h ['$' for help]`). Seeing the banner token anywhere in
//! the response burst is the whole handshake.

use crate::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::port::{NativePort, Port, SerialConfig};
use crate::scan::PortDescriptor;
use log::{debug, info};

/// Fixed baud rate of GRBL-class controllers.
pub const GRBL_BAUD: u32 = 115200;

/// Wake sequence: two blank lines.
pub const WAKE_SEQUENCE: &[u8] = b"\r\n\r\n";

/// Firmware identification token expected in the banner.
pub const BANNER_TOKEN: &str = "Grbl";

/// Whether any response line contains the firmware banner token.
pub fn banner_present(lines: &[String]) -> bool {
    lines
        .iter()
        .any(|line| line.contains(BANNER_TOKEN))
}

/// Send the wake sequence and confirm the firmware banner.
///
/// Returns [`Error::HandshakeFailed`] when the controller answers without
/// the banner token (or not at all) within the read budget.
pub fn wake<P: Port>(channel: &mut CommandChannel<P>) -> Result<()> {
    debug!("waking controller on {}", channel.port_name());
    let lines = channel.send_raw(WAKE_SEQUENCE)?;

    if banner_present(&lines) {
        info!("firmware banner received on {}", channel.port_name());
        Ok(())
    } else {
        Err(Error::HandshakeFailed(format!(
            "no '{BANNER_TOKEN}' banner in {} response line(s)",
            lines.len()
        )))
    }
}

/// Open a candidate port and perform the wake handshake.
///
/// On success the open channel is returned and the caller owns it until it
/// is closed. A permission-style open failure propagates as
/// [`Error::AccessDenied`] untouched so the caller can stop probing further
/// candidates. On a handshake failure the port is closed before returning.
pub fn connect(descriptor: &PortDescriptor) -> Result<CommandChannel<NativePort>> {
    let config = SerialConfig::new(&descriptor.device, GRBL_BAUD);
    let port = NativePort::open(&config)?;
    let mut channel = CommandChannel::new(port);

    match wake(&mut channel) {
        Ok(()) => Ok(channel),
        Err(e) => {
            let _ = channel.close();
            Err(e)
        },
    }
}
