//! Interactive command shell over the command channel.
//!
//! A debugging convenience layered on top of the channel; not part of the
//! configuration protocol.

use anyhow::Result;
use console::style;
use dialoguer::Input;
use grblconf::{CommandChannel, NativePort};

/// Read commands from the operator and relay them until `exit`.
pub fn run(channel: &mut CommandChannel<NativePort>) -> Result<()> {
    eprintln!(
        "connected to {} — type {} to quit",
        style(channel.port_name()).cyan(),
        style("exit").yellow()
    );

    loop {
        let command: String = Input::new()
            .with_prompt("grbl")
            .allow_empty(true)
            .interact_text()?;
        let command = command.trim();

        if command.eq_ignore_ascii_case("exit") {
            break;
        }
        if command.is_empty() {
            continue;
        }

        match channel.send(command) {
            Ok(lines) if lines.is_empty() => {
                eprintln!("{}", style("<no response received from controller>").dim());
            },
            Ok(lines) => {
                for line in lines {
                    println!("{line}");
                }
            },
            Err(e) => eprintln!("{} {e}", style("error:").red()),
        }
    }

    Ok(())
}
