//! grblconf CLI - configure a GRBL-class CNC controller over serial.
//!
//! ## Features
//!
//! - Full setup: stop the conflicting CNC program, discover the controller,
//!   push and verify the axis-calibration settings, install the machine
//!   profile
//! - Port listing (plain or JSON)
//! - Interactive command shell for debugging
//! - Shell completion generation
//! - Environment variable support

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use console::style;
use env_logger::Env;
use grblconf::{
    CommandChannel, Connector, NativePort, Orchestrator, OrchestratorConfig, Outcome,
    ParameterSet, PortDescriptor, SerialConfig, SerialConnector, ZTravelSetting,
};
use log::{debug, warn};
use std::env;
use std::io;
use std::path::PathBuf;

mod config;
mod install;
mod notify;
mod process;
mod shell;

use config::Config;
use notify::ConsoleNotifier;

/// grblconf - configure a GRBL-class CNC controller over serial.
///
/// Environment variables:
///   GRBLCONF_PORT             - Serial port (skips discovery)
///   GRBLCONF_MARKER           - Device marker in the port description
///   GRBLCONF_Z_TRAVEL         - Z-axis max-travel key (132 or 140)
///   GRBLCONF_MAX_ATTEMPTS     - Scan/configure attempt bound
///   GRBLCONF_NON_INTERACTIVE  - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "grblconf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port to use (discovered by marker if not specified).
    #[arg(short, long, global = true, env = "GRBLCONF_PORT")]
    port: Option<String>,

    /// Device-name marker expected in the port description.
    #[arg(long, global = true, env = "GRBLCONF_MARKER")]
    marker: Option<String>,

    /// Z-axis max-travel setting key; controller revisions disagree, so
    /// there is no default.
    #[arg(long = "z-travel", global = true, value_enum, env = "GRBLCONF_Z_TRAVEL")]
    z_travel: Option<ZTravelArg>,

    /// Maximum number of scan/configure attempts.
    #[arg(long, global = true, env = "GRBLCONF_MAX_ATTEMPTS")]
    max_attempts: Option<usize>,

    /// Non-interactive mode (notifications print but do not wait).
    #[arg(long, global = true, env = "GRBLCONF_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Z-axis max-travel key choice.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ZTravelArg {
    /// $132, the standard GRBL Z max-travel key.
    #[value(name = "132")]
    Legacy,
    /// $140, used by some controller revisions.
    #[value(name = "140")]
    Extended,
}

impl From<ZTravelArg> for ZTravelSetting {
    fn from(arg: ZTravelArg) -> Self {
        match arg {
            ZTravelArg::Legacy => Self::Legacy,
            ZTravelArg::Extended => Self::Extended,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Stop the conflicting CNC program, configure and verify the
    /// controller, then install the machine profile.
    Setup {
        /// Skip installing the machine profile after a successful setup.
        #[arg(long)]
        skip_install: bool,
    },

    /// List available serial ports.
    ListPorts {
        /// Output the port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Open an interactive command shell on the controller.
    Shell,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    if env::var("NO_COLOR").is_ok() || !console::Term::stderr().is_term() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    debug!("grblconf v{}", env!("CARGO_PKG_VERSION"));

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Setup { skip_install } => cmd_setup(&cli, &config, *skip_install),
        Commands::ListPorts { json } => cmd_list_ports(*json),
        Commands::Shell => cmd_shell(&cli, &config),
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            Ok(())
        },
    }
}

/// Resolve the device marker from CLI, config, or the default.
fn resolve_marker(cli: &Cli, config: &Config) -> String {
    cli.marker
        .clone()
        .or_else(|| {
            config
                .device
                .marker
                .clone()
        })
        .unwrap_or_else(|| grblconf::DEFAULT_MARKER.to_string())
}

/// Resolve the Z-travel key choice; there is deliberately no default.
fn resolve_z_travel(cli: &Cli, config: &Config) -> Result<ZTravelSetting> {
    if let Some(arg) = cli.z_travel {
        return Ok(arg.into());
    }
    if let Some(choice) = config
        .device
        .z_travel()
    {
        return Ok(choice);
    }
    if config
        .device
        .z_travel
        .is_some()
    {
        bail!(
            "invalid z_travel in config file: expected \"132\" or \"140\", got {:?}",
            config
                .device
                .z_travel
        );
    }
    bail!(
        "the Z-axis max-travel key differs between controller revisions; \
         pass --z-travel 132 or --z-travel 140 (or set device.z_travel in grblconf.toml)"
    );
}

/// Connector pinned to one operator-specified port, bypassing discovery.
struct PinnedConnector {
    descriptor: PortDescriptor,
}

impl Connector for PinnedConnector {
    type Port = NativePort;

    fn scan(&mut self) -> Vec<PortDescriptor> {
        vec![
            self.descriptor
                .clone(),
        ]
    }

    fn open(&mut self, descriptor: &PortDescriptor) -> Result<Self::Port, grblconf::Error> {
        NativePort::open(&SerialConfig::new(&descriptor.device, grblconf::GRBL_BAUD))
    }
}

/// Setup command implementation: the full configuration sequence.
fn cmd_setup(cli: &Cli, config: &Config, skip_install: bool) -> Result<()> {
    let marker = resolve_marker(cli, config);
    let z_travel = resolve_z_travel(cli, config)?;
    let max_attempts = cli
        .max_attempts
        .or(config
            .retry
            .max_attempts)
        .unwrap_or(grblconf::DEFAULT_MAX_ATTEMPTS);

    // Stop the conflicting CNC program first so it cannot hold the port.
    let conflict = config
        .conflict
        .process
        .clone()
        .unwrap_or_else(|| process::DEFAULT_CONFLICT_PROCESS.to_string());
    if process::stop_conflicting_process(&conflict) && !cli.quiet {
        eprintln!("{} stopped {conflict}", style("✓").green());
    }

    let orchestrator_config = OrchestratorConfig::new(ParameterSet::shapeoko(z_travel))
        .with_marker(&marker)
        .with_max_attempts(max_attempts);
    let notifier = ConsoleNotifier::new(cli.non_interactive);

    let outcome = if let Some(ref port) = cli.port {
        // Operator pinned a port: skip scanning, still handshake.
        let connector = PinnedConnector {
            descriptor: PortDescriptor::new(port, &marker),
        };
        Orchestrator::new(connector, notifier, orchestrator_config).run()
    } else {
        Orchestrator::new(SerialConnector, notifier, orchestrator_config).run()
    };

    match outcome {
        Outcome::Done => {
            if !cli.quiet {
                eprintln!(
                    "{} {marker} controller configured and verified",
                    style("✓").green().bold()
                );
            }
            if !skip_install {
                install_machine_profile(cli, config)?;
            }
            Ok(())
        },
        Outcome::Aborted => {
            bail!("setup aborted after {max_attempts} attempt(s)")
        },
    }
}

/// Copy the machine profile into the CNC sender's data directory.
///
/// Best-effort, like the rest of the post-setup steps: a copy failure is
/// reported but does not undo a verified controller configuration.
fn install_machine_profile(cli: &Cli, config: &Config) -> Result<()> {
    let file = config
        .install
        .file
        .clone()
        .unwrap_or_else(|| install::DEFAULT_PROFILE_FILE.to_string());
    let subdir = config
        .install
        .dest_subdir
        .clone()
        .unwrap_or_else(|| install::DEFAULT_DEST_SUBDIR.to_string());

    let Some(dest_dir) = install::default_dest_dir(&subdir) else {
        warn!("could not determine the local app-data directory, skipping profile install");
        return Ok(());
    };
    let source_dir = install::profile_source_dir();

    match install::install_profile(&file, &source_dir, &dest_dir) {
        Ok(()) => {
            if !cli.quiet {
                eprintln!(
                    "{} installed {file} to {}",
                    style("✓").green(),
                    dest_dir.display()
                );
            }
        },
        Err(e) => warn!("failed to install machine profile: {e:#}"),
    }
    Ok(())
}

/// List-ports command implementation.
fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = grblconf::scan();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ports).context("failed to serialize port list")?
        );
        return Ok(());
    }

    if ports.is_empty() {
        eprintln!("no serial ports found");
        return Ok(());
    }

    for port in ports {
        println!("{}  {}", style(&port.device).cyan(), port.description);
    }
    Ok(())
}

/// Shell command implementation.
fn cmd_shell(cli: &Cli, config: &Config) -> Result<()> {
    let marker = resolve_marker(cli, config);

    let descriptor = if let Some(ref port) = cli.port {
        PortDescriptor::new(port, &marker)
    } else {
        let ports = grblconf::scan();
        grblconf::filter_candidates(&ports, &marker)
            .first()
            .map(|d| (*d).clone())
            .with_context(|| format!("no serial port matching \"{marker}\" found"))?
    };

    let mut channel: CommandChannel<NativePort> = grblconf::connect(&descriptor)
        .with_context(|| format!("could not connect to {}", descriptor.device))?;

    let result = shell::run(&mut channel);
    let _ = channel.close();
    result
}

/// Completions command implementation.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "grblconf", &mut io::stdout());
}
