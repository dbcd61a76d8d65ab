use std::path::PathBuf;
use std::process::ExitCode;

use bpaf::{Args, Bpaf, ParseFailure};
use linux_embedded_hal::I2cdev;
use serde_json::Value;

use crate::config::Config;
use crate::detection::{DriverTable, Hardware};
use crate::dispatch::{command, Command};
use crate::lock::BusLock;

mod adapter;
mod config;
mod detection;
mod dispatch;
mod lock;
mod pressure;

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Config file to use instead of the platform default
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    /// I2C bus device, overrides the config file
    #[bpaf(long, env("HATCTL_BUS"), argument("PATH"))]
    bus: Option<PathBuf>,
    /// Print json on a single line
    #[bpaf(long)]
    compact: bool,
    #[bpaf(external(command), optional)]
    command: Option<Command>,
}

fn print(value: &Value, pretty: bool) {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match out {
        Ok(out) => println!("{out}"),
        Err(e) => log::error!("failed to encode output: {e}"),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match cli().run_inner(Args::current_args()) {
        Ok(cli) => cli,
        // argument errors get the same envelope as everything else
        Err(failure @ ParseFailure::Stderr(_)) => {
            print(&dispatch::error(failure.unwrap_stderr()), false);
            return ExitCode::FAILURE;
        },
        Err(failure) => {
            failure.print_message(100);
            return ExitCode::from(failure.exit_code() as u8);
        },
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print(&dispatch::error(e), !cli.compact);
            return ExitCode::FAILURE;
        },
    };
    let pretty = config.output.pretty && !cli.compact;

    let Some(command) = cli.command else {
        print(&dispatch::no_command(), pretty);
        return ExitCode::FAILURE;
    };

    let device = cli.bus.unwrap_or_else(|| config.bus.device.clone());
    let (bus, bus_error) = match I2cdev::new(&device) {
        Ok(bus) => (Some(bus), None),
        Err(e) => (None, Some(format!("{}: {e}", device.display()))),
    };
    let drivers = DriverTable::new(&config.drivers, bus_error.as_deref());
    drivers.log_unavailable();

    // held until exit
    let _lock = match (&bus, config.bus.lock) {
        (Some(_), true) => match BusLock::acquire(&device) {
            Ok(lock) => {
                log::debug!("holding bus lock {}", lock.path_held().display());
                Some(lock)
            },
            Err(e) => {
                log::warn!("running without bus lock for {}: {e}", device.display());
                None
            },
        },
        _ => None,
    };

    let hw = Hardware::new(bus, drivers);
    let result = dispatch::run(command, &hw, &config).unwrap_or_else(dispatch::error);
    print(&result, pretty);
    ExitCode::SUCCESS
}
