//! Command line access to an Octowire.
//!
//! ```bash
//! octowire -p /dev/ttyACM0 version
//! octowire -p /dev/ttyACM0 gpio 3 direction output
//! octowire -p /dev/ttyACM0 gpio 3 set high
//! octowire -p /dev/ttyACM0 gpio 4 read
//! ```

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use octowire::{
    DEFAULT_BAUD, Direction, Gpio, Level, Octowire, PortConfig, Pull, SerialPortTransport,
    StdDelay,
};

#[derive(Parser)]
#[command(name = "octowire")]
#[command(about = "Talk to an Octowire hardware probe")]
#[command(version)]
struct Cli {
    /// Serial port the Octowire enumerated as
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Read timeout in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the firmware version
    Version,
    /// Check that a genuine Octowire answers on the port
    Status,
    /// Switch the device to binary mode
    Binmode,
    /// Drive a GPIO pin
    Gpio {
        /// Pin number, 0 to 15
        pin: u8,
        #[command(subcommand)]
        action: GpioAction,
    },
}

#[derive(Subcommand)]
enum GpioAction {
    Direction { direction: DirectionArg },
    Pull { pull: PullArg },
    Set { level: LevelArg },
    Read,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Output,
    Input,
}

#[derive(Clone, Copy, ValueEnum)]
enum PullArg {
    Up,
    Down,
    Disable,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Low,
    High,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PortConfig::new(&cli.port)
        .with_baud_rate(cli.baud)
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    let transport = SerialPortTransport::open(&config)
        .with_context(|| format!("Failed to open serial port: {}", cli.port))?;
    let mut octowire = Octowire::new(transport, StdDelay);

    match cli.command {
        Commands::Version => println!("{}", octowire.version()?),
        Commands::Status => {
            if !octowire.is_connected() {
                bail!("no Octowire answering on {}", cli.port);
            }
            println!("connected");
        }
        Commands::Binmode => {
            octowire.ensure_binary_mode()?;
            info!("Octowire is in binary mode");
        }
        Commands::Gpio { pin, action } => {
            let mut gpio = Gpio::new(octowire, pin)?;
            match action {
                GpioAction::Direction { direction } => gpio.set_direction(match direction {
                    DirectionArg::Output => Direction::Output,
                    DirectionArg::Input => Direction::Input,
                })?,
                GpioAction::Pull { pull } => gpio.set_pull(match pull {
                    PullArg::Up => Pull::Up,
                    PullArg::Down => Pull::Down,
                    PullArg::Disable => Pull::Disabled,
                })?,
                GpioAction::Set { level } => gpio.set_status(match level {
                    LevelArg::Low => Level::Low,
                    LevelArg::High => Level::High,
                })?,
                GpioAction::Read => println!("{}", gpio.read()?),
            }
        }
    }
    Ok(())
}
