use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use shakmaty::{Color, Position};

use chess_arm::game::{GameDriver, GameError, GreedySource};
use chess_arm::link::{LinkConfig, LinkSession};

/// A chess-playing robotic arm.
#[derive(Debug, Parser)]
#[command(name = "chess-arm", version, about)]
struct Args {
    /// Serial port the arm's microcontroller is connected to.
    #[arg(short = 'c', long)]
    port: String,

    /// Baud rate for the serial link.
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Read timeout in seconds; acknowledgment and completion waits must
    /// cover the arm's physical motion.
    #[arg(short, long, default_value_t = 120)]
    timeout: u64,

    /// Side the arm plays.
    #[arg(short, long, value_enum, default_value_t = Side::Black)]
    side: Side,

    /// Print debugging output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if let Err(err) = run(args) {
        log::error!("fatal: {err}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            log::error!("caused by: {cause}");
            source = cause.source();
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<(), GameError> {
    let config = LinkConfig {
        port: args.port,
        baud_rate: args.baud,
        read_timeout: Duration::from_secs(args.timeout),
    };
    let mut session = LinkSession::connect(&config)?;
    let mut driver = GameDriver::new(args.side.into(), GreedySource);

    log::info!("starting game, arm plays {:?}", Color::from(args.side));
    while !driver.is_over() {
        if driver.is_arm_turn() {
            driver.play_arm_turn(&mut session)?;
        } else {
            log::info!("waiting for opponent move");
            driver.play_opponent_turn(&mut session)?;
        }
    }

    let position = driver.position();
    if position.is_checkmate() {
        log::info!("checkmate, {:?} wins", !position.turn());
    } else {
        log::info!("game drawn");
    }
    session.close();
    Ok(())
}
