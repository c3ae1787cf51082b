use clap::{Args, Parser, Subcommand};
use xnscore::error::AppError;

use crate::demo::{run_decay_sweep, run_demo, run_tenure_accrual, DemoArgs, SweepArgs, TenureArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "XnScore",
    about = "Run and exercise the community trust scoring service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one of the scheduled maintenance sweeps against a rehearsal population
    Sweep {
        #[command(subcommand)]
        command: SweepCommand,
    },
    /// Run an end-to-end CLI demo covering the scoring lifecycle
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SweepCommand {
    /// Apply inactivity decay penalties for a calendar day
    Decay(SweepArgs),
    /// Grant monthly tenure bonuses for a calendar month
    Tenure(TenureArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sweep {
            command: SweepCommand::Decay(args),
        } => run_decay_sweep(args),
        Command::Sweep {
            command: SweepCommand::Tenure(args),
        } => run_tenure_accrual(args),
        Command::Demo(args) => run_demo(args),
    }
}
