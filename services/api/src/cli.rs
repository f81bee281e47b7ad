use crate::demo::{run_demo, DemoArgs};
use crate::evaluate::{
    run_calibration_summary, run_rules_evaluate, CalibrationSummaryArgs, RulesEvaluateArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use grc_automation::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GRC Automation",
    about = "Run the GRC automation service or inspect rules and calibration runs offline",
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
    /// Inspect document workflow rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Inspect calibration runs exported as JSON
    Calibration {
        #[command(subcommand)]
        command: CalibrationCommand,
    },
    /// Run an end-to-end demo over seeded rules and calibration samples
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Order rules and evaluate them against a document
    Evaluate(RulesEvaluateArgs),
}

#[derive(Subcommand, Debug)]
enum CalibrationCommand {
    /// Aggregate statistics, trend, and outlier cells for a set of runs
    Summary(CalibrationSummaryArgs),
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
        Command::Rules {
            command: RulesCommand::Evaluate(args),
        } => run_rules_evaluate(args),
        Command::Calibration {
            command: CalibrationCommand::Summary(args),
        } => run_calibration_summary(args),
        Command::Demo(args) => run_demo(args),
    }
}
