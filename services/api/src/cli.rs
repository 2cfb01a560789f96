use crate::demo::{run_aggregate, run_demo, AggregateArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sst_exposure::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "SST Exposure Aggregator",
    about = "Aggregate occupational exams, risks and noxious agents across job functions",
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
    /// Aggregate sectors from a local JSON fixture and print the result
    Aggregate(AggregateArgs),
    /// Run the aggregation and shared-session flow against built-in sample data
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the compliance API base URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Aggregate(args) => run_aggregate(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
