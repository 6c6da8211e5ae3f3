use crate::demo::{
    run_batch, run_demo, run_evaluate, run_validate, BatchArgs, DemoArgs, EvaluateArgs,
    ValidateArgs,
};
use crate::server;
use assessment_scoring::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Assessment Scoring",
    about = "Validate rubric templates and score assessment responses",
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
    /// Check template catalogs for authoring defects
    Validate(ValidateArgs),
    /// Score response sets from a JSON file
    Evaluate(EvaluateArgs),
    /// Re-score a batch CSV export against one template
    Batch(BatchArgs),
    /// Score the built-in maritime, interview and culture-survey samples
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
    /// Template catalog to publish at startup (overrides SCORING_TEMPLATES)
    #[arg(long)]
    pub(crate) templates: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Batch(args) => run_batch(args),
        Command::Demo(args) => run_demo(args),
    }
}
