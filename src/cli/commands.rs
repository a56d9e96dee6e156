use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reportforge", version, about = "Layered pentest report generator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Report root (default: searched upwards from the current directory)
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Override the report language
    #[arg(long, global = true)]
    pub language: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the report and compile it
    Generate(GenerateArgs),
    /// List the numbered issues per severity
    Issues(IssuesArgs),
    /// List every evidence location used in the report
    Locations,
    /// Show the resolved template chain
    Chain,
    /// Remove the output directory
    Clean,
    /// Copy the compiled report to a new final_report file
    Finalize,
    /// Print the report root
    FindRoot,
    /// Run a command offered by the report's template
    Run(RunArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct GenerateArgs {
    /// Render only, skip compilation
    #[arg(long)]
    pub preprocess_only: bool,

    /// Copy raw template sources into the output directory
    #[arg(long)]
    pub template_sources: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct IssuesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Command name
    pub command: String,
}
