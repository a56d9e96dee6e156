use clap::Parser;
use reportforge::cli::{self, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.global.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.global.no_color)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.no_color {
        console::set_colors_enabled(false);
    }

    let global = &cli.global;
    let result = match cli.command {
        Commands::Generate(args) => cli::generate::handle_generate(global, args),
        Commands::Issues(args) => cli::issues::handle_issues(global, args),
        Commands::Locations => cli::maintenance::handle_locations(global),
        Commands::Chain => cli::maintenance::handle_chain(global),
        Commands::Clean => cli::maintenance::handle_clean(global),
        Commands::Finalize => cli::maintenance::handle_finalize(global),
        Commands::FindRoot => cli::maintenance::handle_find_root(global),
        Commands::Run(args) => cli::maintenance::handle_run(global, args),
    };

    if let Err(e) = result {
        let class = e.classify();
        tracing::debug!(error_type = class.error_type, fatal = class.fatal, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
