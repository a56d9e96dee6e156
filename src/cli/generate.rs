use console::style;
use crate::cli::commands::{GenerateArgs, GlobalArgs};
use crate::errors::ReportError;
use crate::reporting::GenerateOptions;
use tracing::info;

pub fn handle_generate(global: &GlobalArgs, args: GenerateArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    info!(chain = %reporter.chain().names().join(" -> "), "Generating report");

    let outcome = reporter.generate(GenerateOptions {
        preprocess_only: args.preprocess_only,
        template_sources: args.template_sources,
    })?;

    println!(
        "{} Rendered {} file(s) with {} issue(s) into {}",
        style("✓").green(),
        outcome.rendered,
        outcome.issues,
        style(outcome.output_dir.display()).cyan()
    );
    if let Some(report) = outcome.report {
        println!("{} Report: {}", style("✓").green(), style(report.display()).white().bold());
    }
    Ok(())
}
