use console::style;
use crate::cli::commands::{GlobalArgs, RunArgs};
use crate::errors::ReportError;
use crate::issues;

pub fn handle_locations(global: &GlobalArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    let buckets = reporter.issues(false)?;
    for location in issues::locations(&buckets) {
        println!("{}", location);
    }
    Ok(())
}

pub fn handle_chain(global: &GlobalArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    for (i, name) in reporter.chain().names().iter().enumerate() {
        let marker = if i == 0 { style("▶").green().to_string() } else { " ".to_string() };
        println!("{} {}", marker, name);
    }
    println!("variant: {}", style(reporter.variant().id()).cyan());
    Ok(())
}

pub fn handle_clean(global: &GlobalArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    if reporter.clean()? {
        println!("{} Removed {}", style("✓").green(), reporter.output_dir().display());
    } else {
        println!("Nothing to clean");
    }
    Ok(())
}

pub fn handle_finalize(global: &GlobalArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    let path = reporter.finalize()?;
    println!("{} Finalized {}", style("✓").green(), style(path.display()).white().bold());
    Ok(())
}

pub fn handle_find_root(global: &GlobalArgs) -> Result<(), ReportError> {
    let root = super::resolve_root(global)?;
    println!("{}", root.display());
    Ok(())
}

pub fn handle_run(global: &GlobalArgs, args: RunArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    let output = reporter.run_command(&args.command)?;
    println!("{}", output);
    Ok(())
}
