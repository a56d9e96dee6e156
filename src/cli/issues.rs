use console::style;
use crate::cli::commands::{GlobalArgs, IssuesArgs};
use crate::errors::ReportError;
use crate::issues::{self, IssueBuckets, Severity};

pub fn handle_issues(global: &GlobalArgs, args: IssuesArgs) -> Result<(), ReportError> {
    let reporter = super::open_reporter(global)?;
    let buckets = reporter.issues(false)?;

    if args.json {
        let value = issues::buckets_to_context(&buckets)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", format_buckets(&buckets));
    }
    Ok(())
}

fn styled_severity(severity: Severity) -> String {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => style(label).red().bold().to_string(),
        Severity::High => style(label).red().to_string(),
        Severity::Medium => style(label).yellow().to_string(),
        Severity::Low => style(label).cyan().to_string(),
        Severity::None => style(label).dim().to_string(),
    }
}

/// Human-readable listing, one section per non-empty bucket.
pub fn format_buckets(buckets: &IssueBuckets) -> String {
    let mut out = String::new();
    for (severity, list) in buckets {
        if list.is_empty() {
            continue;
        }
        out.push_str(&format!("{} ({})\n", styled_severity(*severity), list.len()));
        for issue in list {
            let number = issue.number.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
            out.push_str(&format!("  #{:<4}{:>5.1}  {}\n", number, issue.cvss_score, issue.title));
        }
    }
    if out.is_empty() {
        out.push_str("No issues\n");
    }
    out
}
