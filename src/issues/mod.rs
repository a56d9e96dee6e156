pub mod loader;
pub mod model;
pub mod numbering;

pub use loader::{find_issue_files, load_evidence, load_issue, load_issues, persist_numbers, IssueFiles};
pub use model::{Evidence, Issue, Severity};
pub use numbering::{aggregate, buckets_to_context, count_issues, locations, severity_counts, verify_unique, IssueBuckets};
