use std::collections::{BTreeMap, BTreeSet, HashMap};
use serde_yaml::{Mapping, Value};
use crate::errors::ReportError;
use super::model::{Issue, Severity};
use tracing::debug;

/// Issues grouped per severity bucket. Iterates most severe first and always
/// holds all five buckets.
pub type IssueBuckets = BTreeMap<Severity, Vec<Issue>>;

/// Group issues by severity, order them and give every unnumbered issue a number.
///
/// Within a bucket issues are sorted by descending score; equal scores keep
/// their input order. Persisted numbers are kept. New numbers are handed out
/// in report order and always take the smallest positive integer not already
/// in use, so gaps left by removed issues are filled first.
pub fn aggregate(issues: Vec<Issue>) -> Result<IssueBuckets, ReportError> {
    let mut taken = BTreeSet::new();
    let mut owners: HashMap<u32, String> = HashMap::new();
    for issue in &issues {
        if let Some(number) = issue.number {
            if let Some(first) = owners.insert(number, issue.title.clone()) {
                return Err(ReportError::NumberingInvariant {
                    number,
                    first,
                    second: issue.title.clone(),
                });
            }
            taken.insert(number);
        }
    }

    let mut buckets: IssueBuckets = Severity::ALL.iter().map(|s| (*s, Vec::new())).collect();
    for issue in issues {
        buckets.entry(issue.severity()).or_default().push(issue);
    }

    let mut candidate = 1u32;
    for (severity, bucket) in buckets.iter_mut() {
        // Vec::sort_by is stable
        bucket.sort_by(|a, b| b.cvss_score.total_cmp(&a.cvss_score));
        for issue in bucket.iter_mut() {
            if issue.number.is_some() {
                continue;
            }
            while taken.contains(&candidate) {
                candidate += 1;
            }
            debug!(title = %issue.title, severity = %severity, number = candidate, "Assigned issue number");
            issue.number = Some(candidate);
            taken.insert(candidate);
        }
    }

    verify_unique(&buckets)?;
    Ok(buckets)
}

/// Fail if two issues share a number.
pub fn verify_unique(buckets: &IssueBuckets) -> Result<(), ReportError> {
    let mut seen: HashMap<u32, &str> = HashMap::new();
    for issue in buckets.values().flatten() {
        if let Some(number) = issue.number {
            if let Some(first) = seen.insert(number, &issue.title) {
                return Err(ReportError::NumberingInvariant {
                    number,
                    first: first.to_string(),
                    second: issue.title.clone(),
                });
            }
        }
    }
    Ok(())
}

pub fn count_issues(buckets: &IssueBuckets) -> usize {
    buckets.values().map(Vec::len).sum()
}

/// Number of issues per bucket, keyed by bucket name.
pub fn severity_counts(buckets: &IssueBuckets) -> Mapping {
    buckets
        .iter()
        .map(|(severity, list)| (Value::from(severity.as_str()), Value::from(list.len() as u64)))
        .collect()
}

/// Every evidence location used in the report, sorted and deduplicated.
pub fn locations(buckets: &IssueBuckets) -> Vec<String> {
    buckets
        .values()
        .flatten()
        .flat_map(|issue| issue.evidences.iter().map(|e| e.location.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Template context for the buckets: bucket name -> list of issue records.
pub fn buckets_to_context(buckets: &IssueBuckets) -> Result<Value, ReportError> {
    let mut map = Mapping::new();
    for (severity, list) in buckets {
        let issues = list
            .iter()
            .map(Issue::to_context)
            .collect::<Result<Vec<_>, _>>()?;
        map.insert(severity.as_str().into(), Value::Sequence(issues));
    }
    Ok(Value::Mapping(map))
}
