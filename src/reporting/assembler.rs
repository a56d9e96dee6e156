use std::path::Path;
use serde_yaml::Value;
use crate::config::{ReporterConfig, CONFIG_FILE};
use crate::content::{self, root_mapping_mut};
use crate::errors::ReportError;
use crate::issues::{self, IssueBuckets};
use crate::templates::TemplateChain;
use super::metadata::report_metadata;
use tracing::info;

/// Assemble the render context for a report.
///
/// Template static content is merged across the chain, local YAML fragments
/// are layered over it, and the issue and run metadata keys are set last so
/// they always reflect the current run.
pub fn build_context(
    root: &Path,
    config: &ReporterConfig,
    chain: &TemplateChain,
    buckets: &IssueBuckets,
) -> Result<Value, ReportError> {
    let static_content = content::load_static_content(&chain.dirs(), &config.language)?;

    let mut excluded = config.excluded_prefixes();
    excluded.push(config.issue_dir.clone());
    let local = content::load_local_fragments(&config.content_layers(root), &excluded, &[CONFIG_FILE])?;

    let mut context = content::compose(local, static_content);
    let map = root_mapping_mut(&mut context)?;

    map.insert("issues".into(), issues::buckets_to_context(buckets)?);
    map.insert("num_issues".into(), Value::from(issues::count_issues(buckets) as u64));
    map.insert("num_severity".into(), Value::Mapping(issues::severity_counts(buckets)));
    map.insert(
        "locations".into(),
        Value::Sequence(issues::locations(buckets).into_iter().map(Value::from).collect()),
    );
    for (key, value) in report_metadata(config, chain)? {
        map.insert(key, value);
    }

    info!(keys = map.len(), issues = issues::count_issues(buckets), "Assembled report context");
    Ok(context)
}
