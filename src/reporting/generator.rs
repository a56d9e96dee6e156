use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde_yaml::Value;
use crate::config::{self, ReporterConfig};
use crate::errors::ReportError;
use crate::issues::{self, IssueBuckets};
use crate::render::{self, RenderOptions};
use crate::templates::{TemplateChain, TemplateVariant, VariantRegistry, STATIC_IMAGES_DIR};
use super::assembler::build_context;
use super::metadata::check_reporter_version;
use super::workspace;
use tracing::{info, warn};

/// Directory inside the output tree receiving raw template sources.
pub const TEMPLATE_SOURCES_DIR: &str = "template_sources";

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Stop after rendering; do not compile.
    pub preprocess_only: bool,
    /// Also copy every rendered template source into the output tree.
    pub template_sources: bool,
}

#[derive(Debug)]
pub struct GenerateOutcome {
    pub output_dir: PathBuf,
    pub rendered: usize,
    pub issues: usize,
    /// Compiled report copied into the root, when compilation ran.
    pub report: Option<PathBuf>,
}

/// A report root with its configuration, template chain and variant.
pub struct Reporter {
    root: PathBuf,
    config: ReporterConfig,
    chain: TemplateChain,
    variant: Arc<dyn TemplateVariant>,
}

impl Reporter {
    /// Load the configuration of `root` and resolve its template chain.
    pub fn open(root: &Path, registry: &VariantRegistry) -> Result<Self, ReportError> {
        let config = config::parse_config(root)?;
        Self::with_config(root, config, registry)
    }

    pub fn with_config(
        root: &Path,
        config: ReporterConfig,
        registry: &VariantRegistry,
    ) -> Result<Self, ReportError> {
        let chain = TemplateChain::resolve(&config.templates_path(root), &config.template)?;
        let variant = registry.resolve(&chain);
        info!(
            root = %root.display(),
            template = %config.template,
            variant = variant.id(),
            language = %config.language,
            "Opened report"
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
            chain,
            variant,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn chain(&self) -> &TemplateChain {
        &self.chain
    }

    pub fn variant(&self) -> &dyn TemplateVariant {
        self.variant.as_ref()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output_path(&self.root)
    }

    /// Load and number the issues. Numbers are written back when `persist` is set
    /// and the configuration allows it.
    pub fn issues(&self, persist: bool) -> Result<IssueBuckets, ReportError> {
        let loaded = issues::load_issues(
            &self.config.issue_path(&self.root),
            self.config.default_location.as_deref(),
        )?;
        let buckets = issues::aggregate(loaded)?;
        if persist && self.config.persist_numbers {
            let written = issues::persist_numbers(buckets.values().flatten())?;
            if written > 0 {
                info!(count = written, "Stored new issue numbers");
            }
        }
        Ok(buckets)
    }

    /// Full render context, including the variant's additions.
    pub fn context(&self, buckets: &IssueBuckets) -> Result<Value, ReportError> {
        let mut context = build_context(&self.root, &self.config, &self.chain, buckets)?;
        self.variant.prepare_context(&mut context, &self.config)?;
        Ok(context)
    }

    /// Render the report into the output directory and, unless told otherwise, compile it.
    pub fn generate(&self, options: GenerateOptions) -> Result<GenerateOutcome, ReportError> {
        check_reporter_version(&self.config, &self.root)?;
        let buckets = self.issues(true)?;
        let context = self.context(&buckets)?;
        let output_dir = self.output_dir();

        let protected = workspace::link_report_entries(
            &self.root,
            &output_dir,
            &[self.config.report_output_file.as_str()],
        )?;

        let excluded = self.config.excluded_prefixes();
        let render_options = RenderOptions {
            excluded: excluded.clone(),
            sources_dir: (options.template_sources || self.config.template_sources)
                .then(|| output_dir.join(TEMPLATE_SOURCES_DIR)),
        };
        let report_dirs = self.chain.report_dirs();
        let summary = render::render(
            &context,
            &report_dirs,
            &output_dir,
            &protected,
            &self.config.extensions,
            &render_options,
        )?;
        render::copy_verbatim(&report_dirs, &output_dir, &protected, &self.config.extensions, &excluded)?;
        render::copy_verbatim(
            &self.chain.image_dirs(),
            &output_dir.join(STATIC_IMAGES_DIR),
            &protected,
            &[],
            &excluded,
        )?;

        if !output_dir.join(&self.config.report_file).exists() {
            warn!(
                file = %self.config.report_file,
                "Main report file missing from output, neither the templates nor the report root provide it"
            );
        }

        self.variant.after_render(&output_dir, &summary)?;

        let report = if options.preprocess_only {
            info!(dir = %output_dir.display(), "Preprocessing done, skipping compilation");
            None
        } else {
            workspace::compile(&output_dir)?;
            Some(workspace::copy_output(&output_dir, &self.root, &self.config.report_output_file)?)
        };

        Ok(GenerateOutcome {
            output_dir,
            rendered: summary.rendered.len(),
            issues: issues::count_issues(&buckets),
            report,
        })
    }

    /// Run a variant command against the current report context.
    pub fn run_command(&self, name: &str) -> Result<String, ReportError> {
        let buckets = self.issues(false)?;
        let context = self.context(&buckets)?;
        self.variant.run_command(name, &context)
    }

    pub fn clean(&self) -> Result<bool, ReportError> {
        workspace::clean(&self.output_dir())
    }

    pub fn finalize(&self) -> Result<PathBuf, ReportError> {
        workspace::finalize(&self.root, &self.config.report_output_file)
    }
}
