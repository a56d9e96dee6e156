use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use serde_yaml::Value;
use crate::config::{ReporterConfig, BASE_TEMPLATE};
use crate::errors::ReportError;
use crate::issues::Severity;
use crate::render::RenderSummary;
use super::chain::TemplateChain;
use super::dynamic_text;
use tracing::debug;

/// Template-specific behaviour, registered per template name.
///
/// A derived template inherits the variant of the nearest template in its
/// chain that has one; the base variant applies when none does.
pub trait TemplateVariant: Send + Sync {
    fn id(&self) -> &str;

    /// Render hook: adjust the context after content and issues are merged in.
    fn prepare_context(&self, _context: &mut Value, _config: &ReporterConfig) -> Result<(), ReportError> {
        Ok(())
    }

    /// Names of the extra commands this variant offers.
    fn commands(&self) -> &[&'static str] {
        &[]
    }

    /// Command hook: run a named variant command against the report context.
    fn run_command(&self, name: &str, _context: &Value) -> Result<String, ReportError> {
        Err(ReportError::Config(format!(
            "Template variant '{}' has no command '{}'",
            self.id(),
            name
        )))
    }

    /// Lifecycle hook, called once the output tree is rendered.
    fn after_render(&self, _output_dir: &Path, _summary: &RenderSummary) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Variant of the base template: adds the `findings_summary` text.
pub struct DefaultVariant;

impl DefaultVariant {
    fn severity_counts(context: &Value) -> Vec<(Severity, usize)> {
        Severity::ALL
            .iter()
            .map(|s| {
                let count = context
                    .get("num_severity")
                    .and_then(|m| m.get(s.as_str()))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                (*s, count as usize)
            })
            .collect()
    }

    fn language(context: &Value) -> &str {
        context.get("language").and_then(Value::as_str).unwrap_or("en")
    }
}

impl TemplateVariant for DefaultVariant {
    fn id(&self) -> &str {
        BASE_TEMPLATE
    }

    fn prepare_context(&self, context: &mut Value, config: &ReporterConfig) -> Result<(), ReportError> {
        let counts = Self::severity_counts(context);
        let Some(summary) = dynamic_text::findings_summary(&config.language, &counts) else {
            debug!(language = %config.language, "No findings summary generator for language");
            return Ok(());
        };
        if let Value::Mapping(map) = context {
            map.insert("findings_summary".into(), summary.into());
        }
        Ok(())
    }

    fn commands(&self) -> &[&'static str] {
        &["summary"]
    }

    fn run_command(&self, name: &str, context: &Value) -> Result<String, ReportError> {
        match name {
            "summary" => {
                let counts = Self::severity_counts(context);
                let language = Self::language(context);
                dynamic_text::findings_summary(language, &counts).ok_or_else(|| {
                    ReportError::Config(format!("No findings summary available for language '{}'", language))
                })
            }
            _ => Err(ReportError::Config(format!(
                "Template variant '{}' has no command '{}'",
                self.id(),
                name
            ))),
        }
    }
}

/// Variants keyed by template name.
pub struct VariantRegistry {
    variants: HashMap<String, Arc<dyn TemplateVariant>>,
    fallback: Arc<dyn TemplateVariant>,
}

impl VariantRegistry {
    /// Registry with the built-in variants.
    pub fn builtin() -> Self {
        let fallback: Arc<dyn TemplateVariant> = Arc::new(DefaultVariant);
        let mut variants = HashMap::new();
        variants.insert(BASE_TEMPLATE.to_string(), Arc::clone(&fallback));
        Self { variants, fallback }
    }

    /// Register a variant under its id, replacing any earlier one.
    pub fn register(&mut self, variant: Arc<dyn TemplateVariant>) {
        self.variants.insert(variant.id().to_string(), variant);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TemplateVariant>> {
        self.variants.get(name).cloned()
    }

    /// The variant of the most specific template in `chain` that has one.
    pub fn resolve(&self, chain: &TemplateChain) -> Arc<dyn TemplateVariant> {
        for name in chain.names() {
            if let Some(variant) = self.get(name) {
                debug!(template = %name, variant = variant.id(), "Resolved template variant");
                return variant;
            }
        }
        Arc::clone(&self.fallback)
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Retest;

    impl TemplateVariant for Retest {
        fn id(&self) -> &str {
            "retest"
        }

        fn prepare_context(&self, context: &mut Value, _config: &ReporterConfig) -> Result<(), ReportError> {
            if let Value::Mapping(map) = context {
                map.insert("retest".into(), true.into());
            }
            Ok(())
        }
    }

    fn chain(names: &[(&str, &[&str])], top: &str) -> (tempfile::TempDir, TemplateChain) {
        let root = tempfile::tempdir().unwrap();
        for (name, parents) in names {
            let dir = root.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("parents"), parents.join("\n")).unwrap();
        }
        let chain = TemplateChain::resolve(root.path(), top).unwrap();
        (root, chain)
    }

    fn counted_context(language: &str, critical: u64, low: u64) -> Value {
        serde_yaml::from_str(&format!(
            "language: {}\nnum_severity: {{critical: {}, high: 0, medium: 0, low: {}, none: 0}}\n",
            language, critical, low
        ))
        .unwrap()
    }

    #[test]
    fn test_unregistered_chain_falls_back_to_default() {
        let (_root, chain) = chain(&[("acme", &[])], "acme");
        let registry = VariantRegistry::builtin();
        assert_eq!(registry.resolve(&chain).id(), "default");
    }

    #[test]
    fn test_derived_template_inherits_parent_variant() {
        let (_root, chain) = chain(&[("acme-retest", &["retest"]), ("retest", &[])], "acme-retest");
        let mut registry = VariantRegistry::builtin();
        registry.register(Arc::new(Retest));
        let variant = registry.resolve(&chain);
        assert_eq!(variant.id(), "retest");

        let mut context = Value::Mapping(Default::default());
        variant.prepare_context(&mut context, &ReporterConfig::default()).unwrap();
        assert_eq!(context["retest"], Value::from(true));
    }

    #[test]
    fn test_default_variant_adds_findings_summary() {
        let mut context = counted_context("en", 1, 2);
        DefaultVariant.prepare_context(&mut context, &ReporterConfig::default()).unwrap();
        assert_eq!(
            context["findings_summary"],
            Value::from("During the assessment 3 issues were identified: 1 critical and 2 low.")
        );
    }

    #[test]
    fn test_default_variant_skips_unknown_language() {
        let mut context = counted_context("de", 1, 0);
        let config = ReporterConfig {
            language: "de".to_string(),
            ..Default::default()
        };
        DefaultVariant.prepare_context(&mut context, &config).unwrap();
        assert!(context.get("findings_summary").is_none());
    }

    #[test]
    fn test_summary_command() {
        let context = counted_context("nl", 0, 1);
        let out = DefaultVariant.run_command("summary", &context).unwrap();
        assert_eq!(out, "Tijdens het onderzoek is 1 bevinding gedaan met risico laag.");
        assert!(DefaultVariant.commands().contains(&"summary"));
    }

    #[test]
    fn test_unknown_command() {
        let err = Retest.run_command("summary", &Value::Null).unwrap_err();
        assert!(err.to_string().contains("no command 'summary'"));
    }
}
