//! Template chains and per-template behaviour.
//!
//! A template is a directory under the templates dir holding `report/`
//! (rendered), `static_content/` (YAML context) and `static_images/`. It may
//! inherit from other templates through a `parents` file.

pub mod chain;
pub mod dynamic_text;
pub mod variant;

pub use chain::{read_parents, TemplateChain, PARENTS_FILE, REPORT_TEMPLATE_DIR, STATIC_IMAGES_DIR};
pub use dynamic_text::findings_summary;
pub use variant::{DefaultVariant, TemplateVariant, VariantRegistry};
