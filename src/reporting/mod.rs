pub mod assembler;
pub mod generator;
pub mod metadata;
pub mod workspace;

pub use assembler::build_context;
pub use generator::{GenerateOptions, GenerateOutcome, Reporter, TEMPLATE_SOURCES_DIR};
pub use metadata::{check_reporter_version, version_string};
