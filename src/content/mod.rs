pub mod loader;
pub mod merge;

pub use loader::{compose, load_fragment, load_local_fragments, load_static_content, load_template_content};
pub use merge::{expect_mapping, merge, merge_all, root_mapping_mut};
