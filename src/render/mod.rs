pub mod engine;
pub mod writer;

pub use engine::Template;
pub use writer::{copy_verbatim, has_extension, render, RenderOptions, RenderSummary};
