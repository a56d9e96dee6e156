//! Directory cascade: per relative path, the highest-priority layer wins.

pub mod resolver;

pub use resolver::{resolve, Cascade, ResolvedFile};
