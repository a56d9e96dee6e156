pub mod cascade;
pub mod cli;
pub mod config;
pub mod content;
pub mod errors;
pub mod issues;
pub mod render;
pub mod reporting;
pub mod templates;
