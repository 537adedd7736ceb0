//! Input resolution (C8, C9): turning a [`crate::model::GenerationRequest`] into concrete,
//! ordered listings of source files, descriptor contents, and resolved plugins.

pub mod plugins;
pub mod sources;
