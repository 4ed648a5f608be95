//! Feature resolution and application
//!
//! This module provides:
//! - Feature definitions and their two file-set shapes
//! - Logical (file set) and physical (template path) resolution
//! - Framework-aware file placement
//! - The five file actions and the add-feature flow

pub mod actions;
pub mod apply;
pub mod model;
pub mod placement;
pub mod resolver;
pub mod transform;

pub use actions::{apply_action, ActionOutcome};
pub use apply::{
    add_feature, apply_plan, list_features, plan_feature, FeaturePlan, FeatureReport,
    FeatureRequest, FeatureSummary, FileReport, PlannedFile,
};
pub use model::{
    FeatureDefinition, FileAction, FileBucket, FileEntry, FileSetSpec, FrameworkFiles, Structure,
};
pub use placement::place_file;
pub use resolver::{locate_template, resolve_files, template_candidates, Resolution};
pub use transform::rewrite_import_aliases;
