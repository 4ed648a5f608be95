//! Installation root discovery and catalog loading

pub mod catalog;
pub mod root;

pub use catalog::{
    Catalog, FeatureCatalog, FeatureCatalogEntry, FrameworkTemplates, TemplateCatalog,
};
pub use root::{InstallRoot, RootSearch};
