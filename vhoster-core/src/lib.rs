//! vhoster core library: domain types, settings document, site registry, errors.
//!
//! - [`types`]: site records, queries, typed settings
//! - [`error`]: [`RegistryError`]
//! - [`registry`]: document load / save / setup and the [`SiteStore`]

pub mod error;
pub mod registry;
pub mod types;

pub use error::{ConfigProblem, RegistryError};
pub use registry::SiteStore;
pub use types::{
    ConfLayout, Document, Settings, SiteId, SitePatch, SiteQuery, SiteRecord, DEFAULT_TLD,
};
