//! # vhoster-renderer
//!
//! Tera-based template engine that renders the Apache virtual host stanza for a
//! registered site.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vhoster_core::SiteRecord;
//! use vhoster_renderer::{Renderer, SiteContext};
//!
//! fn render(record: &SiteRecord) {
//!     if let Ok(renderer) = Renderer::new() {
//!         let ctx = SiteContext::from_record(
//!             record,
//!             "test",
//!             Path::new("/certs/app.test.crt"),
//!             Path::new("/certs/app.test.key"),
//!         );
//!         if let Ok(stanza) = renderer.render_site(&ctx) {
//!             println!("{stanza}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::SiteContext;
pub use engine::{Renderer, TemplateEngine, SITE_TEMPLATE};
pub use error::RenderError;
