//! # vhoster-sync
//!
//! Writes and removes the on-disk artifacts of a site: hosts-file entries,
//! Apache configuration and TLS certificates.
//!
//! [`Site`] is the entry point. Load one from a [`vhoster_core::SiteStore`],
//! change it through its setters, then [`Site::save`] it into a [`Workspace`]:
//!
//! ```no_run
//! use vhoster_core::SiteStore;
//! use vhoster_sync::{Site, Workspace};
//!
//! let mut ws = Workspace::open(SiteStore::open()?)?;
//! let mut site = Site::find(ws.store(), None, Some(std::path::Path::new("/srv/app")), None);
//! site.set_domain(ws.store(), "app")?;
//! site.set_path(ws.store(), "/srv/app")?;
//! site.save(&mut ws, false)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod apache;
pub mod certificate;
pub mod error;
pub mod hosts;
pub mod patch;
pub mod site;
pub mod tunnel;

pub use apache::{Apache, ApacheConf, ServerControl};
pub use certificate::{Certificates, SelfSigned};
pub use error::{Conflict, SiteError, SyncError};
pub use site::{PendingChange, Site, SiteDraft, SiteState, Workspace};
pub use tunnel::Tunnel;
