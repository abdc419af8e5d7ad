//! Tera rendering engine: [`TemplateEngine`] and [`Renderer`].
//!
//! | Template          | Output                                        |
//! |-------------------|-----------------------------------------------|
//! | `site.conf.tera`  | Apache `<VirtualHost>` stanza(s) for one site  |

use std::path::Path;

use tera::Tera;

use crate::context::SiteContext;
use crate::error::RenderError;

/// Name of the per-site stanza template.
pub const SITE_TEMPLATE: &str = "site.conf.tera";

/// Built-in stanza template.
const SITE_DEFAULT: &str = include_str!("templates/site.conf.tera");

/// Override text for `SITE_TEMPLATE` in `dir`, if the file is there.
fn site_override(dir: &Path) -> Result<Option<String>, RenderError> {
    let path = dir.join(SITE_TEMPLATE);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(RenderError::Io { path, source }),
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine holding the stanza template.
///
/// A `site.conf.tera` file in `user_template_dir` replaces the built-in one.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let text = match user_template_dir {
            Some(dir) => site_override(dir)?,
            None => None,
        };
        let mut tera = Tera::default();
        tera.add_raw_template(SITE_TEMPLATE, text.as_deref().unwrap_or(SITE_DEFAULT))?;
        Ok(TemplateEngine { tera })
    }

    /// Render template `name` with the supplied context. Line endings are LF.
    pub fn render(&self, name: &str, ctx: &SiteContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(name, &tera_ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders site stanzas. Create once and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Construct a new [`Renderer`] with embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Construct a [`Renderer`] that prefers `dir/site.conf.tera` over the
    /// built-in stanza (missing directory or file = no override).
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(Some(dir))? })
    }

    /// Render the Apache stanza for one site.
    pub fn render_site(&self, ctx: &SiteContext) -> Result<String, RenderError> {
        self.engine.render(SITE_TEMPLATE, ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
