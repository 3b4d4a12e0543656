//! Template rendering capability.
//!
//! The engine only needs `render(name, context) -> body`; any template
//! engine can sit behind [`TemplateRenderer`]. [`DirectoryTemplates`] is the
//! built-in adapter: a handlebars registry loaded from a directory.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde_json::Value;

/// Errors from template rendering.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("no template renderer configured")]
    NoRenderer,

    #[error("failed to load template '{name}': {reason}")]
    Load { name: String, reason: String },

    #[error("failed to render template '{name}': {reason}")]
    Render { name: String, reason: String },
}

/// Renders a named template with a JSON context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Every file under a directory, registered with handlebars by its path
/// relative to the root (`/` separated, e.g. `"users/show.html"`).
///
/// Only registered names render, so a name cannot escape the root.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
    registry: Handlebars<'static>,
}

impl DirectoryTemplates {
    /// Load and compile every template under `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let root = root.as_ref().to_path_buf();
        let mut registry = Handlebars::new();
        register_dir(&mut registry, &root, &root)?;
        tracing::debug!(
            root = %root.display(),
            templates = registry.get_templates().len(),
            "Templates loaded"
        );
        Ok(Self { root, registry })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn register_dir(
    registry: &mut Handlebars<'static>,
    root: &Path,
    dir: &Path,
) -> Result<(), TemplateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| load_error(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| load_error(dir, e))?.path();
        if path.is_dir() {
            register_dir(registry, root, &path)?;
            continue;
        }
        let name = path
            .strip_prefix(root)
            .map_err(|e| load_error(&path, e))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let source = std::fs::read_to_string(&path).map_err(|e| load_error(&path, e))?;
        registry
            .register_template_string(&name, source)
            .map_err(|e| load_error(&path, e))?;
    }
    Ok(())
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> TemplateError {
    TemplateError::Load {
        name: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl TemplateRenderer for DirectoryTemplates {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        if !self.registry.has_template(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.registry
            .render(name, context)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}
