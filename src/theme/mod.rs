//! Theme engine
//!
//! Template rendering using Tera. The default templates under `templates/`
//! are embedded in the binary; `.html` files found in the configured theme
//! directory replace embedded templates of the same name or add new ones.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Default templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "**/*.html"]
struct DefaultTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Create a theme engine from the embedded templates, overlaid with the
    /// templates found in `overlay_path`.
    ///
    /// A missing overlay directory is not an error; the embedded templates
    /// are used alone.
    pub fn new(overlay_path: &Path) -> Result<Self> {
        Ok(Self {
            tera: load_templates(Some(overlay_path))?,
        })
    }

    /// Create a theme engine from the embedded templates only
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            tera: load_templates(None)?,
        })
    }

    /// Render a template with context
    ///
    /// # Arguments
    /// * `template` - Template name (e.g., "index.html", "post-details.html")
    /// * `context` - Tera context with template variables
    ///
    /// # Returns
    /// Rendered HTML string or an error
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()).into());
        }

        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!(
                "Failed to render '{}': {}",
                template,
                format_tera_error(&e)
            ))
            .into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();

        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);

        self.render(template, &full_context)
    }

    /// Whether a template with this name is registered
    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Generate a simple standalone HTML error page
    ///
    /// Used for error responses, which are produced without access to the
    /// engine. Both arguments are HTML-escaped.
    pub fn simple_error_page(title: &str, message: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 600px;
            margin: 50px auto;
            padding: 20px;
            background: #f5f5f5;
        }}
        .error-box {{
            background: white;
            border-left: 4px solid #e74c3c;
            padding: 20px;
            border-radius: 4px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        h1 {{ color: #e74c3c; margin-top: 0; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/">Back to the front page</a></p>
    </div>
</body>
</html>"#,
            title = tera::escape_html(title),
            message = tera::escape_html(message),
        )
    }
}

/// Build a Tera instance from embedded templates, replaced or extended by
/// the `.html` files under `overlay`
fn load_templates(overlay: Option<&Path>) -> Result<Tera> {
    let mut templates: Vec<(String, String)> = Vec::new();

    for name in DefaultTemplates::iter() {
        let file =
            DefaultTemplates::get(&name).ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
        let content = String::from_utf8(file.data.into_owned())
            .map_err(|e| ThemeError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?;
        templates.push((name.to_string(), content));
    }

    match overlay {
        Some(dir) if dir.is_dir() => {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::debug!("Template '{}' loaded from {:?}", name, dir);
                templates.retain(|(existing, _)| existing != &name);
                templates.push((name, content));
            }
        }
        Some(dir) => {
            tracing::debug!("Theme directory {:?} not found, using embedded templates", dir);
        }
        None => {}
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)
        .map_err(|e| ThemeError::TemplateError(format_tera_error(&e)))?;
    Ok(tera)
}

/// Collect `.html` templates below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path).map_err(ThemeError::from)? {
        let path = entry.map_err(ThemeError::from)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

            // Forward slashes on every platform
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

/// Flatten a Tera error and its causes into one message
fn format_tera_error(e: &tera::Error) -> String {
    let mut error_msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        error_msg.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    error_msg
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    /// Blog name
    pub site_name: String,
    /// Current request path
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }
}

#[cfg(test)]
mod tests;
