//! Statement template storage.
//!
//! Templates are Handlebars documents. Four are compiled into the binary;
//! a templates directory, when configured, overrides them by file name and
//! may add new ones.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::error::ReportError;

/// Built-in templates, keyed by file name.
const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    (
        "balance_sheet.md",
        include_str!("../../templates/balance_sheet.md"),
    ),
    (
        "profit_loss.md",
        include_str!("../../templates/profit_loss.md"),
    ),
    (
        "trial_balance.md",
        include_str!("../../templates/trial_balance.md"),
    ),
    ("cash_flow.md", include_str!("../../templates/cash_flow.md")),
];

/// Helper names and block keywords that are not context variables.
const RESERVED: &[&str] = &[
    "money", "percent", "default", "if", "unless", "each", "with", "else", "this", "lookup",
];

/// Where a template was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum TemplateSource {
    /// Compiled into the binary.
    Builtin,
    /// Read from the templates directory.
    File(PathBuf),
}

/// A template's source text and origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTemplate {
    /// File name.
    pub name: String,
    /// Handlebars source.
    pub source: String,
    /// Origin.
    pub origin: TemplateSource,
}

/// Summary of a template's substitution points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    /// File name.
    pub name: String,
    /// Origin.
    pub origin: TemplateSource,
    /// Context variables referenced, sorted.
    pub variables: Vec<String>,
    /// Source size in bytes.
    pub size: usize,
    /// Number of lines.
    pub lines: usize,
}

/// Looks up templates in an optional directory, then among the built-ins.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
}

impl TemplateStore {
    /// A store that only serves the built-in templates.
    #[must_use]
    pub const fn builtin() -> Self {
        Self { dir: None }
    }

    /// A store that prefers templates found in `dir`.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Returns the override directory, if any.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Loads a template by file name (`.md` is appended when missing).
    pub fn load(&self, name: &str) -> Result<LoadedTemplate, ReportError> {
        let name = normalize_name(name)?;

        if let Some(dir) = &self.dir {
            let path = dir.join(&name);
            if path.is_file() {
                debug!(template = %name, path = %path.display(), "Loading template from directory");
                return Ok(LoadedTemplate {
                    source: fs::read_to_string(&path)?,
                    name,
                    origin: TemplateSource::File(path),
                });
            }
        }

        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| LoadedTemplate {
                name: name.clone(),
                source: (*source).to_string(),
                origin: TemplateSource::Builtin,
            })
            .ok_or(ReportError::TemplateNotFound(name))
    }

    /// Lists every available template name, sorted.
    pub fn list(&self) -> Result<Vec<String>, ReportError> {
        let mut names: BTreeSet<String> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, _)| (*name).to_string())
            .collect();

        if let Some(dir) = self.dir.as_deref().filter(|d| d.is_dir()) {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "md") {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        names.insert(name.to_string());
                    }
                }
            }
        }

        Ok(names.into_iter().collect())
    }

    /// Writes the built-in templates into `dir`, leaving existing files alone.
    ///
    /// Returns the paths that were written.
    pub fn install_defaults(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (name, source) in BUILTIN_TEMPLATES {
            let path = dir.join(name);
            if path.exists() {
                continue;
            }
            fs::write(&path, source)?;
            info!(template = name, path = %path.display(), "Created template");
            written.push(path);
        }

        info!(
            created = written.len(),
            available = BUILTIN_TEMPLATES.len(),
            "Template initialization complete"
        );
        Ok(written)
    }

    /// Describes a template's variables and size.
    pub fn describe(&self, name: &str) -> Result<TemplateInfo, ReportError> {
        let template = self.load(name)?;
        Ok(TemplateInfo {
            variables: template_variables(&template.source),
            size: template.source.len(),
            lines: template.source.lines().count(),
            name: template.name,
            origin: template.origin,
        })
    }
}

fn normalize_name(name: &str) -> Result<String, ReportError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(ReportError::TemplateNotFound(name.to_string()));
    }
    Ok(if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.md")
    })
}

/// Collects the context variables referenced by a template's mustaches.
fn template_variables(source: &str) -> Vec<String> {
    let mut variables = BTreeSet::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let expr = after[..end].trim_matches(|c| c == '~' || c == '{' || c == '}');

        for token in expr
            .trim_start_matches(['#', '/', '^'])
            .split_whitespace()
        {
            let is_identifier = token
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            if is_identifier && !RESERVED.contains(&token) {
                variables.insert(token.to_string());
            }
        }

        rest = &after[end + 2..];
    }

    variables.into_iter().collect()
}
