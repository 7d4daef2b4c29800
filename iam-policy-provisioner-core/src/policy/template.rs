//! Policy template loading and placeholder substitution.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::TemplateParameters;
use crate::error::{ProvisionerError, ProvisionerResult};

pub const REGION_PLACEHOLDER: &str = "${Region}";
pub const ACCOUNT_ID_PLACEHOLDER: &str = "${AccountId}";

/// Resolve `path` against `base_dir`. Absolute paths are kept as they are.
pub fn resolve_template_path(base_dir: &Path, path: &Path) -> PathBuf {
    base_dir.join(path)
}

/// Read a template as UTF-8 text.
///
/// A missing file yields [`ProvisionerError::TemplateNotFound`]; any other
/// failure (permissions, invalid UTF-8, a directory) yields
/// [`ProvisionerError::TemplateUnreadable`].
pub async fn load_template(base_dir: &Path, path: &Path) -> ProvisionerResult<String> {
    let resolved = resolve_template_path(base_dir, path);

    match fs::metadata(&resolved).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProvisionerError::TemplateNotFound { path: resolved });
        }
        Err(e) => {
            return Err(ProvisionerError::TemplateUnreadable {
                path: resolved,
                source: e,
            });
        }
    }

    log::debug!("Reading policy template {}", resolved.display());
    fs::read_to_string(&resolved)
        .await
        .map_err(|e| ProvisionerError::TemplateUnreadable {
            path: resolved,
            source: e,
        })
}

/// Replace every placeholder occurrence. Purely textual: tokens in keys and
/// values are treated alike and nothing is escaped.
pub fn substitute(template: &str, parameters: &TemplateParameters) -> String {
    template
        .replace(REGION_PLACEHOLDER, &parameters.region)
        .replace(ACCOUNT_ID_PLACEHOLDER, &parameters.account_id)
}

/// Check that the document parses as JSON. Structure is left to IAM.
pub fn validate_document(document: &str) -> ProvisionerResult<()> {
    serde_json::from_str::<serde_json::Value>(document)
        .map(|_| ())
        .map_err(|e| ProvisionerError::InvalidDocument(e.to_string()))
}
