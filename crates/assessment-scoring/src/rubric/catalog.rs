use std::io::Read;
use std::path::Path;

use super::template::Template;

/// Errors raised while loading a template catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read template catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid template catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads published templates from JSON: a single template object or an array of them.
pub struct TemplateCatalog;

impl TemplateCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Template>, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Vec<Template>, CatalogError> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;

        if document.trim_start().starts_with('[') {
            Ok(serde_json::from_str(&document)?)
        } else {
            Ok(vec![serde_json::from_str(&document)?])
        }
    }
}
