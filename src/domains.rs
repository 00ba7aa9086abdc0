use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum DomainSetError {
    #[error("domain list {0} not found")]
    Missing(PathBuf),
    #[error("failed to read domain list: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse domain list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Set of known disposable email domains, loaded once at startup and
/// immutable afterwards.
///
/// Stored domains are kept as-is from the source file; lookups are
/// case-sensitive on the stored form, so callers lowercase the query.
#[derive(Debug, Clone)]
pub struct DomainSet {
    domains: HashSet<String>,
}

impl DomainSet {
    /// Read a JSON array of domain strings from `path`.
    pub fn load(path: &Path) -> Result<Self, DomainSetError> {
        if !path.exists() {
            return Err(DomainSetError::Missing(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let domains: Vec<String> = serde_json::from_str(&data)?;
        Ok(Self {
            domains: domains.into_iter().collect(),
        })
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl FromIterator<String> for DomainSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            domains: iter.into_iter().collect(),
        }
    }
}
