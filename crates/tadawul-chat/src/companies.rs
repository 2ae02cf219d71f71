//! Company id to Tadawul instrument id lookup

use crate::error::{ChatError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const EMBEDDED_MAP: &str = include_str!("../data/company_map.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    company_id: i64,
    tadawul_id: String,
}

/// Read-only table built once at start-up and shared by reference
#[derive(Debug, Clone, Default)]
pub struct CompanyDirectory {
    by_company: HashMap<i64, String>,
}

impl CompanyDirectory {
    /// Table compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_MAP)
    }

    /// Parse a JSON array of `{companyId, tadawulId}` entries
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<Entry> = serde_json::from_str(raw)
            .map_err(|e| ChatError::CompanyMap(format!("invalid company map: {e}")))?;

        let by_company = entries
            .into_iter()
            .filter(|e| !e.tadawul_id.trim().is_empty())
            .map(|e| (e.company_id, e.tadawul_id))
            .collect();

        Ok(Self { by_company })
    }

    /// Load from a file
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChatError::CompanyMap(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Load from `path` when given, otherwise the embedded table
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let directory = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded()?,
        };
        info!(companies = directory.len(), "Company directory loaded");
        Ok(directory)
    }

    pub fn tadawul_id(&self, company_id: i64) -> Option<&str> {
        self.by_company.get(&company_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_company.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_company.is_empty()
    }
}
