//! Per-user named filters
//!
//! Filters are kept as the user's own text and re-parsed on use, so parser
//! improvements apply to old saves too. The store can be snapshotted to a
//! JSON file between runs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{resolve_request, FilterRequest};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct SavedFilterStore {
    /// user -> filter name -> filter text
    users: DashMap<String, BTreeMap<String, String>>,
}

impl SavedFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save under `name`, replacing any earlier filter of that name. Text that
    /// yields no constraint is refused. Returns the replaced text.
    pub fn save(&self, user: &str, name: &str, text: &str) -> Result<Option<String>, ParseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::UnresolvableFilter(name.to_string()));
        }
        let filters = resolve_request(&FilterRequest::Text(text.to_string()))?;
        if filters.is_empty() {
            return Err(ParseError::UnresolvableFilter(text.to_string()));
        }

        info!("💾 Saving filter {:?} for {}: {}", name, user, filters);
        let replaced = self
            .users
            .entry(user.to_string())
            .or_default()
            .insert(name.to_string(), text.trim().to_string());
        Ok(replaced)
    }

    /// The saved filter as a request ready for resolution
    pub fn get(&self, user: &str, name: &str) -> Option<FilterRequest> {
        self.users
            .get(user)
            .and_then(|filters| filters.get(name.trim()).cloned())
            .map(FilterRequest::Text)
    }

    /// Everything `user` saved, by name
    pub fn list(&self, user: &str) -> Vec<SavedFilter> {
        self.users
            .get(user)
            .map(|filters| {
                filters
                    .iter()
                    .map(|(name, text)| SavedFilter {
                        name: name.clone(),
                        text: text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn remove(&self, user: &str, name: &str) -> bool {
        self.users
            .get_mut(user)
            .map(|mut filters| filters.remove(name.trim()).is_some())
            .unwrap_or(false)
    }

    /// Read a snapshot; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No saved filters at {}", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading saved filters {}", path.display()))?;
        let snapshot: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&content)
            .with_context(|| format!("parsing saved filters {}", path.display()))?;
        Ok(Self {
            users: snapshot.into_iter().collect(),
        })
    }

    pub fn persist(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot: BTreeMap<String, BTreeMap<String, String>> = self
            .users
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)
            .with_context(|| format!("writing saved filters {}", path.display()))?;
        Ok(())
    }
}
