//! Append-only code version history: saved snapshots, a selectable view,
//! and base/head resolution for diff explanations.

use crate::store::KeyValueStore;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Store key holding the serialized version list.
pub const VERSIONS_STORAGE_KEY: &str = "aicoach_code_versions";
/// Sentinel id of the live editor buffer.
pub const CURRENT_VERSION_ID: &str = "#現在";

/// One saved, immutable copy of the editor buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnapshot {
    pub id: String,
    /// Sequential save number. The live buffer has none.
    #[serde(rename = "number")]
    pub ordinal: Option<u32>,
    pub code: String,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
}

/// Persisted wire shape of the history blob. `nextVersionNumber` is
/// optional on load; when absent the counter is derived from the version
/// count.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredVersions {
    #[serde(default)]
    versions: Vec<CodeSnapshot>,
    #[serde(rename = "nextVersionNumber", default)]
    next_ordinal: Option<u32>,
}

/// Version list plus the editable current buffer. Snapshots are kept
/// newest first. Persistence is soft: a broken store degrades to an
/// empty history instead of failing the editor.
pub struct VersionHistory {
    store: Arc<dyn KeyValueStore>,
    versions: Vec<CodeSnapshot>,
    next_ordinal: u32,
    current_code: String,
    selected_id: String,
}

impl VersionHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let stored = match store.get(VERSIONS_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<StoredVersions>(&raw) {
                Ok(stored) => stored,
                Err(err) => {
                    tracing::warn!("discarding unreadable version history: {}", err);
                    StoredVersions::default()
                }
            },
            Ok(None) => StoredVersions::default(),
            Err(err) => {
                tracing::warn!("failed to load version history: {}", err);
                StoredVersions::default()
            }
        };

        let next_ordinal = stored
            .next_ordinal
            .unwrap_or(stored.versions.len() as u32 + 1);

        Self {
            store,
            versions: stored.versions,
            next_ordinal,
            current_code: String::new(),
            selected_id: CURRENT_VERSION_ID.to_string(),
        }
    }

    pub fn set_current_code(&mut self, code: impl Into<String>) {
        self.current_code = code.into();
    }

    pub fn current_code(&self) -> &str {
        &self.current_code
    }

    /// Snapshot the current buffer under the next ordinal and persist.
    pub fn save(&mut self) -> CodeSnapshot {
        let snapshot = CodeSnapshot {
            id: format!("#{}", self.next_ordinal),
            ordinal: Some(self.next_ordinal),
            code: self.current_code.clone(),
            saved_at: Utc::now(),
        };
        self.next_ordinal += 1;
        self.versions.insert(0, snapshot.clone());
        self.persist();
        snapshot
    }

    fn persist(&self) {
        let stored = StoredVersions {
            versions: self.versions.clone(),
            next_ordinal: Some(self.next_ordinal),
        };
        match serde_json::to_string(&stored) {
            Ok(raw) => {
                if let Err(err) = self.store.set(VERSIONS_STORAGE_KEY, &raw) {
                    tracing::warn!("failed to persist version history: {}", err);
                }
            }
            Err(err) => {
                tracing::warn!("failed to serialize version history: {}", err);
            }
        }
    }

    /// Select a snapshot (or the live buffer) for display. Unknown ids
    /// leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if id == CURRENT_VERSION_ID || self.find(id).is_some() {
            self.selected_id = id.to_string();
            return true;
        }
        false
    }

    pub fn selected_id(&self) -> &str {
        &self.selected_id
    }

    /// Code shown for the current selection. A selection that no longer
    /// resolves displays as empty.
    pub fn selected_code(&self) -> &str {
        if self.selected_id == CURRENT_VERSION_ID {
            return &self.current_code;
        }
        self.find(&self.selected_id)
            .map(|snapshot| snapshot.code.as_str())
            .unwrap_or("")
    }

    pub fn find(&self, id: &str) -> Option<&CodeSnapshot> {
        self.versions.iter().find(|snapshot| snapshot.id == id)
    }

    /// Saved snapshots, newest first.
    pub fn versions(&self) -> &[CodeSnapshot] {
        &self.versions
    }

    /// The selectable list: the live buffer first, then saved snapshots.
    pub fn all_versions(&self) -> Vec<CodeSnapshot> {
        let mut all = Vec::with_capacity(self.versions.len() + 1);
        all.push(self.current_snapshot());
        all.extend(self.versions.iter().cloned());
        all
    }

    fn current_snapshot(&self) -> CodeSnapshot {
        CodeSnapshot {
            id: CURRENT_VERSION_ID.to_string(),
            ordinal: None,
            code: self.current_code.clone(),
            saved_at: Utc::now(),
        }
    }

    fn resolve_code(&self, id: &str) -> Option<String> {
        if id == CURRENT_VERSION_ID {
            return Some(self.current_code.clone());
        }
        self.find(id).map(|snapshot| snapshot.code.clone())
    }

    /// Base and head code for a diff request, `None` when either id is
    /// unresolvable.
    pub fn resolve_diff_pair(&self, base_id: &str, head_id: &str) -> Option<(String, String)> {
        Some((self.resolve_code(base_id)?, self.resolve_code(head_id)?))
    }

    /// Head choices offered for `base_id`. A candidate saved before the
    /// base is marked ineligible but stays listed; the live buffer is
    /// always eligible.
    pub fn head_candidates(&self, base_id: &str) -> Vec<(CodeSnapshot, bool)> {
        let base_ordinal = if base_id == CURRENT_VERSION_ID {
            None
        } else {
            self.find(base_id).and_then(|snapshot| snapshot.ordinal)
        };

        self.all_versions()
            .into_iter()
            .map(|candidate| {
                let eligible = match (base_ordinal, candidate.ordinal) {
                    (Some(base), Some(head)) => head >= base,
                    _ => true,
                };
                (candidate, eligible)
            })
            .collect()
    }
}

/// Relative label for a save time, matching what the version sidebar
/// shows: たった今, N分前, N時間前, N日前, then a short month/day date.
pub fn format_relative_time(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(saved_at);

    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "たった今".to_string();
    }
    if minutes < 60 {
        return format!("{}分前", minutes);
    }

    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{}時間前", hours);
    }

    let days = elapsed.num_days();
    if days < 7 {
        return format!("{}日前", days);
    }

    format!("{}月{}日", saved_at.month(), saved_at.day())
}
