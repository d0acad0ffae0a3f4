//! Status vocabulary translation.
//!
//! The board renders a finer-grained set of status labels than the remote
//! store persists. This module holds the bidirectional mapping between the
//! two taxonomies. The UI-to-backend direction is many-to-one (several
//! display states collapse onto one persisted value), so the reverse
//! direction is specified explicitly rather than derived.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A status label as the board displays it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiStatus(pub String);

impl UiStatus {
    pub fn new(s: impl Into<String>) -> Self {
        UiStatus(s.into())
    }
}

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UiStatus {
    fn from(s: &str) -> Self {
        UiStatus(s.to_string())
    }
}

impl From<String> for UiStatus {
    fn from(s: String) -> Self {
        UiStatus(s)
    }
}

/// A status value as the remote store persists it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendStatus(pub String);

impl BackendStatus {
    pub fn new(s: impl Into<String>) -> Self {
        BackendStatus(s.into())
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendStatus {
    fn from(s: &str) -> Self {
        BackendStatus(s.to_string())
    }
}

/// Configuration-supplied mapping between the two status taxonomies.
///
/// Both translation directions are total: an unrecognised value degrades to
/// the configured "backlog"-equivalent fallback and is logged, never dropped
/// and never an error. Callers that care can surface the degradation as a
/// display-only anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusVocabulary {
    ui_to_backend: BTreeMap<UiStatus, BackendStatus>,
    backend_to_ui: BTreeMap<BackendStatus, UiStatus>,
    fallback_ui: UiStatus,
    fallback_backend: BackendStatus,
}

impl StatusVocabulary {
    /// Build a vocabulary from explicit mapping tables.
    ///
    /// The fallbacks are inserted into their tables if absent, so the
    /// fallback values always translate to each other.
    pub fn new(
        ui_to_backend: BTreeMap<UiStatus, BackendStatus>,
        backend_to_ui: BTreeMap<BackendStatus, UiStatus>,
        fallback_ui: UiStatus,
        fallback_backend: BackendStatus,
    ) -> Self {
        let mut vocab = StatusVocabulary {
            ui_to_backend,
            backend_to_ui,
            fallback_ui,
            fallback_backend,
        };
        vocab
            .ui_to_backend
            .entry(vocab.fallback_ui.clone())
            .or_insert_with(|| vocab.fallback_backend.clone());
        vocab
            .backend_to_ui
            .entry(vocab.fallback_backend.clone())
            .or_insert_with(|| vocab.fallback_ui.clone());
        vocab
    }

    /// The board variant shipped with the sales-operations dashboard.
    pub fn default_board() -> Self {
        let ui_to_backend: BTreeMap<UiStatus, BackendStatus> = [
            ("backlog", "backlog"),
            ("thisWeek", "in_progress"),
            ("inProgress", "in_progress"),
            ("onHold", "blocked"),
            ("cancelled", "blocked"),
            ("review", "review"),
            ("done", "done"),
        ]
        .into_iter()
        .map(|(u, b)| (UiStatus::from(u), BackendStatus::from(b)))
        .collect();

        // Reverse direction is lossy, so it is specified, not derived.
        let backend_to_ui: BTreeMap<BackendStatus, UiStatus> = [
            ("backlog", "backlog"),
            ("in_progress", "inProgress"),
            ("blocked", "onHold"),
            ("review", "review"),
            ("done", "done"),
        ]
        .into_iter()
        .map(|(b, u)| (BackendStatus::from(b), UiStatus::from(u)))
        .collect();

        StatusVocabulary::new(
            ui_to_backend,
            backend_to_ui,
            UiStatus::from("backlog"),
            BackendStatus::from("backlog"),
        )
    }

    /// Translate a display status to its persisted value.
    pub fn to_backend(&self, status: &UiStatus) -> BackendStatus {
        match self.ui_to_backend.get(status) {
            Some(backend) => backend.clone(),
            None => {
                debug!(status = %status, "unknown UI status, using fallback");
                self.fallback_backend.clone()
            }
        }
    }

    /// Translate a persisted status to its display value.
    pub fn to_ui(&self, status: &BackendStatus) -> UiStatus {
        match self.backend_to_ui.get(status) {
            Some(ui) => ui.clone(),
            None => {
                debug!(status = %status, "unknown backend status, using fallback");
                self.fallback_ui.clone()
            }
        }
    }

    pub fn contains_ui(&self, status: &UiStatus) -> bool {
        self.ui_to_backend.contains_key(status)
    }

    pub fn contains_backend(&self, status: &BackendStatus) -> bool {
        self.backend_to_ui.contains_key(status)
    }

    pub fn fallback_ui(&self) -> &UiStatus {
        &self.fallback_ui
    }

    pub fn fallback_backend(&self) -> &BackendStatus {
        &self.fallback_backend
    }

    /// All display statuses the vocabulary knows, in stable order.
    pub fn ui_statuses(&self) -> impl Iterator<Item = &UiStatus> {
        self.ui_to_backend.keys()
    }
}
