//! The shared sidebar.
//!
//! The sidebar lists every guide published to a server, one [`Summary`] per
//! route, in publication order. It is stored as a JSON array under
//! [`SIDEBAR_ID`].

use serde::{Deserialize, Serialize};
use udocs_storage::{SIDEBAR_ID, Storage, StorageError};

use crate::summary::Summary;

/// Error returned when the sidebar cannot be loaded or saved.
#[derive(Debug, thiserror::Error)]
pub enum SidebarError {
    /// Storage read or write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Stored sidebar is not valid JSON.
    #[error("Invalid sidebar JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SidebarError {
    /// Whether the sidebar has never been saved.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_not_found())
    }
}

/// Ordered registry of published guides, at most one entry per route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sidebar {
    summaries: Vec<Summary>,
}

impl Sidebar {
    /// Load the stored sidebar.
    ///
    /// A sidebar that was never saved is an error; see [`Sidebar::load_or_default`].
    pub fn load(storage: &dyn Storage) -> Result<Self, SidebarError> {
        let data = storage.fetch(SIDEBAR_ID)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Load the stored sidebar, or an empty one if none was saved yet.
    pub fn load_or_default(storage: &dyn Storage) -> Result<Self, SidebarError> {
        match Self::load(storage) {
            Err(e) if e.is_not_found() => {
                tracing::debug!("No sidebar stored yet, starting empty");
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Persist the sidebar.
    pub fn save(&self, storage: &dyn Storage) -> Result<(), SidebarError> {
        let data = serde_json::to_vec(self)?;
        storage.insert(SIDEBAR_ID, &data)?;
        tracing::debug!(routes = self.summaries.len(), "Saved sidebar");
        Ok(())
    }

    /// Replace the entry for the summary's route in place, or append it.
    pub fn merge(&mut self, summary: Summary) {
        match self.summaries.iter_mut().find(|s| s.route == summary.route) {
            Some(existing) => *existing = summary,
            None => self.summaries.push(summary),
        }
    }

    /// Empty the entry for `route`, keeping the route registered.
    pub fn clear_route(&mut self, route: &str) {
        self.merge(Summary::empty(route));
    }

    /// Entry for `route`, if registered.
    #[must_use]
    pub fn get(&self, route: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.route == route)
    }

    /// Registered routes in order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.summaries.iter().map(|s| s.route.as_str())
    }

    /// All entries in order.
    #[must_use]
    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

impl From<Vec<Summary>> for Sidebar {
    fn from(summaries: Vec<Summary>) -> Self {
        Self { summaries }
    }
}
