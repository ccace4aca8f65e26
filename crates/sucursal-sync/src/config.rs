//! # Sync Configuration
//!
//! Per-branch replication settings, stored as a TOML file.
//!
//! ## File Location
//! `{config_dir}/sucursal-pos/sync.toml`, resolved per platform via
//! the `directories` crate (e.g. `~/.config/sucursal-pos/sync.toml`
//! on Linux). A missing file is not an error: [`SyncConfig::load`]
//! falls back to a disabled default so a fresh install runs fully
//! offline until the operator fills in the remote credentials.
//!
//! ## Example
//! ```toml
//! [branch]
//! name = "Norte"
//! ticket_parity = "odd"
//!
//! [remote]
//! base_url = "https://sucursal-pos.firebaseio.com"
//! auth_token = "..."
//!
//! [sync]
//! enabled = true
//! poll_interval_mins = 10
//! sync_products = true
//! sync_suppliers = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use sucursal_core::TicketParity;

// =============================================================================
// Sections
// =============================================================================

/// Identity of this branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Branch name, stamped into every change record as its origin.
    pub name: String,

    /// Ticket number parity assigned to this branch. Odd/even
    /// partitioning keeps ticket numbers globally unique without any
    /// coordination between branches.
    pub ticket_parity: TicketParity,
}

/// Remote append-log endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Base URL of the append-log service (no trailing slash).
    #[serde(default)]
    pub base_url: String,

    /// Auth token appended to every request.
    #[serde(default)]
    pub auth_token: String,
}

/// Replication behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Master switch. When false, mutations are still recorded locally
    /// but nothing is pushed or pulled.
    #[serde(default)]
    pub enabled: bool,

    /// Minutes between background sync cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_mins: u64,

    /// Whether to replicate the product catalog.
    #[serde(default = "default_true")]
    pub sync_products: bool,

    /// Whether to replicate the supplier list.
    #[serde(default = "default_true")]
    pub sync_suppliers: bool,

    /// Path of the offline queue file. Defaults to
    /// `pending_sync.json` next to the config file.
    #[serde(default)]
    pub queue_path: Option<PathBuf>,

    /// Maximum queued changes before the oldest are dropped.
    #[serde(default = "default_queue_cap")]
    pub queue_cap: usize,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_queue_cap() -> usize {
    10_000
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: false,
            poll_interval_mins: default_poll_interval(),
            sync_products: true,
            sync_suppliers: true,
            queue_path: None,
            queue_cap: default_queue_cap(),
        }
    }
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete sync configuration for one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub branch: BranchConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a disabled config for the given branch identity.
    pub fn disabled(branch_name: impl Into<String>, parity: TicketParity) -> Self {
        SyncConfig {
            branch: BranchConfig {
                name: branch_name.into(),
                ticket_parity: parity,
            },
            remote: RemoteConfig::default(),
            sync: SyncSettings::default(),
        }
    }

    /// Returns the default config file path for this platform.
    pub fn default_path() -> SyncResult<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "sucursal-pos")
            .ok_or_else(|| SyncError::Config("Cannot resolve config directory".to_string()))?;
        Ok(dirs.config_dir().join("sync.toml"))
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields a disabled default (branch "Sucursal",
    /// odd tickets) so first launch works without any setup.
    pub fn load(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "No sync config found, sync disabled");
            return Ok(SyncConfig::disabled("Sucursal", TicketParity::Odd));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&raw).map_err(|e| SyncError::Config(e.to_string()))?;

        info!(
            branch = %config.branch.name,
            enabled = config.sync.enabled,
            "Loaded sync config"
        );
        Ok(config)
    }

    /// Writes configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path, raw)?;

        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// Validates the configuration for use with a live remote.
    ///
    /// Only meaningful when `sync.enabled` is true; a disabled config
    /// is always valid.
    pub fn validate(&self) -> SyncResult<()> {
        if self.branch.name.trim().is_empty() {
            return Err(SyncError::Config("Branch name is empty".to_string()));
        }

        if !self.sync.enabled {
            return Ok(());
        }

        let url = Url::parse(&self.remote.base_url)
            .map_err(|e| SyncError::Config(format!("Invalid base_url: {e}")))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(SyncError::Config(format!(
                "base_url must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if self.remote.auth_token.trim().is_empty() {
            return Err(SyncError::Config("auth_token is empty".to_string()));
        }

        if self.sync.poll_interval_mins == 0 {
            return Err(SyncError::Config(
                "poll_interval_mins must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves the offline queue path, defaulting next to the config.
    pub fn queue_path(&self) -> SyncResult<PathBuf> {
        if let Some(path) = &self.sync.queue_path {
            return Ok(path.clone());
        }
        Ok(Self::default_path()?
            .parent()
            .map(|p| p.join("pending_sync.json"))
            .unwrap_or_else(|| PathBuf::from("pending_sync.json")))
    }
}

// =============================================================================
// Tests
// =============================================================================
