//! # Configuration File
//!
//! `quards.toml` holds the settings a run needs besides its game id:
//!
//! ```toml
//! [storage]
//! backend = "redb"          # or "memory"
//! database = "quards.redb"
//!
//! [explore]
//! max_depth = 10
//! workers = 4
//!
//! [lorcana]
//! cards = "cards.json"
//! deck1 = "player1.dek"
//! deck2 = "player2.dek"
//! ```
//!
//! Every table and key is optional. Command line flags override the file.

use quards_core::games::lorcana::{CardIndex, Deck, LorcanaSetup};
use quards_core::{ExploreConfig, QuardsError, Result, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "quards.toml";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// TABLES
// =============================================================================

/// `[storage]`: where states and transitions live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "redb" (persistent) or "memory".
    pub backend: String,
    /// Database path for the redb backend.
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "redb".to_string(),
            database: PathBuf::from("quards.redb"),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "redb" => StorageBackend::with_redb(&self.database),
            "memory" => Ok(StorageBackend::default()),
            other => Err(QuardsError::ConfigError(format!(
                "unknown backend '{}' (expected 'redb' or 'memory')",
                other
            ))),
        }
    }
}

/// `[lorcana]`: card database and the two deck lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LorcanaConfig {
    /// JSON card dump.
    pub cards: PathBuf,
    /// Player one's `.dek` file.
    pub deck1: PathBuf,
    /// Player two's `.dek` file.
    pub deck2: PathBuf,
}

impl Default for LorcanaConfig {
    fn default() -> Self {
        Self {
            cards: PathBuf::from("cards.json"),
            deck1: PathBuf::from("player1.dek"),
            deck2: PathBuf::from("player2.dek"),
        }
    }
}

impl LorcanaConfig {
    /// Load the card index.
    pub fn load_cards(&self) -> Result<CardIndex> {
        let cards = CardIndex::load(&self.cards)?;
        tracing::info!("Loaded {} cards from {}", cards.len(), self.cards.display());
        Ok(cards)
    }

    /// Load both deck lists against `cards`.
    pub fn load_setup(&self, cards: &CardIndex) -> Result<LorcanaSetup> {
        let setup = LorcanaSetup {
            deck1: Deck::load(&self.deck1, cards)?,
            deck2: Deck::load(&self.deck2, cards)?,
        };
        tracing::info!(
            "Loaded decks of {} and {} cards",
            setup.deck1.len(),
            setup.deck2.len()
        );
        Ok(setup)
    }
}

// =============================================================================
// FILE
// =============================================================================

/// The whole `quards.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuardsConfig {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Exploration settings.
    pub explore: ExploreConfig,
    /// Lorcana rule set inputs.
    pub lorcana: LorcanaConfig,
}

impl QuardsConfig {
    /// Parse config text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| QuardsError::ConfigError(e.to_string()))
    }

    /// Read a config file.
    ///
    /// A missing file is only an error when it was asked for explicitly;
    /// otherwise defaults apply.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !path.exists() {
            if explicit {
                return Err(QuardsError::ConfigError(format!(
                    "config file '{}' not found",
                    path.display()
                )));
            }
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| QuardsError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(QuardsError::ConfigError(format!(
                "config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            QuardsError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        config.explore.validate()?;
        Ok(config)
    }
}
