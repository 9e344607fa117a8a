//! Static content catalogs and their loaders
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::hash::Hasher;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::DataLoader;
use crate::actions::Action;
use crate::combat::BossTemplate;
use crate::config::RulesConfig;
use crate::events::{EventCatalog, RandomEvent};

const DEFAULT_ACTIONS_DATA: &str = include_str!("../assets/data/actions.json");
const DEFAULT_EVENTS_DATA: &str = include_str!("../assets/data/events.json");
const DEFAULT_BOSSES_DATA: &str = include_str!("../assets/data/bosses.json");

/// Asset names understood by loaders.
pub const ACTIONS_ASSET: &str = "actions";
pub const EVENTS_ASSET: &str = "events";
pub const BOSSES_ASSET: &str = "bosses";
pub const RULES_ASSET: &str = "rules";

/// Embedded JSON for a named asset, if the library ships one.
#[must_use]
pub fn embedded_asset(name: &str) -> Option<&'static str> {
    match name {
        ACTIONS_ASSET => Some(DEFAULT_ACTIONS_DATA),
        EVENTS_ASSET => Some(DEFAULT_EVENTS_DATA),
        BOSSES_ASSET => Some(DEFAULT_BOSSES_DATA),
        RULES_ASSET => Some(crate::config::DEFAULT_RULES_DATA),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse {asset}.json: {source}")]
    Parse {
        asset: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} entry with an empty id")]
    EmptyId { kind: &'static str },
    #[error("boss pool is empty")]
    EmptyBossPool,
}

/// Training actions offered to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionCatalog {
    pub actions: Vec<Action>,
}

impl ActionCatalog {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BossPool {
    pub bosses: Vec<BossTemplate>,
}

/// Every piece of static content the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogs {
    pub actions: ActionCatalog,
    pub events: EventCatalog,
    pub bosses: BossPool,
}

impl Catalogs {
    /// Parse and validate the three catalog documents.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for malformed JSON or invalid content.
    pub fn from_json(actions: &str, events: &str, bosses: &str) -> Result<Self, CatalogError> {
        let catalogs = Self {
            actions: parse(ACTIONS_ASSET, actions)?,
            events: parse(EVENTS_ASSET, events)?,
            bosses: parse(BOSSES_ASSET, bosses)?,
        };
        catalogs.validate()?;
        Ok(catalogs)
    }

    /// The catalogs embedded in the library.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the embedded assets are invalid.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_ACTIONS_DATA, DEFAULT_EVENTS_DATA, DEFAULT_BOSSES_DATA)
    }

    /// Check id uniqueness and that at least one boss exists.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        unique_ids("action", self.actions.iter().map(|action| action.id.as_str()))?;
        unique_ids(
            "event",
            self.events.events.iter().map(|event: &RandomEvent| event.id.as_str()),
        )?;
        unique_ids(
            "boss",
            self.bosses.bosses.iter().map(|boss| boss.name.as_str()),
        )?;
        if self.bosses.bosses.is_empty() {
            return Err(CatalogError::EmptyBossPool);
        }
        Ok(())
    }
}

fn parse<T: serde::de::DeserializeOwned>(asset: &'static str, json: &str) -> Result<T, CatalogError> {
    serde_json::from_str(json).map_err(|source| CatalogError::Parse { asset, source })
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(CatalogError::EmptyId { kind });
        }
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Stable hash of the content and balance table a run is played under.
#[must_use]
pub fn ruleset_fingerprint(catalogs: &Catalogs, rules: &RulesConfig) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for bytes in [serde_json::to_vec(catalogs), serde_json::to_vec(rules)] {
        match bytes {
            Ok(bytes) => hasher.write(&bytes),
            Err(err) => log::warn!("fingerprint input not serializable: {err}"),
        }
    }
    hasher.finish()
}

/// Loader serving the assets compiled into the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl DataLoader for StaticLoader {
    type Error = CatalogError;

    fn load_catalogs(&self) -> Result<Catalogs, Self::Error> {
        Catalogs::load_from_static()
    }

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        Ok(RulesConfig::load_from_static())
    }
}

/// Loader wrapping already-built content, handy for tests and embedding.
#[derive(Debug, Clone)]
pub struct FixedLoader {
    pub catalogs: Catalogs,
    pub rules: RulesConfig,
}

impl DataLoader for FixedLoader {
    type Error = Infallible;

    fn load_catalogs(&self) -> Result<Catalogs, Self::Error> {
        Ok(self.catalogs.clone())
    }

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        Ok(self.rules.clone())
    }
}
