//! Name-to-identity resolution
//!
//! Legacy formats often record a player only by display name. Adapters ask an
//! [`IdentityResolver`] for the stable identity and fall back to the
//! unresolved-name placeholder when none is known.

use crate::SourceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_domain::traits::IdentityResolver;

/// Resolver that knows nobody
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl IdentityResolver for NoResolver {
    fn resolve(&self, _name: &str) -> Option<Uuid> {
        None
    }
}

/// In-memory, case-insensitive name table
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    names: HashMap<String, Uuid>,
}

impl MapResolver {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name, replacing any earlier identity for it
    pub fn insert(&mut self, name: &str, uuid: Uuid) {
        self.names.insert(name.to_lowercase(), uuid);
    }

    /// Builder form of [`MapResolver::insert`]
    pub fn with(mut self, name: &str, uuid: Uuid) -> Self {
        self.insert(name, uuid);
        self
    }

    /// Number of known names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl IdentityResolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<Uuid> {
        self.names.get(&name.to_lowercase()).copied()
    }
}

#[derive(Debug, Deserialize)]
struct UserCacheEntry {
    name: String,
    uuid: String,
}

/// Resolver backed by a server's `usercache.json`
#[derive(Debug, Clone)]
pub struct UserCacheResolver {
    inner: MapResolver,
}

impl UserCacheResolver {
    /// Load a user cache file
    ///
    /// Entries with an unparsable identity are skipped.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<UserCacheEntry> = serde_json::from_str(&content)?;

        let mut inner = MapResolver::new();
        let mut skipped = 0usize;
        for entry in entries {
            match Uuid::parse_str(&entry.uuid) {
                Ok(uuid) => inner.insert(&entry.name, uuid),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "Skipped user cache entries with invalid uuid");
        }
        debug!(path = %path.display(), names = inner.len(), "Loaded user cache");
        Ok(Self { inner })
    }
}

impl IdentityResolver for UserCacheResolver {
    fn resolve(&self, name: &str) -> Option<Uuid> {
        self.inner.resolve(name)
    }
}

/// Tries each resolver in turn, first answer wins
#[derive(Clone, Default)]
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn IdentityResolver>>,
}

impl ChainResolver {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver to the end of the chain
    pub fn push(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

impl IdentityResolver for ChainResolver {
    fn resolve(&self, name: &str) -> Option<Uuid> {
        self.resolvers.iter().find_map(|r| r.resolve(name))
    }
}

/// Where names are resolved from during an import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Path to a `usercache.json`
    #[serde(default)]
    pub usercache: Option<PathBuf>,

    /// Fixed name → identity pairs, consulted before the user cache
    #[serde(default)]
    pub aliases: BTreeMap<String, Uuid>,
}

impl ResolutionConfig {
    /// Build the resolver chain this configuration describes
    pub fn build_resolver(&self) -> Result<Arc<dyn IdentityResolver>, SourceError> {
        let mut chain = ChainResolver::new();

        if !self.aliases.is_empty() {
            let mut aliases = MapResolver::new();
            for (name, uuid) in &self.aliases {
                aliases.insert(name, *uuid);
            }
            chain = chain.push(Arc::new(aliases));
        }

        if let Some(path) = &self.usercache {
            if !path.exists() {
                return Err(SourceError::NotFound(path.display().to_string()));
            }
            chain = chain.push(Arc::new(UserCacheResolver::load(path)?));
        }

        Ok(Arc::new(chain))
    }
}
