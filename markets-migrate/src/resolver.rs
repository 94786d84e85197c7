//! Collection-id resolution.
//!
//! Declared relation fields name their target symbolically: by collection
//! name, by an `UPPER_SNAKE_ID` placeholder, or through the auth sentinel.
//! The backend needs the live collection id, which only exists once the
//! target has been created. The resolver maps every symbolic reference to
//! the live id and rewrites a document accordingly.

use std::collections::{HashMap, HashSet};

use convert_case::{Case, Casing};
use markets_schema::{CollectionDef, SchemaDocument};
use tracing::{debug, trace};

use crate::backend::SchemaBackend;
use crate::error::MigrateResult;

/// Sentinel id of the default auth collection.
pub const AUTH_SENTINEL: &str = "_pb_users_auth_";

/// Name of the default auth collection.
pub const USERS_COLLECTION: &str = "users";

/// Build the `UPPER_SNAKE_ID` placeholder for a collection name.
///
/// `amenity_types` becomes `AMENITY_TYPES_ID`, `marketStalls` becomes
/// `MARKET_STALLS_ID`.
pub fn placeholder_for(name: &str) -> String {
    format!("{}_ID", name.to_case(Case::UpperSnake))
}

/// Mapping from symbolic collection references to live ids.
#[derive(Debug, Clone, Default)]
pub struct CollectionIdMap {
    ids: HashMap<String, String>,
    live_ids: HashSet<String>,
}

impl CollectionIdMap {
    /// Build the map from live collections.
    pub fn from_collections(collections: &[CollectionDef]) -> Self {
        let mut map = Self::default();

        for collection in collections {
            let Some(id) = collection.id.as_deref() else {
                continue;
            };
            map.live_ids.insert(id.to_string());
            map.ids.insert(collection.name.clone(), id.to_string());
            map.ids
                .insert(placeholder_for(&collection.name), id.to_string());
        }

        let auth = collections
            .iter()
            .filter(|c| c.is_auth())
            .find(|c| c.name == USERS_COLLECTION)
            .or_else(|| collections.iter().find(|c| c.is_auth()));
        if let Some(id) = auth.and_then(|c| c.id.as_deref()) {
            for key in [AUTH_SENTINEL, USERS_COLLECTION, "USERS_ID"] {
                map.ids
                    .entry(key.to_string())
                    .or_insert_with(|| id.to_string());
            }
        }

        map
    }

    /// Look up the live id for a symbolic reference.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    /// Check if a value already is a live collection id.
    pub fn is_live_id(&self, value: &str) -> bool {
        self.live_ids.contains(value)
    }

    /// Number of symbolic keys.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the map has no keys.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Rewrites relation targets to live collection ids.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    map: CollectionIdMap,
}

impl Resolver {
    /// Create a resolver with an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver from already-listed live collections.
    pub fn from_collections(collections: &[CollectionDef]) -> Self {
        Self {
            map: CollectionIdMap::from_collections(collections),
        }
    }

    /// Re-query the backend and rebuild the map.
    pub async fn rebuild<B: SchemaBackend + ?Sized>(&mut self, backend: &B) -> MigrateResult<()> {
        let collections = backend.list_collections().await?;
        self.map = CollectionIdMap::from_collections(&collections);
        debug!(keys = self.map.len(), "rebuilt collection id map");
        Ok(())
    }

    /// The current map.
    pub fn map(&self) -> &CollectionIdMap {
        &self.map
    }

    /// Return a copy of `document` with every mapped relation target replaced
    /// by its live id.
    ///
    /// Targets that already are live ids, or that the map does not know, are
    /// left unchanged, so resolving twice gives the same result as once.
    pub fn resolve(&self, document: &SchemaDocument) -> SchemaDocument {
        let mut resolved = document.clone();
        for collection in resolved.collections.values_mut() {
            self.resolve_collection(collection);
        }
        resolved
    }

    /// Resolve the relation targets of a single collection in place.
    pub fn resolve_collection(&self, collection: &mut CollectionDef) {
        for field in collection.schema.iter_mut() {
            let name = field.name.clone();
            let Some(target) = field.relation_target_mut() else {
                continue;
            };
            if self.map.is_live_id(target) {
                continue;
            }
            match self.map.get(target) {
                Some(id) => {
                    trace!(
                        collection = %collection.name,
                        field = %name,
                        from = %target,
                        to = id,
                        "resolved relation target"
                    );
                    *target = id.to_string();
                }
                None => {
                    debug!(
                        collection = %collection.name,
                        field = %name,
                        target = %target,
                        "relation target not live yet"
                    );
                }
            }
        }
    }
}
