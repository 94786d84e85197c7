//! Collection alias table.
//!
//! Maps every name a collection may go by to its key in the declared
//! document: the key itself, the collection `name`, its `UPPER_SNAKE_ID`
//! placeholder and, for auth collections, `users`, `USERS_ID` and the auth
//! sentinel.

use std::collections::HashMap;

use markets_schema::{CollectionDef, SchemaDocument};

use crate::error::{MigrateResult, MigrationError};
use crate::resolver::{AUTH_SENTINEL, USERS_COLLECTION, placeholder_for};

/// Lookup from symbolic collection names to declared keys.
#[derive(Debug, Clone, Default)]
pub struct CollectionAliases {
    aliases: HashMap<String, String>,
    keys: Vec<String>,
}

impl CollectionAliases {
    /// Build the table for a declared document.
    pub fn new(document: &SchemaDocument) -> Self {
        let mut aliases = HashMap::new();
        let keys: Vec<String> = document.collections.keys().cloned().collect();

        // Exact keys and names win over derived aliases.
        for (key, collection) in &document.collections {
            aliases.insert(key.clone(), key.clone());
            aliases
                .entry(collection.name.clone())
                .or_insert_with(|| key.clone());
        }
        for (key, collection) in &document.collections {
            aliases
                .entry(placeholder_for(&collection.name))
                .or_insert_with(|| key.clone());
        }

        let auth = document
            .collections
            .iter()
            .filter(|(_, c)| c.is_auth())
            .find(|(_, c)| c.name == USERS_COLLECTION)
            .or_else(|| document.collections.iter().find(|(_, c)| c.is_auth()));
        if let Some((key, _)) = auth {
            for alias in [USERS_COLLECTION, "USERS_ID", AUTH_SENTINEL] {
                aliases
                    .entry(alias.to_string())
                    .or_insert_with(|| key.clone());
            }
        }

        Self { aliases, keys }
    }

    /// The declared key a name refers to.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// The declared definition a name refers to.
    pub fn definition<'d>(
        &self,
        document: &'d SchemaDocument,
        name: &str,
    ) -> MigrateResult<&'d CollectionDef> {
        self.lookup(name)
            .and_then(|key| document.get(key))
            .ok_or_else(|| MigrationError::SchemaLookup {
                name: name.to_string(),
                available: self.keys.clone(),
            })
    }

    /// Declared keys, in document order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}
