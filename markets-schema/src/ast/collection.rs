//! Collection definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::field::FieldDef;

/// A collection (table) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDef {
    /// Server-assigned collection id. Present in live snapshots only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Collection name.
    #[serde(default)]
    pub name: String,
    /// Collection type.
    #[serde(rename = "type", default)]
    pub collection_type: CollectionType,
    /// Whether the backend manages this collection itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
    /// Ordered field list.
    #[serde(default)]
    pub schema: Vec<FieldDef>,
    /// Access rules.
    #[serde(flatten)]
    pub rules: Rules,
    /// Index statements, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<String>>,
    /// Collection-level options, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl CollectionDef {
    /// Create an empty collection with admin-only rules.
    pub fn new(name: impl Into<String>, collection_type: CollectionType) -> Self {
        Self {
            id: None,
            name: name.into(),
            collection_type,
            system: false,
            schema: Vec::new(),
            rules: Rules::default(),
            indexes: None,
            options: None,
        }
    }

    /// Create an empty `base` collection.
    pub fn base(name: impl Into<String>) -> Self {
        Self::new(name, CollectionType::Base)
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.schema.push(field);
        self
    }

    /// Set the server-assigned id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the rules.
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Check if this is an auth collection.
    pub fn is_auth(&self) -> bool {
        self.collection_type == CollectionType::Auth
    }

    /// Check if any field is a relation.
    pub fn has_relations(&self) -> bool {
        self.schema.iter().any(FieldDef::is_relation)
    }

    /// Iterate over the relation targets of this collection's fields.
    pub fn relation_targets(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().filter_map(FieldDef::relation_target)
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.schema.iter().find(|f| f.name == name)
    }
}

/// Collection type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Regular record collection.
    #[default]
    Base,
    /// Collection whose records can authenticate.
    Auth,
    /// Read-only collection backed by a query.
    View,
}

impl CollectionType {
    /// The wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Auth => "auth",
            Self::View => "view",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five access rules of a collection.
///
/// `None` means admin-only; `Some("")` means public. The two are distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
}

impl Rules {
    /// Rules with every operation public.
    pub fn public() -> Self {
        let open = || Some(String::new());
        Self {
            list_rule: open(),
            view_rule: open(),
            create_rule: open(),
            update_rule: open(),
            delete_rule: open(),
        }
    }

    /// Get a rule by kind.
    pub fn get(&self, kind: RuleKind) -> Option<&str> {
        match kind {
            RuleKind::List => self.list_rule.as_deref(),
            RuleKind::View => self.view_rule.as_deref(),
            RuleKind::Create => self.create_rule.as_deref(),
            RuleKind::Update => self.update_rule.as_deref(),
            RuleKind::Delete => self.delete_rule.as_deref(),
        }
    }
}

/// Which access rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKind {
    #[serde(rename = "listRule")]
    List,
    #[serde(rename = "viewRule")]
    View,
    #[serde(rename = "createRule")]
    Create,
    #[serde(rename = "updateRule")]
    Update,
    #[serde(rename = "deleteRule")]
    Delete,
}

impl RuleKind {
    /// All rules, in comparison order.
    pub const ALL: [RuleKind; 5] = [
        RuleKind::List,
        RuleKind::View,
        RuleKind::Create,
        RuleKind::Update,
        RuleKind::Delete,
    ];

    /// The wire key of the rule.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "listRule",
            Self::View => "viewRule",
            Self::Create => "createRule",
            Self::Update => "updateRule",
            Self::Delete => "deleteRule",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_live_collection() {
        let collection: CollectionDef = serde_json::from_value(json!({
            "id": "pbc_cats",
            "created": "2024-01-01 00:00:00.000Z",
            "name": "cats",
            "type": "base",
            "system": false,
            "schema": [
                { "id": "f1", "name": "name", "type": "text", "required": true, "options": {} }
            ],
            "indexes": [],
            "listRule": "",
            "viewRule": "",
            "createRule": null,
            "updateRule": null,
            "deleteRule": null,
            "options": {}
        }))
        .unwrap();

        assert_eq!(collection.id.as_deref(), Some("pbc_cats"));
        assert_eq!(collection.rules.get(RuleKind::List), Some(""));
        assert_eq!(collection.rules.get(RuleKind::Create), None);
        assert_eq!(collection.schema.len(), 1);
        assert!(!collection.has_relations());
    }

    #[test]
    fn test_declared_collection_defaults() {
        let collection: CollectionDef = serde_json::from_value(json!({
            "name": "users",
            "type": "auth"
        }))
        .unwrap();

        assert!(collection.is_auth());
        assert!(collection.schema.is_empty());
        assert_eq!(collection.rules, Rules::default());
        assert!(collection.options.is_none());
    }

    #[test]
    fn test_serialize_keeps_null_rules() {
        let value = serde_json::to_value(CollectionDef::base("cats")).unwrap();

        assert_eq!(value["type"], "base");
        assert_eq!(value["listRule"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("deleteRule"));
        assert!(value.get("id").is_none());
        assert!(value.get("system").is_none());
        assert!(value.get("indexes").is_none());
    }

    #[test]
    fn test_relation_targets() {
        let collection = CollectionDef::base("items")
            .with_field(FieldDef::text("name"))
            .with_field(FieldDef::relation("cat", "CATS_ID"))
            .with_field(FieldDef::relation("owner", "users"));

        assert!(collection.has_relations());
        assert_eq!(
            collection.relation_targets().collect::<Vec<_>>(),
            vec!["CATS_ID", "users"]
        );
        assert!(collection.field("cat").is_some());
        assert!(collection.field("missing").is_none());
    }

    #[test]
    fn test_rule_kind_order() {
        let keys: Vec<_> = RuleKind::ALL.iter().map(RuleKind::as_str).collect();
        assert_eq!(
            keys,
            vec!["listRule", "viewRule", "createRule", "updateRule", "deleteRule"]
        );
    }

    #[test]
    fn test_public_rules() {
        let rules = Rules::public();
        for kind in RuleKind::ALL {
            assert_eq!(rules.get(kind), Some(""));
        }
    }
}
