//! Field definitions.
//!
//! On the wire a field is `{id, name, type, required, options}` where the
//! shape of `options` depends on `type`. In memory the pair is a single
//! [`FieldKind`] so every site that cares about options matches exhaustively.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

/// A field (column) of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct FieldDef {
    /// Server-assigned field id. Absent in hand-written declarations.
    pub id: Option<String>,
    /// Field name, unique within its collection.
    pub name: String,
    /// Whether a value is required.
    pub required: bool,
    /// Whether the backend manages this field itself.
    pub system: bool,
    /// Whether the admin UI shows this field when presenting relations.
    pub presentable: bool,
    /// Field type and its type-specific options.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Create an optional field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            required: false,
            system: false,
            presentable: false,
            kind,
        }
    }

    /// Create a plain text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text(TextOptions::default()))
    }

    /// Create a single-valued relation field pointing at `target`.
    ///
    /// `target` may be a collection name, an `UPPER_SNAKE_ID` placeholder or a
    /// live collection id.
    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Relation(RelationOptions {
                collection_id: target.into(),
                max_select: Some(1),
                ..RelationOptions::default()
            }),
        )
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the server-assigned id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The wire name of this field's type.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Check if this is a relation field.
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation(_))
    }

    /// The relation target, if this is a relation field.
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation(options) => Some(options.collection_id.as_str()),
            _ => None,
        }
    }

    /// Mutable access to the relation target, if this is a relation field.
    pub fn relation_target_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            FieldKind::Relation(options) => Some(&mut options.collection_id),
            _ => None,
        }
    }

    /// Compare two definitions ignoring the server-assigned id.
    pub fn same_definition(&self, other: &FieldDef) -> bool {
        self.name == other.name
            && self.required == other.required
            && self.system == other.system
            && self.presentable == other.presentable
            && self.kind == other.kind
    }
}

/// Field type tag together with its options.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Plain text.
    Text(TextOptions),
    /// Rich text (HTML).
    Editor(EditorOptions),
    /// Numeric value.
    Number(NumberOptions),
    /// Boolean flag. Carries no options.
    Bool,
    /// Email address.
    Email(DomainOptions),
    /// URL.
    Url(DomainOptions),
    /// Date/time.
    Date(DateOptions),
    /// One or more values from a fixed set.
    Select(SelectOptions),
    /// Uploaded file(s).
    File(FileOptions),
    /// Reference to records of another collection.
    Relation(RelationOptions),
    /// Arbitrary JSON.
    Json(JsonOptions),
}

impl FieldKind {
    /// The wire name of the type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Editor(_) => "editor",
            Self::Number(_) => "number",
            Self::Bool => "bool",
            Self::Email(_) => "email",
            Self::Url(_) => "url",
            Self::Date(_) => "date",
            Self::Select(_) => "select",
            Self::File(_) => "file",
            Self::Relation(_) => "relation",
            Self::Json(_) => "json",
        }
    }

    /// Build a kind from its wire `type` tag and raw `options` value.
    ///
    /// A `null` or missing options value yields the type's defaults.
    pub fn from_parts(field: &str, type_name: &str, options: Value) -> Result<Self, SchemaError> {
        let kind = match type_name {
            "text" => Self::Text(parse_options(field, type_name, options)?),
            "editor" => Self::Editor(parse_options(field, type_name, options)?),
            "number" => Self::Number(parse_options(field, type_name, options)?),
            "bool" => Self::Bool,
            "email" => Self::Email(parse_options(field, type_name, options)?),
            "url" => Self::Url(parse_options(field, type_name, options)?),
            "date" => Self::Date(parse_options(field, type_name, options)?),
            "select" => Self::Select(parse_options(field, type_name, options)?),
            "file" => Self::File(parse_options(field, type_name, options)?),
            "relation" => Self::Relation(parse_options(field, type_name, options)?),
            "json" => Self::Json(parse_options(field, type_name, options)?),
            other => {
                return Err(SchemaError::UnknownFieldType {
                    field: field.to_string(),
                    type_name: other.to_string(),
                });
            }
        };
        Ok(kind)
    }

    /// The wire `options` value for this kind.
    pub fn options_value(&self) -> Value {
        let value = match self {
            Self::Text(o) => serde_json::to_value(o),
            Self::Editor(o) => serde_json::to_value(o),
            Self::Number(o) => serde_json::to_value(o),
            Self::Bool => Ok(Value::Object(serde_json::Map::new())),
            Self::Email(o) | Self::Url(o) => serde_json::to_value(o),
            Self::Date(o) => serde_json::to_value(o),
            Self::Select(o) => serde_json::to_value(o),
            Self::File(o) => serde_json::to_value(o),
            Self::Relation(o) => serde_json::to_value(o),
            Self::Json(o) => serde_json::to_value(o),
        };
        // Plain structs of strings and numbers always serialize.
        value.unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }
}

fn parse_options<T: DeserializeOwned + Default>(
    field: &str,
    type_name: &str,
    options: Value,
) -> Result<T, SchemaError> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options).map_err(|e| SchemaError::InvalidOptions {
        field: field.to_string(),
        type_name: type_name.to_string(),
        message: e.to_string(),
    })
}

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Options for `text` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextOptions {
    pub min: Option<u64>,
    pub max: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub pattern: String,
}

/// Options for `editor` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    pub convert_urls: bool,
}

/// Options for `number` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub no_decimal: bool,
}

/// Options for `email` and `url` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomainOptions {
    pub except_domains: Option<Vec<String>>,
    pub only_domains: Option<Vec<String>>,
}

/// Options for `date` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateOptions {
    #[serde(deserialize_with = "null_as_default")]
    pub min: String,
    #[serde(deserialize_with = "null_as_default")]
    pub max: String,
}

/// Options for `select` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectOptions {
    pub max_select: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub values: Vec<String>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            max_select: 1,
            values: Vec::new(),
        }
    }
}

/// Options for `file` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileOptions {
    #[serde(deserialize_with = "null_as_default")]
    pub mime_types: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbs: Vec<String>,
    pub max_select: u32,
    pub max_size: u64,
    pub protected: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            mime_types: Vec::new(),
            thumbs: Vec::new(),
            max_select: 1,
            max_size: 5_242_880,
            protected: false,
        }
    }
}

/// Options for `relation` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationOptions {
    /// Target collection: a symbolic placeholder before resolution, the live
    /// collection id after.
    pub collection_id: String,
    pub cascade_delete: bool,
    pub min_select: Option<u32>,
    pub max_select: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub display_fields: Vec<String>,
}

/// Options for `json` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonOptions {
    pub max_size: u64,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self { max_size: 2_000_000 }
    }
}

/// Wire representation of a field.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    presentable: bool,
    #[serde(default)]
    options: Value,
}

impl TryFrom<RawField> for FieldDef {
    type Error = SchemaError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let kind = FieldKind::from_parts(&raw.name, &raw.type_name, raw.options)?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            required: raw.required,
            system: raw.system,
            presentable: raw.presentable,
            kind,
        })
    }
}

impl From<FieldDef> for RawField {
    fn from(field: FieldDef) -> Self {
        Self {
            type_name: field.kind.type_name().to_string(),
            options: field.kind.options_value(),
            id: field.id,
            name: field.name,
            required: field.required,
            system: field.system,
            presentable: field.presentable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_relation_field() {
        let field: FieldDef = serde_json::from_value(json!({
            "name": "cat",
            "type": "relation",
            "required": true,
            "options": { "collectionId": "CATS_ID", "maxSelect": 1 }
        }))
        .unwrap();

        assert!(field.is_relation());
        assert!(field.required);
        assert_eq!(field.relation_target(), Some("CATS_ID"));
        assert_eq!(field.type_name(), "relation");
    }

    #[test]
    fn test_missing_options_use_defaults() {
        let field: FieldDef =
            serde_json::from_value(json!({ "name": "tags", "type": "select" })).unwrap();

        assert_eq!(field.kind, FieldKind::Select(SelectOptions::default()));
    }

    #[test]
    fn test_null_option_values_match_defaults() {
        let live: FieldDef = serde_json::from_value(json!({
            "id": "abcd1234",
            "name": "title",
            "type": "text",
            "options": { "min": null, "max": null, "pattern": null }
        }))
        .unwrap();
        let declared = FieldDef::text("title");

        assert!(declared.same_definition(&live));
        assert_ne!(declared, live);
    }

    #[test]
    fn test_bool_field_accepts_empty_options() {
        let field: FieldDef = serde_json::from_value(json!({
            "name": "active",
            "type": "bool",
            "options": {}
        }))
        .unwrap();

        assert_eq!(field.kind, FieldKind::Bool);
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["options"], json!({}));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = serde_json::from_value::<FieldDef>(json!({
            "name": "geo",
            "type": "geoPoint"
        }))
        .unwrap_err();

        assert!(err.to_string().contains("unknown field type `geoPoint`"));
    }

    #[test]
    fn test_mismatched_options_are_rejected() {
        let err = serde_json::from_value::<FieldDef>(json!({
            "name": "price",
            "type": "number",
            "options": { "min": "zero" }
        }))
        .unwrap_err();

        assert!(err.to_string().contains("invalid options for number field `price`"));
    }

    #[test]
    fn test_serialize_wire_shape() {
        let field = FieldDef::relation("market", "markets").required().with_id("f1");
        let value = serde_json::to_value(&field).unwrap();

        assert_eq!(value["id"], "f1");
        assert_eq!(value["type"], "relation");
        assert_eq!(value["required"], true);
        assert_eq!(value["options"]["collectionId"], "markets");
        assert_eq!(value["options"]["maxSelect"], 1);
    }

    #[test]
    fn test_declared_field_has_no_id_on_wire() {
        let value = serde_json::to_value(FieldDef::text("name")).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_relation_target_mut() {
        let mut field = FieldDef::relation("cat", "cats");
        if let Some(target) = field.relation_target_mut() {
            *target = "pbc_123".to_string();
        }
        assert_eq!(field.relation_target(), Some("pbc_123"));

        let mut text = FieldDef::text("name");
        assert!(text.relation_target_mut().is_none());
    }
}
