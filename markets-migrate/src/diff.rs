//! Schema diffing between the declared document and live state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use markets_schema::{CollectionDef, FieldDef, RuleKind, SchemaDocument};
use serde::Serialize;

/// A single change to an existing collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    /// Field declared but not live.
    AddField {
        /// The declared field.
        field: FieldDef,
    },
    /// Field live but not declared.
    RemoveField {
        /// The live field.
        field: FieldDef,
    },
    /// Field present on both sides with different definitions.
    ModifyField {
        /// Field name.
        name: String,
        /// Live definition.
        before: FieldDef,
        /// Declared definition.
        after: FieldDef,
    },
    /// Access rule differs.
    ModifyRule {
        /// Which rule.
        rule: RuleKind,
        /// Live value.
        before: Option<String>,
        /// Declared value.
        after: Option<String>,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddField { field } => write!(f, "+ field {} ({})", field.name, field.type_name()),
            Self::RemoveField { field } => {
                write!(f, "- field {} ({})", field.name, field.type_name())
            }
            Self::ModifyField {
                name,
                before,
                after,
            } => {
                if before.type_name() == after.type_name() {
                    write!(f, "~ field {name}")
                } else {
                    write!(
                        f,
                        "~ field {name} ({} -> {})",
                        before.type_name(),
                        after.type_name()
                    )
                }
            }
            Self::ModifyRule {
                rule,
                before,
                after,
            } => write!(f, "~ {rule}: {} -> {}", show_rule(before), show_rule(after)),
        }
    }
}

fn show_rule(rule: &Option<String>) -> String {
    match rule {
        None => "null".to_string(),
        Some(r) => format!("{r:?}"),
    }
}

/// The result of comparing declared and live schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Collections declared but not live.
    pub to_create: BTreeSet<String>,
    /// Collections live but not declared. Reported only; never applied.
    pub to_delete: BTreeSet<String>,
    /// Collections on both sides with at least one change.
    pub to_update: BTreeMap<String, Vec<Change>>,
}

impl DiffResult {
    /// Check if there are no differences at all.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }

    /// Check if there is anything the applier would act on.
    pub fn has_pending_changes(&self) -> bool {
        !self.to_create.is_empty() || !self.to_update.is_empty()
    }

    /// Total number of collection-level operations the applier would attempt.
    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_update.len()
    }

    /// Total number of field and rule changes across updated collections.
    pub fn change_count(&self) -> usize {
        self.to_update.values().map(Vec::len).sum()
    }

    /// Get a human-readable summary of the diff.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.to_create.is_empty() {
            parts.push(format!("Create {} collections", self.to_create.len()));
        }
        if !self.to_update.is_empty() {
            parts.push(format!(
                "Update {} collections ({} changes)",
                self.to_update.len(),
                self.change_count()
            ));
        }
        if !self.to_delete.is_empty() {
            parts.push(format!("{} live collections not declared", self.to_delete.len()));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Compares a resolved declared document with live collections.
pub struct SchemaDiffer<'a> {
    declared: &'a SchemaDocument,
    live: &'a [CollectionDef],
}

impl<'a> SchemaDiffer<'a> {
    /// Create a differ. `declared` should already be resolved against `live`.
    pub fn new(declared: &'a SchemaDocument, live: &'a [CollectionDef]) -> Self {
        Self { declared, live }
    }

    /// Compute the diff.
    pub fn diff(&self) -> DiffResult {
        let mut result = DiffResult::default();

        let live_by_name: HashMap<&str, &CollectionDef> =
            self.live.iter().map(|c| (c.name.as_str(), c)).collect();
        let declared_names: BTreeSet<&str> = self
            .declared
            .collections
            .values()
            .map(|c| c.name.as_str())
            .collect();

        for declared in self.declared.collections.values() {
            match live_by_name.get(declared.name.as_str()) {
                None => {
                    result.to_create.insert(declared.name.clone());
                }
                Some(live) => {
                    let changes = diff_collection(declared, live);
                    if !changes.is_empty() {
                        result.to_update.insert(declared.name.clone(), changes);
                    }
                }
            }
        }

        for live in self.live {
            if !declared_names.contains(live.name.as_str()) && !live.system && !live.is_auth() {
                result.to_delete.insert(live.name.clone());
            }
        }

        result
    }
}

/// Compute the ordered changes turning `live` into `declared`.
///
/// Order: declared fields (adds and modifications), then live-only fields,
/// then the five rules.
pub fn diff_collection(declared: &CollectionDef, live: &CollectionDef) -> Vec<Change> {
    let mut changes = Vec::new();

    for field in &declared.schema {
        match live.field(&field.name) {
            None => changes.push(Change::AddField {
                field: field.clone(),
            }),
            Some(before) if !field.same_definition(before) => changes.push(Change::ModifyField {
                name: field.name.clone(),
                before: before.clone(),
                after: field.clone(),
            }),
            Some(_) => {}
        }
    }

    for field in &live.schema {
        if declared.field(&field.name).is_none() {
            changes.push(Change::RemoveField {
                field: field.clone(),
            });
        }
    }

    for rule in RuleKind::ALL {
        let before = live.rules.get(rule);
        let after = declared.rules.get(rule);
        if before != after {
            changes.push(Change::ModifyRule {
                rule,
                before: before.map(str::to_string),
                after: after.map(str::to_string),
            });
        }
    }

    changes
}
