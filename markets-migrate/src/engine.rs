//! Reconciliation engine.
//!
//! Plans by snapshotting the backend, resolving the declared document against
//! it and diffing. Applies in two phases: missing collections are created
//! (collections without relations first, then relational ones in dependency
//! order, refreshing the id map after each creation), then changed
//! collections are updated wholesale. Collections are never deleted.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use markets_schema::{CollectionDef, SchemaDocument};
use tracing::{debug, error, info, warn};

use crate::alias::CollectionAliases;
use crate::backend::SchemaBackend;
use crate::diff::{DiffResult, SchemaDiffer};
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::{Inspector, LiveSchema};
use crate::resolver::Resolver;

/// Everything needed to apply a reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// The declared document as loaded.
    pub declared: SchemaDocument,
    /// The declared document resolved against the live id map.
    pub resolved: SchemaDocument,
    /// Live state the diff was computed against.
    pub live: LiveSchema,
    /// Differences between `resolved` and `live`.
    pub diff: DiffResult,
}

impl ReconcilePlan {
    /// Check if applying would change anything.
    pub fn is_up_to_date(&self) -> bool {
        !self.diff.has_pending_changes()
    }
}

/// Kind of collection-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Collection creation.
    Create,
    /// Collection update.
    Update,
}

impl OperationKind {
    /// Lowercase verb for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

/// A failed collection-level operation.
#[derive(Debug, Clone)]
pub struct FailedOperation {
    /// What was attempted.
    pub kind: OperationKind,
    /// Collection name.
    pub collection: String,
    /// Error message.
    pub error: String,
}

/// Outcome of an apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Successful operations, in execution order.
    pub succeeded: Vec<(OperationKind, String)>,
    /// Failed operations, in execution order.
    pub failed: Vec<FailedOperation>,
    /// Collections created with a dependency cycle among them.
    pub cycle: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl ApplyReport {
    /// Check if every operation succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of created collections, in creation order.
    pub fn created(&self) -> Vec<&str> {
        self.succeeded
            .iter()
            .filter(|(kind, _)| *kind == OperationKind::Create)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Get a summary of the report.
    pub fn summary(&self) -> String {
        format!(
            "{} successful operations, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }

    fn record_success(&mut self, kind: OperationKind, collection: &str) {
        self.succeeded.push((kind, collection.to_string()));
    }

    fn record_failure(&mut self, kind: OperationKind, collection: &str, error: &MigrationError) {
        self.failed.push(FailedOperation {
            kind,
            collection: collection.to_string(),
            error: error.to_string(),
        });
    }
}

/// Order in which missing collections are created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationOrder {
    /// Collections without relation fields, by name.
    pub independent: Vec<String>,
    /// Collections with relation fields, targets before the collections that
    /// point at them.
    pub dependent: Vec<String>,
    /// Members of `dependent` caught in a dependency cycle, appended by name.
    pub cycle: Vec<String>,
}

/// Order `pending` collections for creation.
///
/// Relation targets are mapped through `aliases`; targets outside `pending`
/// already exist live (or never will) and impose no ordering.
pub fn creation_order(
    pending: &BTreeSet<String>,
    declared: &SchemaDocument,
    aliases: &CollectionAliases,
) -> CreationOrder {
    let mut order = CreationOrder::default();
    let mut relational: BTreeSet<String> = BTreeSet::new();

    for name in pending {
        match aliases.definition(declared, name) {
            Ok(def) if def.has_relations() => {
                relational.insert(name.clone());
            }
            _ => order.independent.push(name.clone()),
        }
    }

    let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for name in &relational {
        let targets = aliases
            .definition(declared, name)
            .map(|def| dependencies(def, aliases, &relational))
            .unwrap_or_default();
        deps.insert(name.clone(), targets);
    }

    let mut ready: BTreeSet<String> = deps
        .iter()
        .filter(|(_, d)| d.is_empty())
        .map(|(n, _)| n.clone())
        .collect();
    while let Some(next) = ready.pop_first() {
        deps.remove(&next);
        for (name, d) in deps.iter_mut() {
            if d.remove(&next) && d.is_empty() {
                ready.insert(name.clone());
            }
        }
        order.dependent.push(next);
    }

    // Whatever is left depends on itself through a cycle.
    for name in deps.into_keys() {
        order.cycle.push(name.clone());
        order.dependent.push(name);
    }

    order
}

fn dependencies(
    def: &CollectionDef,
    aliases: &CollectionAliases,
    relational: &BTreeSet<String>,
) -> BTreeSet<String> {
    def.relation_targets()
        .filter_map(|target| aliases.lookup(target))
        .filter(|key| *key != def.name && relational.contains(*key))
        .map(str::to_string)
        .collect()
}

/// Carry live field ids onto declared fields with the same name and type.
pub fn adopt_field_ids(declared: &mut CollectionDef, live: &CollectionDef) {
    for field in declared.schema.iter_mut() {
        if field.id.is_some() {
            continue;
        }
        if let Some(existing) = live.field(&field.name) {
            if existing.type_name() == field.type_name() {
                field.id = existing.id.clone();
            }
        }
    }
}

/// Drives plan and apply against a backend.
pub struct ReconcileEngine<'a, B: SchemaBackend + ?Sized> {
    backend: &'a B,
    resolver: Resolver,
}

impl<'a, B: SchemaBackend + ?Sized> ReconcileEngine<'a, B> {
    /// Create an engine over a backend.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            resolver: Resolver::new(),
        }
    }

    /// The resolver with its current id map.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Snapshot live state, resolve `declared` against it and diff.
    pub async fn plan(&mut self, declared: &SchemaDocument) -> MigrateResult<ReconcilePlan> {
        let live = Inspector::new(self.backend).snapshot().await?;
        self.resolver = Resolver::from_collections(&live.collections);

        let resolved = self.resolver.resolve(declared);
        let diff = SchemaDiffer::new(&resolved, &live.collections).diff();
        debug!(summary = %diff.summary(), "computed schema diff");

        Ok(ReconcilePlan {
            declared: declared.clone(),
            resolved,
            live,
            diff,
        })
    }

    /// Apply a plan. Per-collection failures are logged and counted.
    pub async fn apply(&mut self, plan: &ReconcilePlan) -> MigrateResult<ApplyReport> {
        let start = Instant::now();
        let mut report = ApplyReport::default();
        let aliases = CollectionAliases::new(&plan.declared);

        self.resolver.rebuild(self.backend).await?;

        let order = creation_order(&plan.diff.to_create, &plan.declared, &aliases);
        if !order.cycle.is_empty() {
            warn!(
                collections = ?order.cycle,
                "relation cycle among new collections, creating them in name order"
            );
        }
        for name in order.independent.iter().chain(order.dependent.iter()) {
            self.create(plan, &aliases, name, &mut report).await;
        }
        report.cycle = order.cycle;

        for name in plan.diff.to_update.keys() {
            self.update(plan, &aliases, name, &mut report).await;
        }

        if !plan.diff.to_delete.is_empty() {
            info!(
                collections = ?plan.diff.to_delete,
                "live collections not in the declared schema were left untouched"
            );
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        info!("{}", report.summary());
        Ok(report)
    }

    async fn create(
        &mut self,
        plan: &ReconcilePlan,
        aliases: &CollectionAliases,
        name: &str,
        report: &mut ApplyReport,
    ) {
        let mut collection = match aliases.definition(&plan.declared, name) {
            Ok(def) => def.clone(),
            Err(e) => {
                error!(collection = name, "{e}");
                report.record_failure(OperationKind::Create, name, &e);
                return;
            }
        };
        collection.id = None;
        self.resolver.resolve_collection(&mut collection);

        match self.backend.create_collection(&collection).await {
            Ok(created) => {
                info!(
                    collection = name,
                    id = created.id.as_deref().unwrap_or_default(),
                    "created collection"
                );
                report.record_success(OperationKind::Create, name);
                if let Err(e) = self.resolver.rebuild(self.backend).await {
                    warn!("failed to refresh collection id map: {e}");
                }
            }
            Err(e) => {
                log_failure(OperationKind::Create, name, &collection, &e);
                report.record_failure(OperationKind::Create, name, &e);
            }
        }
    }

    async fn update(
        &mut self,
        plan: &ReconcilePlan,
        aliases: &CollectionAliases,
        name: &str,
        report: &mut ApplyReport,
    ) {
        let mut collection = match aliases.definition(&plan.declared, name) {
            Ok(def) => def.clone(),
            Err(e) => {
                error!(collection = name, "{e}");
                report.record_failure(OperationKind::Update, name, &e);
                return;
            }
        };
        collection.id = None;
        self.resolver.resolve_collection(&mut collection);

        let target = match plan.live.get(name) {
            Some(live) => {
                adopt_field_ids(&mut collection, live);
                live.id.clone().unwrap_or_else(|| name.to_string())
            }
            None => name.to_string(),
        };

        match self.backend.update_collection(&target, &collection).await {
            Ok(_) => {
                info!(collection = name, "updated collection");
                report.record_success(OperationKind::Update, name);
            }
            Err(e) => {
                log_failure(OperationKind::Update, name, &collection, &e);
                report.record_failure(OperationKind::Update, name, &e);
            }
        }
    }
}

fn log_failure(kind: OperationKind, name: &str, payload: &CollectionDef, err: &MigrationError) {
    let payload = serde_json::to_string(payload).unwrap_or_default();
    error!(
        operation = kind.as_str(),
        collection = name,
        payload = %payload,
        response = err.response_body().unwrap_or_default(),
        "failed to {} collection: {err}",
        kind.as_str()
    );
}
