//! Reference data seeding.

use markets_migrate::RecordBackend;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{info, warn};

/// A fixed set of reference rows for one collection.
#[derive(Debug, Clone, Copy)]
pub struct SeedSet {
    /// Target collection name
    pub collection: &'static str,
    /// `(name, description)` pairs
    pub rows: &'static [(&'static str, &'static str)],
}

impl SeedSet {
    fn record(name: &str, description: &str) -> Value {
        json!({ "name": name, "description": description })
    }
}

/// Market categories.
pub const CATEGORIES: SeedSet = SeedSet {
    collection: "categories",
    rows: &[
        ("Farmers Market", "Fresh produce sold directly by local growers"),
        ("Craft Market", "Handmade goods, art and design"),
        ("Food Market", "Street food, baked goods and deli stalls"),
        ("Flea Market", "Second-hand goods, antiques and collectables"),
        ("Night Market", "Evening markets with food and entertainment"),
        ("Artisan Market", "Small-batch producers and makers"),
        ("Vintage Market", "Vintage clothing, furniture and decor"),
    ],
};

/// Amenity types a market can offer.
pub const AMENITY_TYPES: SeedSet = SeedSet {
    collection: "amenity_types",
    rows: &[
        ("Parking", "On-site or nearby parking"),
        ("Toilets", "Public restrooms available"),
        ("ATM", "Cash machine on site or close by"),
        ("Card Payments", "Most stalls accept card payments"),
        ("Wheelchair Access", "Step-free access to the market"),
        ("Kids Area", "Play area or activities for children"),
        ("Pet Friendly", "Dogs on leads welcome"),
        ("Live Music", "Regular live performances"),
        ("Seating", "Tables and seating for visitors"),
    ],
};

/// Every seed set, in insertion order.
pub const SEED_SETS: &[SeedSet] = &[CATEGORIES, AMENITY_TYPES];

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SeedReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} inserted, {} already present, {} failed",
            self.inserted, self.skipped, self.failed
        )
    }
}

/// Inserts seed rows that are not already present.
pub struct SeedRunner<'a, B: RecordBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: RecordBackend + ?Sized> SeedRunner<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Seed every set.
    pub async fn run(&self, sets: &[SeedSet]) -> SeedReport {
        let mut report = SeedReport::default();
        for set in sets {
            self.seed_set(set, &mut report).await;
        }
        info!("seeding finished: {}", report.summary());
        report
    }

    async fn seed_set(&self, set: &SeedSet, report: &mut SeedReport) {
        let existing = match self.backend.list_records(set.collection).await {
            Ok(records) => existing_names(&records),
            Err(e) => {
                warn!(collection = set.collection, "cannot list records: {e}");
                report.failed += set.rows.len();
                return;
            }
        };

        for (name, description) in set.rows {
            if existing.contains(*name) {
                report.skipped += 1;
                continue;
            }
            let record = SeedSet::record(name, description);
            match self.backend.create_record(set.collection, &record).await {
                Ok(_) => {
                    info!(collection = set.collection, name, "inserted seed row");
                    report.inserted += 1;
                }
                Err(e) => {
                    warn!(collection = set.collection, name, "failed to insert seed row: {e}");
                    report.failed += 1;
                }
            }
        }
    }
}

fn existing_names(records: &[Value]) -> HashSet<String> {
    records
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use markets_migrate::MemoryBackend;
    use markets_schema::{CollectionDef, FieldDef};
    use pretty_assertions::assert_eq;

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_collection(
                CollectionDef::base("categories")
                    .with_field(FieldDef::text("name"))
                    .with_field(FieldDef::text("description")),
            )
            .with_collection(
                CollectionDef::base("amenity_types")
                    .with_field(FieldDef::text("name"))
                    .with_field(FieldDef::text("description")),
            )
    }

    fn total_rows() -> usize {
        SEED_SETS.iter().map(|s| s.rows.len()).sum()
    }

    #[tokio::test]
    async fn test_seed_inserts_everything() {
        let backend = backend();
        let report = SeedRunner::new(&backend).run(SEED_SETS).await;

        assert_eq!(report.inserted, total_rows());
        assert!(report.is_success());
        assert_eq!(backend.records("categories").len(), CATEGORIES.rows.len());
    }

    #[tokio::test]
    async fn test_reseed_is_idempotent() {
        let backend = backend();
        SeedRunner::new(&backend).run(SEED_SETS).await;

        let report = SeedRunner::new(&backend).run(SEED_SETS).await;

        assert_eq!(
            report,
            SeedReport {
                inserted: 0,
                skipped: total_rows(),
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_existing_rows_skipped() {
        let backend = backend().with_record("categories", json!({ "name": "Flea Market" }));

        let report = SeedRunner::new(&backend).run(&[CATEGORIES]).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, CATEGORIES.rows.len() - 1);
    }

    #[tokio::test]
    async fn test_row_failures_counted() {
        let backend = backend().fail_record("amenity_types");

        let report = SeedRunner::new(&backend).run(SEED_SETS).await;

        assert_eq!(report.inserted, CATEGORIES.rows.len());
        assert_eq!(report.failed, AMENITY_TYPES.rows.len());
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_missing_collection_counts_set_as_failed() {
        let backend = MemoryBackend::new();

        let report = SeedRunner::new(&backend).run(&[CATEGORIES]).await;

        assert_eq!(report.failed, CATEGORIES.rows.len());
        assert_eq!(report.inserted, 0);
    }
}
