//! Static registry of persisted entities.
//!
//! Every entity the store knows about is listed here, in the order its schema
//! must be applied. Adding an entity means adding an entry and a migration
//! file; nothing is discovered at runtime.

use rusqlite_migration::{Migrations, M};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    /// Entity name, as used in logs.
    pub name: &'static str,
    pub table: &'static str,
    /// SQL creating the table and its indexes.
    pub migration: &'static str,
}

pub const MODELS: &[Model] = &[
    Model {
        name: "Feed",
        table: "feeds",
        migration: include_str!("../../migrations/001-feeds/up.sql"),
    },
    Model {
        name: "Article",
        table: "articles",
        migration: include_str!("../../migrations/002-articles/up.sql"),
    },
    Model {
        name: "Cache",
        table: "cache",
        migration: include_str!("../../migrations/003-cache/up.sql"),
    },
];

/// Schema migrations for every registered model, in registry order.
pub fn migrations() -> Migrations<'static> {
    let steps = MODELS
        .iter()
        .map(|model| {
            info!(model = model.name, table = model.table, "Loaded model");
            M::up(model.migration)
        })
        .collect();
    Migrations::new(steps)
}
