//! SQLite schema definitions for the registry database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

// =============================================================================
// Version 1 - People and selections
// =============================================================================

const PEOPLE_TABLE_V1: Table = Table {
    name: "people",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const PERSON_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "people",
    foreign_column: "id",
    on_delete_cascade: true,
};

/// Append-only audit trail: one row each time a person is found and notified.
const SELECTIONS_TABLE_V1: Table = Table {
    name: "selections",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!(
            "person_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&PERSON_FOREIGN_KEY)
        ),
        sqlite_column!("selected_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_selections_person_id", "person_id"),
        ("idx_selections_selected_at", "selected_at DESC"),
    ],
};

// =============================================================================
// Version 2 - Pipeline state key-value store
// =============================================================================

const PIPELINE_STATE_TABLE_V2: Table = Table {
    name: "pipeline_state",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    PIPELINE_STATE_TABLE_V2.create(conn)
}

pub static REGISTRY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[PEOPLE_TABLE_V1, SELECTIONS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[PEOPLE_TABLE_V1, SELECTIONS_TABLE_V1, PIPELINE_STATE_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
    },
];
