//! Versioned schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`. [`Store::migrate`] is
//! run explicitly once at initialization and applies every migration past the
//! stored version inside one transaction, so a half-applied chain never
//! commits. Opening a store never migrates implicitly.

use crate::{Store, StoreError};

/// Outcome of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: i64,
    pub to_version: i64,
}

impl MigrationReport {
    /// Whether this run applied any migration.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.from_version != self.to_version
    }
}

// Timestamps are TEXT in %Y-%m-%dT%H:%M:%S form, times of day are %H:%M.
// master_shifts.team_id is the historized team snapshot: nullable, detached
// from live membership, nulled (not cascaded) if the team row goes away.
const SCHEMA_V1: &str = "
    CREATE TABLE employees (
        id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT '',
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE teams (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        leader_id INTEGER REFERENCES employees(id) ON DELETE SET NULL
    );

    CREATE TABLE team_members (
        team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
        employee_id INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
        PRIMARY KEY (team_id, employee_id)
    );

    CREATE INDEX idx_team_members_employee ON team_members(employee_id);

    CREATE TABLE shift_templates (
        code TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        crosses_midnight INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE master_shifts (
        id TEXT PRIMARY KEY,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        team_id INTEGER REFERENCES teams(id) ON DELETE SET NULL,
        start_at TEXT NOT NULL,
        end_at TEXT NOT NULL,
        activity_id TEXT,
        note TEXT
    );

    CREATE INDEX idx_master_shifts_employee_start ON master_shifts(employee_id, start_at);

    CREATE TABLE attendance_segments (
        id TEXT PRIMARY KEY,
        shift_id TEXT REFERENCES master_shifts(id) ON DELETE CASCADE,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        activity_id TEXT,
        start_at TEXT NOT NULL,
        end_at TEXT NOT NULL,
        presence_hours REAL NOT NULL,
        worked_hours REAL NOT NULL,
        category TEXT NOT NULL DEFAULT 'on-site',
        note TEXT
    );

    CREATE INDEX idx_segments_shift ON attendance_segments(shift_id);
    CREATE INDEX idx_segments_employee_start ON attendance_segments(employee_id, start_at);

    INSERT INTO shift_templates (code, name, start_time, end_time, crosses_midnight) VALUES
        ('DAY', 'Day shift', '08:00', '18:00', 0),
        ('MORNING', 'Morning shift', '08:00', '14:00', 0),
        ('NIGHT', 'Night shift', '20:00', '06:00', 1);
";

const MIGRATIONS: &[&str] = &[SCHEMA_V1];

impl Store {
    /// Applies every pending migration and reports the version change.
    ///
    /// Fails without touching the schema when the stored version is newer
    /// than this build knows about.
    #[expect(
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        reason = "migration count is a small constant"
    )]
    pub fn migrate(&mut self) -> Result<MigrationReport, StoreError> {
        let from_version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let supported = MIGRATIONS.len() as i64;
        if from_version > supported {
            return Err(StoreError::SchemaVersion {
                found: from_version,
                supported,
            });
        }
        if from_version == supported {
            return Ok(MigrationReport {
                from_version,
                to_version: supported,
            });
        }

        let tx = self.conn.transaction()?;
        for (index, sql) in MIGRATIONS.iter().enumerate().skip(from_version as usize) {
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", index as i64 + 1)?;
        }
        tx.commit()?;

        tracing::debug!(from_version, to_version = supported, "schema migrated");
        Ok(MigrationReport {
            from_version,
            to_version: supported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_from_empty_applies_full_chain() {
        let mut store = Store::open_in_memory().unwrap();
        let report = store.migrate().unwrap();
        assert_eq!(report.from_version, 0);
        assert!(report.changed());
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store.migrate().unwrap();
        let second = store.migrate().unwrap();
        assert_eq!(first.to_version, second.from_version);
        assert!(!second.changed());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .conn
            .pragma_update(None, "user_version", 99)
            .unwrap();
        assert!(matches!(
            store.migrate(),
            Err(StoreError::SchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn schema_matches_data_model() {
        let mut store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();

        let tables: Vec<String> = {
            let mut stmt = store
                .conn
                .prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table'
                     AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .unwrap();
            let rows = stmt.query_map([], |row| row.get(0)).unwrap();
            rows.map(Result::unwrap).collect()
        };
        assert_eq!(
            tables,
            vec![
                "attendance_segments",
                "employees",
                "master_shifts",
                "shift_templates",
                "team_members",
                "teams",
            ]
        );

        let segment_fk: (String, String) = store
            .conn
            .query_row(
                "SELECT \"table\", on_delete FROM pragma_foreign_key_list('attendance_segments')
                 WHERE \"from\" = 'shift_id'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(segment_fk, ("master_shifts".to_string(), "CASCADE".to_string()));

        let shift_team_fk: String = store
            .conn
            .query_row(
                "SELECT on_delete FROM pragma_foreign_key_list('master_shifts')
                 WHERE \"from\" = 'team_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(shift_team_fk, "SET NULL");
    }
}
