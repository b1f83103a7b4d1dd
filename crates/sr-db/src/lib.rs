//! Ledger store for the shift roster.
//!
//! Owns the persistent schema (employees, teams, team membership, shift
//! templates, master shifts, attendance segments) and all read/write
//! primitives over it, using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Store`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The roster assumes a single logical writer; callers that share a store
//! across threads must serialize access externally (e.g., `Mutex<Store>`).
//!
//! # Transactions
//!
//! Multi-row operations go through [`Store::transaction`], which hands the
//! closure a [`Ledger`] view over one SQLite transaction: commit on `Ok`,
//! rollback on any `Err`. Display-only reads can use the untransacted view
//! from [`Store::read`].
//!
//! # Timestamp Format
//!
//! Timestamps are stored as TEXT in `%Y-%m-%dT%H:%M:%S` form (local wall
//! clock, no zone). The fixed width keeps lexicographic order equal to
//! chronological order, so range and overlap predicates compare strings
//! directly.

mod migrations;
mod projections;
mod shifts;

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sr_core::ShiftTemplate;

pub use migrations::MigrationReport;
pub use projections::{CalendarRow, DayTotalsRow};
pub use shifts::{MasterShiftRecord, SegmentRecord};

/// Default category tag for attendance segments.
pub const DEFAULT_SEGMENT_CATEGORY: &str = "on-site";

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("storage failure: {0}")]
    Storage(rusqlite::Error),

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(rusqlite::Error),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A stored timestamp could not be parsed back.
    #[error("invalid stored timestamp: {value}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The database schema is newer than this build supports.
    #[error("unsupported schema version {found} (supported up to {supported})")]
    SchemaVersion { found: i64, supported: i64 },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(err)
            }
            _ => Self::Storage(err),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety and transaction
/// scoping. Opening a store does not touch the schema; run
/// [`Store::migrate`] once at initialization.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens a store at the given path, creating the file if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Runs `f` against a [`Ledger`] view inside one transaction.
    ///
    /// Commits when `f` returns `Ok`; any `Err` rolls back every write made
    /// inside the closure.
    pub fn transaction<T, E>(&mut self, f: impl FnOnce(&Ledger<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction()
            .map_err(StoreError::from)
            .map_err(E::from)?;
        let value = f(&Ledger::new(&tx))?;
        tx.commit().map_err(StoreError::from).map_err(E::from)?;
        Ok(value)
    }

    /// Untransacted view for display-only reads.
    #[must_use]
    pub fn read(&self) -> Ledger<'_> {
        Ledger::new(&self.conn)
    }
}

/// Borrowed view over a connection exposing the ledger primitives.
///
/// Obtained from [`Store::read`] or inside [`Store::transaction`]; the same
/// methods work in both contexts.
pub struct Ledger<'a> {
    conn: &'a Connection,
}

/// An employee row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub active: bool,
}

/// A team row. Leadership is independent of membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: i64,
    pub name: String,
    pub leader_id: Option<i64>,
}

impl<'a> Ledger<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ---- employees ----

    /// Registers a new employee and returns its id.
    pub fn create_employee(
        &self,
        first_name: &str,
        last_name: &str,
        role: &str,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO employees (first_name, last_name, role, active) VALUES (?, ?, ?, 1)",
            params![first_name, last_name, role],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_employee(&self, id: i64) -> Result<EmployeeRecord, StoreError> {
        self.conn
            .query_row(
                "SELECT id, first_name, last_name, role, active FROM employees WHERE id = ?",
                [id],
                |row| {
                    Ok(EmployeeRecord {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        role: row.get(3)?,
                        active: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "employee",
                id: id.to_string(),
            })
    }

    pub fn rename_employee(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE employees SET first_name = ?, last_name = ? WHERE id = ?",
            params![first_name, last_name, id],
        )?;
        require_row(changed, "employee", id)
    }

    pub fn set_employee_role(&self, id: i64, role: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE employees SET role = ? WHERE id = ?",
            params![role, id],
        )?;
        require_row(changed, "employee", id)
    }

    /// Toggles the active flag. Employees are never hard-deleted.
    pub fn set_employee_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE employees SET active = ? WHERE id = ?",
            params![active, id],
        )?;
        require_row(changed, "employee", id)
    }

    /// Lists employees ordered by last then first name.
    pub fn list_employees(&self, active_only: bool) -> Result<Vec<EmployeeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, first_name, last_name, role, active
            FROM employees
            WHERE active = 1 OR ?1 = 0
            ORDER BY last_name ASC, first_name ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([active_only], |row| {
            Ok(EmployeeRecord {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                role: row.get(3)?,
                active: row.get(4)?,
            })
        })?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?);
        }
        Ok(employees)
    }

    // ---- teams ----

    /// Creates a team, auto-adding the leader as a member when present.
    pub fn create_team(&self, name: &str, leader_id: Option<i64>) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO teams (name, leader_id) VALUES (?, ?)",
            params![name, leader_id],
        )?;
        let team_id = self.conn.last_insert_rowid();
        if let Some(leader) = leader_id {
            self.conn.execute(
                "INSERT OR IGNORE INTO team_members (team_id, employee_id) VALUES (?, ?)",
                params![team_id, leader],
            )?;
        }
        Ok(team_id)
    }

    pub fn get_team(&self, id: i64) -> Result<TeamRecord, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, leader_id FROM teams WHERE id = ?",
                [id],
                |row| {
                    Ok(TeamRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        leader_id: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "team",
                id: id.to_string(),
            })
    }

    pub fn update_team_details(
        &self,
        id: i64,
        name: &str,
        leader_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE teams SET name = ?, leader_id = ? WHERE id = ?",
            params![name, leader_id, id],
        )?;
        require_row(changed, "team", id)
    }

    /// Replaces the full membership set. Duplicate ids collapse; calling with
    /// the same set twice is a no-op.
    pub fn replace_team_members(&self, team_id: i64, member_ids: &[i64]) -> Result<(), StoreError> {
        self.get_team(team_id)?;
        self.conn
            .execute("DELETE FROM team_members WHERE team_id = ?", [team_id])?;
        let mut stmt = self
            .conn
            .prepare("INSERT OR IGNORE INTO team_members (team_id, employee_id) VALUES (?, ?)")?;
        for employee_id in member_ids {
            stmt.execute(params![team_id, employee_id])?;
        }
        Ok(())
    }

    /// Deletes a team; membership rows cascade. Historized team references on
    /// master shifts are set to NULL by the schema, past shifts keep their
    /// recorded intervals.
    pub fn delete_team(&self, id: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM teams WHERE id = ?", [id])?;
        require_row(changed, "team", id)
    }

    pub fn team_members(&self, team_id: i64) -> Result<Vec<i64>, StoreError> {
        self.get_team(team_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT employee_id FROM team_members WHERE team_id = ? ORDER BY employee_id ASC",
        )?;
        let rows = stmt.query_map([team_id], |row| row.get(0))?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    pub fn list_teams(&self) -> Result<Vec<TeamRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, leader_id FROM teams ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(TeamRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                leader_id: row.get(2)?,
            })
        })?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    /// Moves an employee's live membership to exactly one team.
    ///
    /// Removes the employee from every other team and adds them to
    /// `team_id`. Does not touch historized team references on past shifts.
    pub fn reassign_employee_team(&self, employee_id: i64, team_id: i64) -> Result<(), StoreError> {
        self.get_team(team_id)?;
        self.conn.execute(
            "DELETE FROM team_members WHERE employee_id = ?",
            [employee_id],
        )?;
        self.conn.execute(
            "INSERT INTO team_members (team_id, employee_id) VALUES (?, ?)",
            params![team_id, employee_id],
        )?;
        Ok(())
    }

    // ---- shift templates ----

    pub fn get_template(&self, code: &str) -> Result<ShiftTemplate, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT code, name, start_time, end_time, crosses_midnight
                 FROM shift_templates WHERE code = ?",
                [code],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "shift template",
                id: code.to_string(),
            })?;
        template_from_row(row)
    }

    pub fn list_templates(&self) -> Result<Vec<ShiftTemplate>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT code, name, start_time, end_time, crosses_midnight
             FROM shift_templates ORDER BY code ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;
        let mut templates = Vec::new();
        for row in rows {
            templates.push(template_from_row(row?)?);
        }
        Ok(templates)
    }
}

fn template_from_row(
    (code, name, start_time, end_time, crosses_midnight): (String, String, String, String, bool),
) -> Result<ShiftTemplate, StoreError> {
    Ok(ShiftTemplate {
        code,
        name,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        crosses_midnight,
    })
}

fn require_row(changed: usize, entity: &'static str, id: i64) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIME_FORMAT: &str = "%H:%M";

pub(crate) fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(value: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| {
        StoreError::TimestampParse {
            value: value.to_string(),
            source,
        }
    })
}

pub(crate) fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn parse_time(value: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|source| StoreError::TimestampParse {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
pub(crate) fn test_store() -> Store {
    let mut store = Store::open_in_memory().expect("open in-memory store");
    store.migrate().expect("migrate test store");
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_store() {
        assert!(Store::open_in_memory().is_ok());
    }

    #[test]
    fn open_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(&dir.path().join("roster.db")).unwrap();
        store.migrate().unwrap();
        let ledger = store.read();
        assert!(ledger.list_employees(false).unwrap().is_empty());
    }

    #[test]
    fn create_and_fetch_employee() {
        let store = test_store();
        let ledger = store.read();
        let id = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();

        let employee = ledger.get_employee(id).unwrap();
        assert_eq!(employee.first_name, "Ada");
        assert_eq!(employee.last_name, "Lovelace");
        assert_eq!(employee.role, "operator");
        assert!(employee.active);
    }

    #[test]
    fn deactivation_hides_from_active_listing() {
        let store = test_store();
        let ledger = store.read();
        let ada = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let grace = ledger.create_employee("Grace", "Hopper", "lead").unwrap();

        ledger.set_employee_active(ada, false).unwrap();

        let active = ledger.list_employees(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, grace);

        let all = ledger.list_employees(false).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn employee_updates_require_existing_row() {
        let store = test_store();
        let ledger = store.read();
        assert!(matches!(
            ledger.set_employee_role(99, "lead"),
            Err(StoreError::NotFound { entity: "employee", .. })
        ));
        assert!(ledger.get_employee(99).is_err());
    }

    #[test]
    fn team_leader_is_auto_added_as_member() {
        let store = test_store();
        let ledger = store.read();
        let leader = ledger.create_employee("Grace", "Hopper", "lead").unwrap();
        let team = ledger.create_team("Night crew", Some(leader)).unwrap();

        assert_eq!(ledger.team_members(team).unwrap(), vec![leader]);
        assert_eq!(ledger.get_team(team).unwrap().leader_id, Some(leader));
    }

    #[test]
    fn replace_members_collapses_duplicates() {
        let store = test_store();
        let ledger = store.read();
        let a = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let b = ledger.create_employee("Grace", "Hopper", "operator").unwrap();
        let team = ledger.create_team("Day crew", None).unwrap();

        ledger.replace_team_members(team, &[a, a, b]).unwrap();
        assert_eq!(ledger.team_members(team).unwrap(), vec![a, b]);

        // Full replace, not a merge.
        ledger.replace_team_members(team, &[b]).unwrap();
        assert_eq!(ledger.team_members(team).unwrap(), vec![b]);
    }

    #[test]
    fn duplicate_team_name_is_a_constraint_violation() {
        let store = test_store();
        let ledger = store.read();
        ledger.create_team("Day crew", None).unwrap();
        assert!(matches!(
            ledger.create_team("Day crew", None),
            Err(StoreError::Constraint(_))
        ));
    }

    #[test]
    fn delete_team_cascades_membership() {
        let store = test_store();
        let ledger = store.read();
        let a = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let team = ledger.create_team("Day crew", None).unwrap();
        ledger.replace_team_members(team, &[a]).unwrap();

        ledger.delete_team(team).unwrap();

        assert!(matches!(
            ledger.team_members(team),
            Err(StoreError::NotFound { entity: "team", .. })
        ));
        let orphans: i64 = store
            .read()
            .conn
            .query_row("SELECT COUNT(*) FROM team_members", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn reassign_moves_employee_between_teams() {
        let store = test_store();
        let ledger = store.read();
        let a = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let day = ledger.create_team("Day crew", None).unwrap();
        let night = ledger.create_team("Night crew", None).unwrap();
        ledger.replace_team_members(day, &[a]).unwrap();

        ledger.reassign_employee_team(a, night).unwrap();

        assert!(ledger.team_members(day).unwrap().is_empty());
        assert_eq!(ledger.team_members(night).unwrap(), vec![a]);
    }

    #[test]
    fn seeded_templates_are_readable() {
        let store = test_store();
        let ledger = store.read();
        let codes: Vec<String> = ledger
            .list_templates()
            .unwrap()
            .into_iter()
            .map(|t| t.code)
            .collect();
        assert_eq!(codes, vec!["DAY", "MORNING", "NIGHT"]);

        let night = ledger.get_template("NIGHT").unwrap();
        assert!(night.crosses_midnight);
        assert_eq!(night.start_time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(night.end_time, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn unknown_template_is_not_found() {
        let store = test_store();
        assert!(matches!(
            store.read().get_template("SWING"),
            Err(StoreError::NotFound { entity: "shift template", .. })
        ));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut store = test_store();
        let result: Result<(), StoreError> = store.transaction(|ledger| {
            ledger.create_employee("Ada", "Lovelace", "operator")?;
            Err(StoreError::NotFound {
                entity: "employee",
                id: "sentinel".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(store.read().list_employees(false).unwrap().is_empty());
    }

    #[test]
    fn transaction_commits_on_success() {
        let mut store = test_store();
        let id: i64 = store
            .transaction(|ledger| ledger.create_employee("Ada", "Lovelace", "operator"))
            .unwrap();
        assert_eq!(store.read().get_employee(id).unwrap().id, id);
    }

    #[test]
    fn timestamps_roundtrip_through_text() {
        let value = chrono::NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        let text = format_timestamp(value);
        assert_eq!(text, "2024-03-10T16:30:00");
        assert_eq!(parse_timestamp(&text).unwrap(), value);
    }
}
