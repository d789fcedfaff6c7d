use std::collections::HashSet;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::models::{Roster, MANUAL_ENTRY};

pub const DEFAULT_MANUAL_REASON: &str = "Not specified";
pub const DEFAULT_BULK_REASON: &str = "Bulk entry";

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub date: NaiveDate,
    pub student_id: String,
    pub name: Option<String>,
    pub time: Option<String>,
    pub mode: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub student_id: String,
    pub name: String,
    pub time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Inserted,
    Overwritten,
    KeptExisting,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("CS-101", "Avery Lee"),
        ("CS-102", "Jules Moreno"),
        ("CS-103", "Kiara Patel"),
        ("CS-104", "Noor Haddad"),
    ];

    for (student_id, name) in &students {
        register_student(pool, student_id, name).await?;
    }

    let records = vec![
        ("2026-02-02", "CS-101", "08:52", "Fingerprint", None),
        ("2026-02-02", "CS-102", "09:05", "Fingerprint", None),
        ("2026-02-02", "CS-103", "09:31", "Manual Entry", Some("Scanner offline")),
        ("2026-02-03", "CS-101", "08:49", "Fingerprint", None),
        ("2026-02-03", "CS-103", "08:58", "Fingerprint", None),
        ("2026-02-04", "CS-101", "08:55", "Fingerprint", None),
        ("2026-02-04", "CS-102", "09:12", "Manual Entry", Some("Arrived with pass")),
        ("2026-02-04", "CS-103", "09:01", "Fingerprint", None),
    ];

    for (date, student_id, time, mode, reason) in records {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").context("invalid seed date")?;
        let name = students
            .iter()
            .find(|(id, _)| *id == student_id)
            .map(|(_, name)| *name);

        sqlx::query(
            r#"
            INSERT INTO attendance_ledger.attendance
            (date, student_id, name, time, mode, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (date, student_id) DO NOTHING
            "#,
        )
        .bind(date)
        .bind(student_id)
        .bind(name)
        .bind(time)
        .bind(mode)
        .bind(reason)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn register_student(pool: &PgPool, student_id: &str, name: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_ledger.students (student_id, name)
        VALUES ($1, $2)
        ON CONFLICT (student_id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(student_id)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_records(pool: &PgPool) -> anyhow::Result<Vec<StoredRecord>> {
    let rows = sqlx::query(
        "SELECT date, student_id, name, time, mode, reason \
         FROM attendance_ledger.attendance \
         ORDER BY date, recorded_at, student_id",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(StoredRecord {
            date: row.get("date"),
            student_id: row.get("student_id"),
            name: row.get("name"),
            time: row.get("time"),
            mode: row.get("mode"),
            reason: row.get("reason"),
        });
    }
    Ok(records)
}

pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<Value> {
    let records = fetch_records(pool).await?;
    Ok(snapshot_from_records(&records))
}

pub fn snapshot_from_records(records: &[StoredRecord]) -> Value {
    let mut dates = Map::new();
    for record in records {
        let partition = dates
            .entry(record.date.format("%Y-%m-%d").to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(partition) = partition else {
            continue;
        };

        let mut details = Map::new();
        for (key, value) in [
            ("name", &record.name),
            ("time", &record.time),
            ("mode", &record.mode),
            ("reason", &record.reason),
        ] {
            if let Some(value) = value {
                details.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        partition.insert(record.student_id.clone(), Value::Object(details));
    }
    Value::Object(dates)
}

pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Roster> {
    let rows = sqlx::query("SELECT student_id, name FROM attendance_ledger.students")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.get("student_id"), row.get("name")))
        .collect())
}

const MANUAL_KEEP_SQL: &str = r#"
    INSERT INTO attendance_ledger.attendance
    (date, student_id, name, time, mode, reason, recorded_at)
    VALUES ($1, $2, $3, $4, $5, $6, now())
    ON CONFLICT (date, student_id) DO NOTHING
    RETURNING (xmax = 0) AS inserted
"#;

const MANUAL_OVERWRITE_SQL: &str = r#"
    INSERT INTO attendance_ledger.attendance
    (date, student_id, name, time, mode, reason, recorded_at)
    VALUES ($1, $2, $3, $4, $5, $6, now())
    ON CONFLICT (date, student_id) DO UPDATE
    SET name = EXCLUDED.name, time = EXCLUDED.time, mode = EXCLUDED.mode,
        reason = EXCLUDED.reason, recorded_at = EXCLUDED.recorded_at
    RETURNING (xmax = 0) AS inserted
"#;

fn manual_insert_sql(overwrite: bool) -> &'static str {
    if overwrite {
        MANUAL_OVERWRITE_SQL
    } else {
        MANUAL_KEEP_SQL
    }
}

// No returned row means the conflict was left alone.
fn mark_outcome(inserted: Option<bool>) -> MarkOutcome {
    match inserted {
        None => MarkOutcome::KeptExisting,
        Some(true) => MarkOutcome::Inserted,
        Some(false) => MarkOutcome::Overwritten,
    }
}

pub async fn mark_manual(
    pool: &PgPool,
    entry: &ManualEntry,
    overwrite: bool,
) -> anyhow::Result<MarkOutcome> {
    let reason = entry
        .reason
        .clone()
        .unwrap_or_else(|| DEFAULT_MANUAL_REASON.to_string());
    upsert_manual(
        pool,
        entry.date,
        &entry.student_id,
        &entry.name,
        &entry.time,
        &reason,
        overwrite,
    )
    .await
}

async fn upsert_manual<'e, E>(
    executor: E,
    date: NaiveDate,
    student_id: &str,
    name: &str,
    time: &str,
    reason: &str,
    overwrite: bool,
) -> anyhow::Result<MarkOutcome>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query(manual_insert_sql(overwrite))
        .bind(date)
        .bind(student_id)
        .bind(name)
        .bind(time)
        .bind(MANUAL_ENTRY)
        .bind(reason)
        .fetch_optional(executor)
        .await?;

    Ok(mark_outcome(row.map(|row| row.get::<bool, _>("inserted"))))
}

pub fn dedupe_students(students: &[(String, String)]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    students
        .iter()
        .filter(|(id, _)| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

pub async fn bulk_mark(
    pool: &PgPool,
    date: NaiveDate,
    time: &str,
    reason: Option<&str>,
    students: &[(String, String)],
) -> anyhow::Result<usize> {
    let students = dedupe_students(students);
    let reason = reason.unwrap_or(DEFAULT_BULK_REASON);
    let mut tx = pool.begin().await?;

    for (student_id, name) in &students {
        upsert_manual(&mut *tx, date, student_id, name, time, reason, true).await?;
    }

    tx.commit().await?;
    Ok(students.len())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        date: NaiveDate,
        student_id: String,
        name: String,
        time: Option<String>,
        mode: String,
        reason: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad CSV record {}", line + 1))?;
        register_student(pool, &row.student_id, &row.name).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO attendance_ledger.attendance
            (date, student_id, name, time, mode, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (date, student_id) DO NOTHING
            "#,
        )
        .bind(row.date)
        .bind(&row.student_id)
        .bind(&row.name)
        .bind(row.time.filter(|t| !t.is_empty()))
        .bind(&row.mode)
        .bind(row.reason.filter(|r| !r.is_empty()))
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            tracing::debug!(date = %row.date, student_id = %row.student_id, "import skipped existing record");
        }
    }

    Ok(inserted)
}
