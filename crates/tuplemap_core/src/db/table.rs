//! Table/relation transfer between SQLite and `MemoryRelation`.
//!
//! # Invariants
//! - `store_relation` replaces the table content in one transaction.
//! - Headers without attributes are rejected before any SQL runs.
//! - Booleans are stored as `0`/`1` integers and load back as integers.

use super::{DbError, DbResult};
use crate::engine::{MemoryRelation, RelationAlgebra};
use crate::model::header::{AttributeKind, Header};
use crate::model::tuple::Tuple;
use crate::model::value::Value;
use log::{error, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

/// Loads the header's columns of `table` into an unordered relation.
pub fn load_relation(
    conn: &Connection,
    table: &str,
    header: &Header,
) -> DbResult<MemoryRelation> {
    let started_at = Instant::now();
    let sql = format!(
        "SELECT {} FROM {};",
        column_list(header)?,
        quote_identifier(table)?
    );

    let result = read_rows(conn, &sql, header);

    match &result {
        Ok(relation) => info!(
            "event=relation_load module=db status=ok table={} rows={} duration_ms={}",
            table,
            relation.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=relation_load module=db status=error table={} duration_ms={} error={}",
            table,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn read_rows(conn: &Connection, sql: &str, header: &Header) -> DbResult<MemoryRelation> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut tuples = Vec::new();
    while let Some(row) = rows.next()? {
        let tuple = header
            .attributes()
            .iter()
            .enumerate()
            .map(|(index, attribute)| {
                from_sql(&attribute.name, row.get::<_, SqlValue>(index)?)
            })
            .collect::<DbResult<Tuple>>()?;
        tuples.push(tuple);
    }
    Ok(MemoryRelation::new(header.clone(), tuples)?)
}

/// Replaces every row of `table` with the tuples of `relation`.
///
/// Returns the number of rows written.
pub fn store_relation(
    conn: &mut Connection,
    table: &str,
    relation: &MemoryRelation,
) -> DbResult<usize> {
    let started_at = Instant::now();
    let result = write_rows(conn, table, relation);

    match &result {
        Ok(written) => info!(
            "event=relation_store module=db status=ok table={} rows={} duration_ms={}",
            table,
            written,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=relation_store module=db status=error table={} duration_ms={} error={}",
            table,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn write_rows(conn: &mut Connection, table: &str, relation: &MemoryRelation) -> DbResult<usize> {
    let header = relation.header();
    let table_sql = quote_identifier(table)?;
    let placeholders = vec!["?"; header.len()].join(", ");
    let insert_sql = format!(
        "INSERT INTO {table_sql} ({}) VALUES ({placeholders});",
        column_list(header)?
    );

    let tx = conn.transaction()?;
    tx.execute(&format!("DELETE FROM {table_sql};"), [])?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for tuple in relation.tuples() {
            let values = header
                .attributes()
                .iter()
                .zip(tuple.values())
                .map(|(attribute, value)| to_sql(&attribute.name, value))
                .collect::<DbResult<Vec<_>>>()?;
            written += stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(written)
}

fn column_list(header: &Header) -> DbResult<String> {
    if header.is_empty() {
        return Err(DbError::EmptyHeader);
    }
    let columns = header
        .attributes()
        .iter()
        .map(|attribute| match attribute.kind {
            AttributeKind::Scalar => quote_identifier(&attribute.name),
            _ => Err(DbError::UnsupportedAttribute(attribute.name.clone())),
        })
        .collect::<DbResult<Vec<_>>>()?;
    Ok(columns.join(", "))
}

fn quote_identifier(name: &str) -> DbResult<String> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

fn from_sql(attribute: &str, value: SqlValue) -> DbResult<Value> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(value) => Ok(Value::Integer(value)),
        SqlValue::Text(value) => Ok(Value::Text(value)),
        SqlValue::Real(_) => Err(DbError::UnsupportedValue {
            attribute: attribute.to_string(),
            kind: "real",
        }),
        SqlValue::Blob(_) => Err(DbError::UnsupportedValue {
            attribute: attribute.to_string(),
            kind: "blob",
        }),
    }
}

fn to_sql(attribute: &str, value: &Value) -> DbResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(value) => Ok(SqlValue::Integer(i64::from(*value))),
        Value::Integer(value) => Ok(SqlValue::Integer(*value)),
        Value::Text(value) => Ok(SqlValue::Text(value.clone())),
        Value::Tuple(_) | Value::Relation(_) => Err(DbError::UnsupportedValue {
            attribute: attribute.to_string(),
            kind: value.kind_name(),
        }),
    }
}
