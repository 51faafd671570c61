// src/models/record.rs

//! Explicit record-to-table mapping.
//!
//! Every entity kind owns a static [`TableSchema`] listing its columns in
//! storage order. [`Record::values`] and [`Record::from_values`] convert
//! between entities and rows using that order, so stores never need to
//! inspect entity fields themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Class, Department, Section};

/// The three persisted entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Department,
    Class,
    Section,
}

impl RecordKind {
    /// All kinds, parents first.
    pub const ALL: [RecordKind; 3] = [RecordKind::Department, RecordKind::Class, RecordKind::Section];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            RecordKind::Department => &DEPARTMENTS,
            RecordKind::Class => &CLASSES,
            RecordKind::Section => &SECTIONS,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Department => "department",
            RecordKind::Class => "class",
            RecordKind::Section => "section",
        };
        f.write_str(name)
    }
}

impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "department" | "departments" | "dept" => Ok(RecordKind::Department),
            "class" | "classes" => Ok(RecordKind::Class),
            "section" | "sections" | "sect" => Ok(RecordKind::Section),
            other => Err(AppError::validation(format!("unknown record kind '{other}'"))),
        }
    }
}

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

/// A single column definition.
#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    /// Parent-key columns get a plain index; they are not enforced foreign keys.
    pub indexed: bool,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        sql_type: SqlType::Text,
        primary_key: false,
        indexed: false,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        sql_type: SqlType::Integer,
        primary_key: false,
        indexed: false,
    }
}

const fn key(name: &'static str) -> Column {
    Column {
        name,
        sql_type: SqlType::Text,
        primary_key: true,
        indexed: false,
    }
}

const fn parent(name: &'static str) -> Column {
    Column {
        name,
        sql_type: SqlType::Text,
        primary_key: false,
        indexed: true,
    }
}

/// Table name plus ordered columns for one entity kind.
#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

static DEPARTMENTS: TableSchema = TableSchema {
    table: "departments",
    columns: &[key("abbreviation"), text("name"), text("link")],
};

static CLASSES: TableSchema = TableSchema {
    table: "classes",
    columns: &[
        key("key"),
        parent("department"),
        text("abbreviation"),
        text("code"),
        text("title"),
        integer("start_offset"),
        integer("end_offset"),
    ],
};

static SECTIONS: TableSchema = TableSchema {
    table: "sections",
    columns: &[
        key("sln"),
        parent("class_key"),
        text("restriction"),
        text("section"),
        text("credit"),
        text("meeting_times"),
        text("instructor"),
        text("status"),
        integer("taken_seats"),
        integer("total_seats"),
        text("grades"),
        text("fee"),
        text("other"),
        text("notes"),
    ],
};

impl TableSchema {
    fn position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| AppError::schema(format!("{} has no column '{name}'", self.table)))
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {} NOT NULL", c.name, c.sql_type.as_sql());
                if c.primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                def
            })
            .collect();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.table, columns.join(", "))
    }

    pub fn create_index_sql(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.indexed)
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table} ({col})",
                    table = self.table,
                    col = c.name
                )
            })
            .collect()
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let placeholders = vec!["?"; names.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// SELECT statement with `?` placeholders for each filter condition, in order.
    pub fn select_sql(&self, filter: &Filter) -> Result<String> {
        filter.validate(self)?;

        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let mut sql = format!("SELECT {} FROM {}", names.join(", "), self.table);

        if !filter.conditions.is_empty() {
            let clauses: Vec<String> = filter
                .conditions
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if let Some(column) = &filter.order_by {
            sql.push_str(&format!(" ORDER BY {column}"));
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(sql)
    }

    /// Parse a raw string into a value of the column's type.
    pub fn parse_value(&self, column: &str, raw: &str) -> Result<Value> {
        let col = &self.columns[self.position(column)?];
        match col.sql_type {
            SqlType::Text => Ok(Value::Text(raw.to_string())),
            SqlType::Integer => raw.trim().parse::<i64>().map(Value::Integer).map_err(|e| {
                AppError::validation(format!("{}.{column} expects an integer: {e}", self.table))
            }),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

/// Equality conditions, ordering, and limit over named columns.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub conditions: Vec<(String, Value)>,
    pub order_by: Option<String>,
    pub limit: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject columns the schema does not define.
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        for (column, _) in &self.conditions {
            schema.position(column)?;
        }
        if let Some(column) = &self.order_by {
            schema.position(column)?;
        }
        Ok(())
    }

    /// Evaluate the conditions against an in-memory record.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| record.get(column).as_ref() == Some(value))
    }

    /// Apply ordering and limit to already-matched records.
    pub fn finish(&self, mut records: Vec<Record>) -> Vec<Record> {
        if let Some(column) = &self.order_by {
            records.sort_by(|a, b| a.get(column).cmp(&b.get(column)));
        }
        if let Some(limit) = self.limit {
            records.truncate(limit as usize);
        }
        records
    }
}

/// Any persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Department(Department),
    Class(Class),
    Section(Section),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Department(_) => RecordKind::Department,
            Record::Class(_) => RecordKind::Class,
            Record::Section(_) => RecordKind::Section,
        }
    }

    /// Primary-key value.
    pub fn key(&self) -> String {
        match self {
            Record::Department(d) => d.key().to_string(),
            Record::Class(c) => c.key(),
            Record::Section(s) => s.sln.clone(),
        }
    }

    /// Column values in schema order.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Record::Department(d) => vec![
                d.abbreviation.as_str().into(),
                d.name.as_str().into(),
                d.link.as_str().into(),
            ],
            Record::Class(c) => vec![
                c.key().into(),
                c.department.as_str().into(),
                c.abbreviation.as_str().into(),
                c.code.as_str().into(),
                c.title.as_str().into(),
                offset_value(c.start),
                offset_value(c.end),
            ],
            Record::Section(s) => vec![
                s.sln.as_str().into(),
                s.class_key.as_str().into(),
                s.restriction.as_str().into(),
                s.section.as_str().into(),
                s.credit.as_str().into(),
                s.meeting_times.as_str().into(),
                s.instructor.as_str().into(),
                s.status.as_str().into(),
                s.taken_seats.into(),
                s.total_seats.into(),
                s.grades.as_str().into(),
                s.fee.as_str().into(),
                s.other.as_str().into(),
                s.notes.as_str().into(),
            ],
        }
    }

    /// Value of a named column, if the schema has it.
    pub fn get(&self, column: &str) -> Option<Value> {
        let index = self.kind().schema().position(column).ok()?;
        self.values().into_iter().nth(index)
    }

    /// Rebuild a record from column values in schema order.
    pub fn from_values(kind: RecordKind, values: Vec<Value>) -> Result<Self> {
        let schema = kind.schema();
        if values.len() != schema.columns.len() {
            return Err(AppError::schema(format!(
                "{} expects {} values, got {}",
                schema.table,
                schema.columns.len(),
                values.len()
            )));
        }
        let mut row = Row {
            table: schema.table,
            values: values.into_iter(),
        };

        let record = match kind {
            RecordKind::Department => Record::Department(Department {
                abbreviation: row.text()?,
                name: row.text()?,
                link: row.text()?,
            }),
            RecordKind::Class => {
                let _key = row.text()?;
                Record::Class(Class {
                    department: row.text()?,
                    abbreviation: row.text()?,
                    code: row.text()?,
                    title: row.text()?,
                    start: row.offset()?,
                    end: row.offset()?,
                })
            }
            RecordKind::Section => Record::Section(Section {
                sln: row.text()?,
                class_key: row.text()?,
                restriction: row.text()?,
                section: row.text()?,
                credit: row.text()?,
                meeting_times: row.text()?,
                instructor: row.text()?,
                status: row.text()?,
                taken_seats: row.integer()?,
                total_seats: row.integer()?,
                grades: row.text()?,
                fee: row.text()?,
                other: row.text()?,
                notes: row.text()?,
            }),
        };
        Ok(record)
    }
}

impl From<Department> for Record {
    fn from(value: Department) -> Self {
        Record::Department(value)
    }
}

impl From<Class> for Record {
    fn from(value: Class) -> Self {
        Record::Class(value)
    }
}

impl From<Section> for Record {
    fn from(value: Section) -> Self {
        Record::Section(value)
    }
}

fn offset_value(offset: usize) -> Value {
    Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX))
}

/// Sequential reader over a row's values.
struct Row {
    table: &'static str,
    values: std::vec::IntoIter<Value>,
}

impl Row {
    fn text(&mut self) -> Result<String> {
        match self.values.next() {
            Some(Value::Text(s)) => Ok(s),
            other => Err(AppError::schema(format!(
                "{}: expected text, got {other:?}",
                self.table
            ))),
        }
    }

    fn integer(&mut self) -> Result<i64> {
        match self.values.next() {
            Some(Value::Integer(i)) => Ok(i),
            other => Err(AppError::schema(format!(
                "{}: expected integer, got {other:?}",
                self.table
            ))),
        }
    }

    fn offset(&mut self) -> Result<usize> {
        let value = self.integer()?;
        usize::try_from(value)
            .map_err(|_| AppError::schema(format!("{}: negative offset {value}", self.table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class() -> Class {
        Class {
            department: "CSE".to_string(),
            abbreviation: "cse".to_string(),
            code: "142".to_string(),
            title: "COMPUTER PRGRMNG I".to_string(),
            start: 10,
            end: 400,
        }
    }

    #[test]
    fn test_create_table_sql() {
        let sql = RecordKind::Department.schema().create_table_sql();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS departments (abbreviation TEXT NOT NULL PRIMARY KEY, \
             name TEXT NOT NULL, link TEXT NOT NULL)"
        );
    }

    #[test]
    fn test_parent_columns_are_indexed() {
        let indexes = RecordKind::Section.schema().create_index_sql();
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].contains("sections (class_key)"));
        assert!(RecordKind::Department.schema().create_index_sql().is_empty());
    }

    #[test]
    fn test_insert_sql_has_one_placeholder_per_column() {
        let schema = RecordKind::Section.schema();
        let sql = schema.insert_sql();
        assert_eq!(sql.matches('?').count(), schema.columns.len());
    }

    #[test]
    fn test_select_sql_with_filter() {
        let filter = Filter::new()
            .eq("department", "CSE")
            .order_by("code")
            .limit(5);
        let sql = RecordKind::Class.schema().select_sql(&filter).unwrap();
        assert!(sql.ends_with("FROM classes WHERE department = ? ORDER BY code LIMIT 5"));
    }

    #[test]
    fn test_select_sql_rejects_unknown_column() {
        let filter = Filter::new().eq("nope", "x");
        assert!(matches!(
            RecordKind::Class.schema().select_sql(&filter),
            Err(AppError::Schema(_))
        ));
    }

    #[test]
    fn test_values_follow_schema_order() {
        let record = Record::from(sample_class());
        assert_eq!(
            record.values().len(),
            RecordKind::Class.schema().columns.len()
        );
        assert_eq!(record.get("key"), Some(Value::Text("cse142".to_string())));
        assert_eq!(record.get("start_offset"), Some(Value::Integer(10)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_from_values_rebuilds_record() {
        let record = Record::from(sample_class());
        let rebuilt = Record::from_values(RecordKind::Class, record.values()).unwrap();
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_from_values_rejects_wrong_types() {
        let values = vec![Value::Integer(1), "b".into(), "c".into()];
        assert!(Record::from_values(RecordKind::Department, values).is_err());
    }

    #[test]
    fn test_filter_matches_and_orders() {
        let mut second = sample_class();
        second.code = "143".to_string();
        let mut other = sample_class();
        other.department = "MATH".to_string();

        let filter = Filter::new().eq("department", "CSE").order_by("code");
        let matched: Vec<Record> = [second, sample_class(), other]
            .into_iter()
            .map(Record::from)
            .filter(|r| filter.matches(r))
            .collect();
        let ordered = filter.finish(matched);

        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].key(), "cse142");
        assert_eq!(ordered[1].key(), "cse143");
    }

    #[test]
    fn test_parse_value_uses_column_type() {
        let schema = RecordKind::Section.schema();
        assert_eq!(
            schema.parse_value("total_seats", "30").unwrap(),
            Value::Integer(30)
        );
        assert_eq!(
            schema.parse_value("sln", "12345").unwrap(),
            Value::Text("12345".to_string())
        );
        assert!(schema.parse_value("total_seats", "many").is_err());
    }

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("sections".parse::<RecordKind>().unwrap(), RecordKind::Section);
        assert_eq!("Dept".parse::<RecordKind>().unwrap(), RecordKind::Department);
        assert!("college".parse::<RecordKind>().is_err());
    }
}
