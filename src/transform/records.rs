//! Normalized table rows and their column schemas
//!
//! The column lists here are the single source for CSV headers, PostgreSQL DDL
//! and the warehouse load schema. Field order in each struct matches its
//! column list. Field meanings follow the catalog's own field names.

#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 64-bit integer
    Integer,
    /// Double precision float
    Float,
    /// Free text
    Text,
    /// Calendar date (YYYY-MM-DD)
    Date,
}

/// One column of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: &'static str,
    /// Logical type
    pub kind: ColumnKind,
    /// Whether NULL is allowed
    pub nullable: bool,
}

const fn required(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        nullable: false,
    }
}

const fn nullable(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        nullable: true,
    }
}

/// A typed cell value used when binding rows to a database
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Integer cell
    Integer(Option<i64>),
    /// Float cell
    Float(Option<f64>),
    /// Text cell
    Text(Option<String>),
    /// Date cell
    Date(Option<NaiveDate>),
}

/// A row of one of the five output tables
pub trait TableRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Table name (also the CSV file stem)
    const TABLE: &'static str;

    /// Columns in output order
    const COLUMNS: &'static [Column];

    /// Cell values in column order
    fn cells(&self) -> Vec<CellValue>;

    /// CSV document name in the clean tier
    fn file_name() -> String {
        format!("{}.csv", Self::TABLE)
    }

    /// Column names in output order
    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}

/// One row per fetched movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRow {
    pub movie_id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub original_language: Option<String>,
}

impl MovieRow {
    /// Release date parsed as a calendar date; unparseable values are treated as null
    pub fn release_date_parsed(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }
}

impl TableRecord for MovieRow {
    const TABLE: &'static str = "movies";
    const COLUMNS: &'static [Column] = &[
        required("movie_id", ColumnKind::Integer),
        nullable("title", ColumnKind::Text),
        nullable("original_title", ColumnKind::Text),
        nullable("overview", ColumnKind::Text),
        nullable("release_date", ColumnKind::Date),
        nullable("runtime", ColumnKind::Integer),
        nullable("popularity", ColumnKind::Float),
        nullable("vote_average", ColumnKind::Float),
        nullable("vote_count", ColumnKind::Integer),
        nullable("budget", ColumnKind::Integer),
        nullable("revenue", ColumnKind::Integer),
        nullable("original_language", ColumnKind::Text),
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(Some(self.movie_id)),
            CellValue::Text(self.title.clone()),
            CellValue::Text(self.original_title.clone()),
            CellValue::Text(self.overview.clone()),
            CellValue::Date(self.release_date_parsed()),
            CellValue::Integer(self.runtime),
            CellValue::Float(self.popularity),
            CellValue::Float(self.vote_average),
            CellValue::Integer(self.vote_count),
            CellValue::Integer(self.budget),
            CellValue::Integer(self.revenue),
            CellValue::Text(self.original_language.clone()),
        ]
    }
}

/// One row per dictionary genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRow {
    pub genre_id: i64,
    pub name: Option<String>,
}

impl TableRecord for GenreRow {
    const TABLE: &'static str = "genres";
    const COLUMNS: &'static [Column] = &[
        required("genre_id", ColumnKind::Integer),
        nullable("name", ColumnKind::Text),
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(Some(self.genre_id)),
            CellValue::Text(self.name.clone()),
        ]
    }
}

/// Movie to genre link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieGenreRow {
    pub movie_id: i64,
    pub genre_id: i64,
}

impl TableRecord for MovieGenreRow {
    const TABLE: &'static str = "movie_genres";
    const COLUMNS: &'static [Column] = &[
        required("movie_id", ColumnKind::Integer),
        required("genre_id", ColumnKind::Integer),
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(Some(self.movie_id)),
            CellValue::Integer(Some(self.genre_id)),
        ]
    }
}

/// Cast credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRow {
    pub movie_id: i64,
    pub cast_id: Option<i64>,
    pub person_id: Option<i64>,
    pub name: Option<String>,
    pub character: Option<String>,
    pub gender: Option<i64>,
    pub order: Option<i64>,
}

impl TableRecord for CastRow {
    const TABLE: &'static str = "cast";
    const COLUMNS: &'static [Column] = &[
        required("movie_id", ColumnKind::Integer),
        nullable("cast_id", ColumnKind::Integer),
        nullable("person_id", ColumnKind::Integer),
        nullable("name", ColumnKind::Text),
        nullable("character", ColumnKind::Text),
        nullable("gender", ColumnKind::Integer),
        nullable("order", ColumnKind::Integer),
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(Some(self.movie_id)),
            CellValue::Integer(self.cast_id),
            CellValue::Integer(self.person_id),
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.character.clone()),
            CellValue::Integer(self.gender),
            CellValue::Integer(self.order),
        ]
    }
}

/// Crew credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewRow {
    pub movie_id: i64,
    pub person_id: Option<i64>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub job: Option<String>,
}

impl TableRecord for CrewRow {
    const TABLE: &'static str = "crew";
    const COLUMNS: &'static [Column] = &[
        required("movie_id", ColumnKind::Integer),
        nullable("person_id", ColumnKind::Integer),
        nullable("name", ColumnKind::Text),
        nullable("department", ColumnKind::Text),
        nullable("job", ColumnKind::Text),
    ];

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(Some(self.movie_id)),
            CellValue::Integer(self.person_id),
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.department.clone()),
            CellValue::Text(self.job.clone()),
        ]
    }
}

/// Table names in load order
pub const TABLE_LOAD_ORDER: [&str; 5] = [
    MovieRow::TABLE,
    GenreRow::TABLE,
    MovieGenreRow::TABLE,
    CastRow::TABLE,
    CrewRow::TABLE,
];
