//! Named analytical queries over the warehouse tables
//!
//! The queries live in an embedded SQL file as `-- NAME:` blocks written
//! against `{{PROJECT}}.{{DATASET}}`. [`QueryCatalog::render`] turns a name into
//! runnable SQL and [`QueryRows`] holds what the warehouse sends back.

use serde_json::{Map, Number, Value};

const QUERIES_SQL: &str = include_str!("queries.sql");

const PROJECT_PLACEHOLDER: &str = "{{PROJECT}}";
const DATASET_PLACEHOLDER: &str = "{{DATASET}}";

/// Query whose result gains a derived `engagement_score` column
pub const ENGAGEMENT_SCORE: &str = "ENGAGEMENT_SCORE";

/// Analytics errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    /// No block with this name
    #[error("unknown query {name:?} (available: {})", .available.join(", "))]
    UnknownQuery {
        /// Requested name
        name: String,
        /// Names defined in the query file
        available: Vec<String>,
    },

    /// A block header with no SQL below it
    #[error("query {0} has no SQL")]
    EmptyQuery(String),

    /// Two blocks share a name
    #[error("query {0} is defined twice")]
    DuplicateQuery(String),
}

/// Result type for analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// One named SQL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    /// Block name, e.g. `TOP_GENRES_BY_COUNT`
    pub name: String,
    /// SQL with placeholders still in place
    pub template: String,
}

/// The set of named queries, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    queries: Vec<NamedQuery>,
}

/// `NAME` when `line` is a `-- NAME:` block header
fn block_header(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix("-- ")?.strip_suffix(':')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(name)
}

impl QueryCatalog {
    /// Parse `-- NAME:` blocks; text before the first header is ignored
    pub fn parse(text: &str) -> AnalyticsResult<Self> {
        let mut blocks: Vec<(String, Vec<&str>)> = Vec::new();
        for line in text.lines() {
            if let Some(name) = block_header(line) {
                if blocks.iter().any(|(existing, _)| existing == name) {
                    return Err(AnalyticsError::DuplicateQuery(name.to_string()));
                }
                blocks.push((name.to_string(), Vec::new()));
            } else if let Some((_, body)) = blocks.last_mut() {
                body.push(line);
            }
        }

        let queries = blocks
            .into_iter()
            .map(|(name, body)| {
                let template = body.join("\n").trim().trim_end_matches(';').trim_end().to_string();
                if template.is_empty() {
                    Err(AnalyticsError::EmptyQuery(name))
                } else {
                    Ok(NamedQuery { name, template })
                }
            })
            .collect::<AnalyticsResult<Vec<_>>>()?;
        Ok(Self { queries })
    }

    /// Queries shipped with the crate
    pub fn embedded() -> AnalyticsResult<Self> {
        Self::parse(QUERIES_SQL)
    }

    /// Query names in file order
    pub fn names(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.name.as_str()).collect()
    }

    /// Unsubstituted SQL for `name`
    ///
    /// # Errors
    /// [`AnalyticsError::UnknownQuery`] listing the available names.
    pub fn template(&self, name: &str) -> AnalyticsResult<&str> {
        self.queries
            .iter()
            .find(|q| q.name == name)
            .map(|q| q.template.as_str())
            .ok_or_else(|| AnalyticsError::UnknownQuery {
                name: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    /// SQL for `name` with project and dataset filled in
    pub fn render(&self, name: &str, project: &str, dataset: &str) -> AnalyticsResult<String> {
        Ok(substitute(self.template(name)?, project, dataset))
    }
}

/// Replace every `{{PROJECT}}` and `{{DATASET}}` placeholder
pub fn substitute(template: &str, project: &str, dataset: &str) -> String {
    template
        .replace(PROJECT_PLACEHOLDER, project)
        .replace(DATASET_PLACEHOLDER, dataset)
}

/// Tabular query result; cells are kept as the warehouse returns them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Row cells in column order
    pub rows: Vec<Vec<Value>>,
}

/// Numeric value of a cell; the warehouse encodes numbers as strings
fn numeric(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl QueryRows {
    /// Read `schema.fields` and `rows[].f[].v` from a `jobs.query` or
    /// `getQueryResults` response
    pub fn from_response(response: &Value) -> Self {
        let columns = response["schema"]["fields"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let rows = response["rows"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row["f"]
                            .as_array()
                            .map(|cells| cells.iter().map(|c| c["v"].clone()).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { columns, rows }
    }

    /// Index of `column`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Add columns computed client-side for `query`
    ///
    /// [`ENGAGEMENT_SCORE`] gains `engagement_score = vote_count * popularity`,
    /// null when either input is null. Other queries are left as they are.
    pub fn derive_columns(&mut self, query: &str) {
        if query != ENGAGEMENT_SCORE {
            return;
        }
        let (Some(votes), Some(popularity)) = (
            self.column_index("vote_count"),
            self.column_index("popularity"),
        ) else {
            return;
        };

        self.columns.push("engagement_score".to_string());
        for row in &mut self.rows {
            let score = match (row.get(votes).and_then(numeric), row.get(popularity).and_then(numeric)) {
                (Some(v), Some(p)) => Number::from_f64(v * p).map_or(Value::Null, Value::Number),
                _ => Value::Null,
            };
            row.push(score);
        }
    }

    /// Rows as column-keyed objects
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}
