//! Listing queries
//!
//! Every listing endpoint turns its optional query parameters into a
//! [`ListQuery`] plus a [`PageRequest`]. A `ListQuery` can only be built
//! from an owner id and always emits `user_id = ?` as its first predicate,
//! so no combination of caller filters can widen a listing past its owner.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use super::models::{MediaType, Platform, PostStatus};
use crate::error::AppError;

pub const DEFAULT_POST_LIMIT: i64 = 20;
pub const DEFAULT_MEDIA_LIMIT: i64 = 50;
pub const DEFAULT_ACCOUNT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

pub const POST_SORT_FIELDS: &[&str] = &[
    "created_at",
    "updated_at",
    "scheduled_at",
    "published_at",
    "title",
    "status",
];
pub const MEDIA_SORT_FIELDS: &[&str] = &["created_at", "size", "original_name"];
pub const ACCOUNT_SORT_FIELDS: &[&str] = &["platform", "name", "created_at", "followers_count"];

// =============================================================================
// Pagination
// =============================================================================

/// Requested page window, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// `page` below 1 becomes 1; `limit` is clamped to `1..=MAX_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total: i64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            pages: (total + request.limit - 1) / request.limit,
            limit: request.limit,
        }
    }
}

/// One page of results plus its totals
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// =============================================================================
// Date ranges
// =============================================================================

/// Inclusive, optionally one-sided time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
    ///
    /// A bare start date means midnight; a bare end date covers the whole day.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            start: start
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_bound(s, "start_date", NaiveTime::MIN))
                .transpose()?,
            end: end
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_bound(s, "end_date", end_of_day()))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(raw: &str, name: &str, date_only_time: NaiveTime) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(date_only_time).and_utc())
        .map_err(|_| AppError::Validation(format!("{name} must be an RFC 3339 timestamp or YYYY-MM-DD")))
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(AppError::Validation(format!("invalid sort order: {other}"))),
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordered sort keys; always ends with `id` so pages are deterministic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(&'static str, SortDirection)>,
}

impl Sort {
    pub fn by(field: &'static str, direction: SortDirection) -> Self {
        Self {
            keys: vec![(field, direction), ("id", direction)],
        }
    }

    fn accounts_default() -> Self {
        Self {
            keys: vec![
                ("platform", SortDirection::Asc),
                ("name", SortDirection::Asc),
                ("id", SortDirection::Asc),
            ],
        }
    }

    /// Resolve caller-supplied sort parameters against a whitelist.
    ///
    /// The field name placed in SQL is always the whitelist's own entry.
    pub fn parse(
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        allowed: &'static [&'static str],
        default: Sort,
    ) -> Result<Self, AppError> {
        let sort_by = sort_by.map(str::trim).filter(|s| !s.is_empty());
        let sort_order = sort_order.map(str::trim).filter(|s| !s.is_empty());

        let direction = sort_order.map(SortDirection::parse).transpose()?;
        match (sort_by, direction) {
            (None, None) => Ok(default),
            (None, Some(direction)) => {
                let field = default.keys.first().map(|(f, _)| *f).unwrap_or("created_at");
                Ok(Self::by(field, direction))
            }
            (Some(field), direction) => {
                let field = allowed
                    .iter()
                    .find(|allowed| **allowed == field)
                    .copied()
                    .ok_or_else(|| AppError::Validation(format!("invalid sort field: {field}")))?;
                Ok(Self::by(field, direction.unwrap_or(SortDirection::Desc)))
            }
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        qb.push(" ORDER BY ");
        let mut separated = qb.separated(", ");
        for (field, direction) in &self.keys {
            separated.push(format!("{} {}", field, direction.as_sql()));
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::by("created_at", SortDirection::Desc)
    }
}

// =============================================================================
// ListQuery
// =============================================================================

/// Tables that support owner-scoped listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Accounts,
    Posts,
    Media,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Accounts => "social_accounts",
            Table::Posts => "posts",
            Table::Media => "media",
        }
    }

    /// Predicate every query on the table carries
    fn base_predicate(&self) -> Option<&'static str> {
        match self {
            Table::Posts => Some("is_deleted = 0"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone)]
enum Condition {
    Eq {
        column: &'static str,
        value: Value,
    },
    Range {
        column: &'static str,
        range: DateRange,
    },
    Search {
        columns: &'static [&'static str],
        json_arrays: &'static [&'static str],
        pattern: String,
    },
    JsonArrayContains {
        column: &'static str,
        value: String,
    },
    JsonArrayFieldEq {
        column: &'static str,
        field: &'static str,
        value: String,
    },
}

impl Condition {
    fn push_sql(&self, table: Table, qb: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            Condition::Eq { column, value } => {
                qb.push(*column).push(" = ");
                match value {
                    Value::Text(text) => qb.push_bind(text.clone()),
                    Value::Bool(flag) => qb.push_bind(*flag),
                };
            }
            Condition::Range { column, range } => {
                let mut first = true;
                if let Some(start) = range.start {
                    qb.push(*column).push(" >= ").push_bind(start);
                    first = false;
                }
                if let Some(end) = range.end {
                    if !first {
                        qb.push(" AND ");
                    }
                    qb.push(*column).push(" <= ").push_bind(end);
                }
            }
            Condition::Search {
                columns,
                json_arrays,
                pattern,
            } => {
                qb.push("(");
                let mut first = true;
                for column in columns.iter() {
                    if !first {
                        qb.push(" OR ");
                    }
                    qb.push(*column)
                        .push(" LIKE ")
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\'");
                    first = false;
                }
                for column in json_arrays.iter() {
                    if !first {
                        qb.push(" OR ");
                    }
                    qb.push(format!(
                        "EXISTS (SELECT 1 FROM json_each({}.{}) WHERE json_each.value LIKE ",
                        table.name(),
                        column
                    ))
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\')");
                    first = false;
                }
                qb.push(")");
            }
            Condition::JsonArrayContains { column, value } => {
                qb.push(format!(
                    "EXISTS (SELECT 1 FROM json_each({}.{}) WHERE json_each.value = ",
                    table.name(),
                    column
                ))
                .push_bind(value.clone())
                .push(")");
            }
            Condition::JsonArrayFieldEq {
                column,
                field,
                value,
            } => {
                qb.push(format!(
                    "EXISTS (SELECT 1 FROM json_each({}.{}) WHERE json_extract(json_each.value, '$.{}') = ",
                    table.name(),
                    column,
                    field
                ))
                .push_bind(value.clone())
                .push(")");
            }
        }
    }
}

/// Escape LIKE wildcards so the term matches literally
///
/// Matching goes through SQLite's `LIKE`, which folds case for ASCII
/// letters only; `lower()` has the same limit without the ICU extension.
/// "CAFE" finds "café" but "CAFÉ" does not.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Owner-scoped filter and sort for one table
#[derive(Debug, Clone)]
pub struct ListQuery {
    table: Table,
    owner_id: String,
    conditions: Vec<Condition>,
    sort: Sort,
}

impl ListQuery {
    /// The only way to build a listing query.
    pub fn for_owner(table: Table, owner_id: impl Into<String>) -> Self {
        let sort = match table {
            Table::Accounts => Sort::accounts_default(),
            _ => Sort::default(),
        };
        Self {
            table,
            owner_id: owner_id.into(),
            conditions: Vec::new(),
            sort,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn eq_text(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq {
            column,
            value: Value::Text(value.into()),
        });
        self
    }

    pub fn eq_bool(mut self, column: &'static str, value: bool) -> Self {
        self.conditions.push(Condition::Eq {
            column,
            value: Value::Bool(value),
        });
        self
    }

    /// Inclusive range; an empty range adds nothing
    pub fn within(mut self, column: &'static str, range: DateRange) -> Self {
        if !range.is_empty() {
            self.conditions.push(Condition::Range { column, range });
        }
        self
    }

    /// Case-insensitive substring match over text columns and JSON string arrays
    pub fn search(
        mut self,
        columns: &'static [&'static str],
        json_arrays: &'static [&'static str],
        term: &str,
    ) -> Self {
        let term = term.trim();
        if !term.is_empty() {
            self.conditions.push(Condition::Search {
                columns,
                json_arrays,
                pattern: like_pattern(term),
            });
        }
        self
    }

    /// JSON string array column contains `value`
    pub fn contains(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::JsonArrayContains {
            column,
            value: value.into(),
        });
        self
    }

    /// Any object in a JSON array column has `field == value`
    pub fn any_element(
        mut self,
        column: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        self.conditions.push(Condition::JsonArrayFieldEq {
            column,
            field,
            value: value.into(),
        });
        self
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    fn push_from_where(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        qb.push(" FROM ")
            .push(self.table.name())
            .push(" WHERE user_id = ")
            .push_bind(self.owner_id.clone());

        if let Some(base) = self.table.base_predicate() {
            qb.push(" AND ").push(base);
        }

        for condition in &self.conditions {
            qb.push(" AND ");
            condition.push_sql(self.table, qb);
        }
    }

    /// `SELECT *` with ordering, optionally windowed to one page
    pub fn select(&self, page: Option<PageRequest>) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT *");
        self.push_from_where(&mut qb);
        self.sort.push_sql(&mut qb);
        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(page.limit)
                .push(" OFFSET ")
                .push_bind(page.offset());
        }
        qb
    }

    /// `SELECT *` limited to the first `limit` rows
    pub fn select_first(&self, limit: i64) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT *");
        self.push_from_where(&mut qb);
        self.sort.push_sql(&mut qb);
        qb.push(" LIMIT ").push_bind(limit);
        qb
    }

    pub fn count(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*)");
        self.push_from_where(&mut qb);
        qb
    }

    /// `SELECT column, aggregates ... GROUP BY column ORDER BY column`
    pub fn grouped(
        &self,
        column: &'static str,
        aggregates: &'static str,
    ) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(format!("SELECT {column}, {aggregates}"));
        self.push_from_where(&mut qb);
        qb.push(format!(" GROUP BY {column} ORDER BY {column} ASC"));
        qb
    }
}

// =============================================================================
// Resource filters
// =============================================================================

/// Raw post listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub platform: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PostListParams {
    pub fn into_query(self, owner_id: &str) -> Result<(ListQuery, PageRequest), AppError> {
        let page = PageRequest::new(self.page, self.limit, DEFAULT_POST_LIMIT);
        let range = DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref())?;
        let sort = Sort::parse(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            POST_SORT_FIELDS,
            Sort::default(),
        )?;

        let mut query = ListQuery::for_owner(Table::Posts, owner_id)
            .within("created_at", range)
            .sorted(sort);

        if let Some(status) = non_empty(self.status) {
            let status: PostStatus = status.parse()?;
            query = query.eq_text("status", status.as_str());
        }
        if let Some(platform) = non_empty(self.platform) {
            let platform: Platform = platform.parse()?;
            query = query.any_element("platforms", "platform", platform.as_str());
        }
        if let Some(tag) = non_empty(self.tag) {
            query = query.contains("tags", tag);
        }
        if let Some(search) = non_empty(self.search) {
            query = query.search(&["title", "content"], &[], &search);
        }

        Ok((query, page))
    }
}

/// Raw media listing parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub folder: Option<String>,
    pub is_used: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl MediaListParams {
    pub fn into_query(self, owner_id: &str) -> Result<(ListQuery, PageRequest), AppError> {
        let page = PageRequest::new(self.page, self.limit, DEFAULT_MEDIA_LIMIT);
        let range = DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref())?;
        let sort = Sort::parse(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            MEDIA_SORT_FIELDS,
            Sort::default(),
        )?;

        let mut query = ListQuery::for_owner(Table::Media, owner_id)
            .within("created_at", range)
            .sorted(sort);

        if let Some(media_type) = non_empty(self.media_type) {
            let media_type: MediaType = media_type.parse()?;
            query = query.eq_text("media_type", media_type.as_str());
        }
        if let Some(folder) = non_empty(self.folder) {
            query = query.eq_text("folder", folder);
        }
        if let Some(is_used) = self.is_used {
            query = query.eq_bool("is_used", is_used);
        }
        if let Some(tag) = non_empty(self.tag) {
            query = query.contains("tags", tag);
        }
        if let Some(search) = non_empty(self.search) {
            query = query.search(&["original_name", "caption"], &["tags"], &search);
        }

        Ok((query, page))
    }
}

/// Raw account listing parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub platform: Option<String>,
    pub is_connected: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl AccountListParams {
    pub fn into_query(self, owner_id: &str) -> Result<(ListQuery, PageRequest), AppError> {
        let page = PageRequest::new(self.page, self.limit, DEFAULT_ACCOUNT_LIMIT);
        let sort = Sort::parse(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            ACCOUNT_SORT_FIELDS,
            Sort::accounts_default(),
        )?;

        let mut query = ListQuery::for_owner(Table::Accounts, owner_id).sorted(sort);

        if let Some(platform) = non_empty(self.platform) {
            let platform: Platform = platform.parse()?;
            query = query.eq_text("platform", platform.as_str());
        }
        if let Some(is_connected) = self.is_connected {
            query = query.eq_bool("is_connected", is_connected);
        }

        Ok((query, page))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
