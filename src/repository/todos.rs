//! Owner-scoped todo queries.
//!
//! Every statement in this module filters on `(id, user_id)` or `user_id`
//! together with `deleted_at IS NULL`. A todo owned by someone else is
//! indistinguishable from one that does not exist.

use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{CreateTodoRequest, Todo, TodoListQuery, TodoStatus, UpdateTodoRequest};

const TODO_COLUMNS: &str = "id, title, description, status, due_date, user_id, created_at, updated_at";

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Columns a listing may be ordered by. Anything else falls back to `CreatedAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
    DueDate,
}

impl SortField {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "status" => SortField::Status,
            "due_date" => SortField::DueDate,
            _ => SortField::CreatedAt,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::DueDate => "due_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Only the exact strings `ASC` and `DESC` are recognised.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ASC" => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Normalized listing parameters. Construction never fails: out-of-range
/// input is coerced to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: i64,
    pub page_size: i64,
    /// Literal equality filter; not restricted to known statuses.
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_dir: SortDirection,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::normalize(1, DEFAULT_PAGE_SIZE, "", "", "", "")
    }
}

impl ListParams {
    pub fn normalize(
        page: i64,
        page_size: i64,
        status: &str,
        search: &str,
        sort_by: &str,
        sort_dir: &str,
    ) -> Self {
        Self {
            page: if page < 1 { 1 } else { page },
            page_size: if (1..=MAX_PAGE_SIZE).contains(&page_size) {
                page_size
            } else {
                DEFAULT_PAGE_SIZE
            },
            status: non_empty(status),
            search: non_empty(search),
            sort_by: SortField::parse(sort_by),
            sort_dir: SortDirection::parse(sort_dir),
        }
    }

    fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl From<&TodoListQuery> for ListParams {
    fn from(query: &TodoListQuery) -> Self {
        // A present but unparsable number behaves like zero, which the
        // normalization then coerces.
        let number = |value: &Option<String>, default: i64| match value {
            Some(raw) => raw.trim().parse().unwrap_or(0),
            None => default,
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        ListParams::normalize(
            number(&query.page, 1),
            number(&query.page_size, DEFAULT_PAGE_SIZE),
            &text(&query.status),
            &text(&query.search),
            &text(&query.sort_by),
            &text(&query.sort_dir),
        )
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct TodoPage {
    #[serde(rename = "todos")]
    pub items: Vec<Todo>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQLite's `LOWER` folds ASCII letters only, so search is case-insensitive
/// for ASCII and exact for everything else.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, owner_id: i64, params: &ListParams) {
    builder
        .push(" WHERE user_id = ")
        .push_bind(owner_id)
        .push(" AND deleted_at IS NULL");

    if let Some(status) = &params.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }

    if let Some(search) = &params.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (LOWER(title) LIKE LOWER(")
            .push_bind(pattern.clone())
            .push(") ESCAPE '\\' OR LOWER(COALESCE(description, '')) LIKE LOWER(")
            .push_bind(pattern)
            .push(") ESCAPE '\\')");
    }
}

/// Lists the owner's todos with filtering, sorting and pagination.
pub async fn list(pool: &SqlitePool, owner_id: i64, params: &ListParams) -> AppResult<TodoPage> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM todos");
    push_filters(&mut count, owner_id, params);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM todos", TODO_COLUMNS));
    push_filters(&mut select, owner_id, params);
    // Column and direction come from closed enums, never from request text.
    let direction = params.sort_dir.keyword();
    select.push(format!(
        " ORDER BY {} {}, id {}",
        params.sort_by.column(),
        direction,
        direction
    ));
    select
        .push(" LIMIT ")
        .push_bind(params.page_size)
        .push(" OFFSET ")
        .push_bind(params.offset());

    let items = select.build_query_as::<Todo>().fetch_all(pool).await?;

    Ok(TodoPage {
        items,
        total,
        page: params.page,
        page_size: params.page_size,
        total_pages: total_pages(total, params.page_size),
    })
}

/// Fetches a single todo if, and only if, `owner_id` owns it.
pub async fn get_owned<'e, E>(executor: E, id: i64, owner_id: i64) -> AppResult<Todo>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {} FROM todos WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        TODO_COLUMNS
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Todo not found".into()))
}

pub async fn create<'e, E>(executor: E, owner_id: i64, input: CreateTodoRequest) -> AppResult<Todo>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let todo = sqlx::query_as::<_, Todo>(&format!(
        "INSERT INTO todos (title, description, status, due_date, user_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {}",
        TODO_COLUMNS
    ))
    .bind(input.title)
    .bind(input.description)
    .bind(input.status.unwrap_or_default())
    .bind(input.due_date)
    .bind(owner_id)
    .bind(now)
    .fetch_one(executor)
    .await?;
    Ok(todo)
}

/// Applies a partial update to an owned todo and returns the stored result.
///
/// Absent values and empty strings keep the stored field. The merge is one
/// statement, so it never holds a read snapshot while waiting for the write lock.
pub async fn update<'e, E>(
    executor: E,
    id: i64,
    owner_id: i64,
    patch: UpdateTodoRequest,
) -> AppResult<Todo>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Todo>(&format!(
        "UPDATE todos SET \
         title = COALESCE(NULLIF($1, ''), title), \
         description = COALESCE(NULLIF($2, ''), description), \
         status = COALESCE($3, status), \
         due_date = COALESCE($4, due_date), \
         updated_at = $5 \
         WHERE id = $6 AND user_id = $7 AND deleted_at IS NULL RETURNING {}",
        TODO_COLUMNS
    ))
    .bind(patch.title)
    .bind(patch.description)
    .bind(patch.status)
    .bind(patch.due_date)
    .bind(Utc::now())
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Todo not found".into()))
}

/// Soft-deletes an owned todo.
pub async fn delete<'e, E>(executor: E, id: i64, owner_id: i64) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE todos SET deleted_at = $1 WHERE id = $2 AND user_id = $3 AND deleted_at IS NULL",
    )
    .bind(Utc::now())
    .bind(id)
    .bind(owner_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Todo not found".into()));
    }
    Ok(())
}

/// True when the stored status is `completed`.
pub fn is_completed(todo: &Todo) -> bool {
    todo.status == TodoStatus::Completed
}
