use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::{CreateTodoRequest, TodoListQuery, UpdateTodoRequest},
    notifications::Notification,
    repository::todos::{self, ListParams},
    response::ApiResponse,
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse};
use log::debug;
use validator::Validate;

/// Retrieves a page of the authenticated user's todos.
///
/// ## Query Parameters:
/// - `page`, `page_size`: 1-based page and size (1..=100). Out-of-range or
///   unparsable values fall back to 1 and 10.
/// - `status`: exact status match.
/// - `search`: case-insensitive substring of title or description.
/// - `sort_by`: one of `created_at`, `updated_at`, `title`, `status`, `due_date`.
/// - `sort_dir`: `ASC` or `DESC` (default).
#[get("")]
pub async fn list_todos(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<TodoListQuery>,
) -> AppResult<HttpResponse> {
    let params = ListParams::from(&*query);
    let page = todos::list(&state.pool, user.id, &params).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todos retrieved", page)))
}

#[post("")]
pub async fn create_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateTodoRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    body.validate()?;

    let todo = todos::create(&state.pool, user.id, body).await?;
    debug!("User {} created todo {}", user.id, todo.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Todo created", todo)))
}

#[get("/{id}")]
pub async fn get_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let todo = todos::get_owned(&state.pool, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo retrieved", todo)))
}

/// Partially updates a todo. A result whose status is `completed` queues a
/// completion notification.
#[put("/{id}")]
pub async fn update_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateTodoRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    body.validate()?;

    let todo = todos::update(&state.pool, path.into_inner(), user.id, body).await?;

    if todos::is_completed(&todo) {
        let _ = state.notifications.enqueue(Notification::TodoCompleted {
            todo_id: todo.id,
            title: todo.title.clone(),
        });
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo updated", todo)))
}

#[delete("/{id}")]
pub async fn delete_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    todos::delete(&state.pool, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Todo deleted")))
}
