//! axum router, handlers and server lifecycle.

use axum::{
    Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::db::Database;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::types::{
    BoardView, Collection, CollectionTree, ColumnPatch, ContainerPatch, Folder, FolderTree, Item,
    ItemView, KanbanBoard, KanbanColumn, KanbanTask, MoveTarget, NewCollection, NewColumn,
    NewFolder, NewItem, NewTask, TaskMove, TaskPatch, User, Workspace, WorkspaceMember,
};

/// Header carrying the already-authenticated caller id.
pub const USER_HEADER: &str = "x-user-id";

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiServer {
    db: Arc<Database>,
}

impl ApiServer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// Caller id taken from [`USER_HEADER`].
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| ApiError::missing_field(USER_HEADER))
    }
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());
        if status.is_server_error() {
            error!(code = ?self.code, "{}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NameBody {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberBody {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PositionBody {
    position: i64,
}

// =============================================================================
// Users and workspaces
// =============================================================================

async fn upsert_user(State(state): State<ApiServer>, Json(body): Json<UserBody>) -> ApiResult<Json<User>> {
    state
        .db()
        .upsert_user(body.id, &body.name, body.email.as_deref())
        .map(Json)
}

async fn list_workspaces(State(state): State<ApiServer>, UserId(user): UserId) -> ApiResult<Json<Vec<Workspace>>> {
    state.db().list_workspaces(&user).map(Json)
}

async fn create_workspace(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NameBody>,
) -> ApiResult<Json<Workspace>> {
    state.db().create_workspace(&body.name, &user).map(Json)
}

async fn get_workspace(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Workspace>> {
    state.db().get_workspace(&id, &user).map(Json)
}

async fn update_workspace(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<NameBody>,
) -> ApiResult<Json<Workspace>> {
    state.db().update_workspace(&id, &body.name, &user).map(Json)
}

async fn leave_workspace(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().leave_workspace(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_workspace(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_workspace(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<WorkspaceMember>>> {
    state.db().list_members(&id, &user).map(Json)
}

async fn add_member(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Json<WorkspaceMember>> {
    state.db().add_member(&id, &user, &body.user_id).map(Json)
}

async fn remove_member(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path((id, member)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.db().remove_member(&id, &user, &member)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_collections(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Collection>>> {
    state.db().list_collections(&id, &user).map(Json)
}

// =============================================================================
// Collections
// =============================================================================

async fn create_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NewCollection>,
) -> ApiResult<Json<Collection>> {
    state.db().create_collection(&user, body).map(Json)
}

async fn get_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<CollectionTree>> {
    state.db().get_collection_tree(&id, &user).map(Json)
}

async fn update_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(patch): Json<ContainerPatch>,
) -> ApiResult<Json<Collection>> {
    state.db().update_collection(&id, patch, &user).map(Json)
}

async fn delete_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_collection(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<PositionBody>,
) -> ApiResult<Json<Collection>> {
    state.db().reorder_collection(&id, body.position, &user).map(Json)
}

async fn duplicate_collection(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<CollectionTree>> {
    state.db().duplicate_collection(&id, &user).map(Json)
}

// =============================================================================
// Folders
// =============================================================================

async fn create_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NewFolder>,
) -> ApiResult<Json<Folder>> {
    state.db().create_folder(&user, body).map(Json)
}

async fn get_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<FolderTree>> {
    state.db().get_folder_tree(&id, &user).map(Json)
}

async fn update_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(patch): Json<ContainerPatch>,
) -> ApiResult<Json<Folder>> {
    state.db().update_folder(&id, patch, &user).map(Json)
}

async fn delete_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_folder(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(target): Json<MoveTarget>,
) -> ApiResult<Json<Folder>> {
    state.db().move_folder(&id, target, &user).map(Json)
}

async fn reorder_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<PositionBody>,
) -> ApiResult<Json<Folder>> {
    state.db().reorder_folder(&id, body.position, &user).map(Json)
}

async fn duplicate_folder(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<FolderTree>> {
    state.db().duplicate_folder(&id, &user).map(Json)
}

// =============================================================================
// Items
// =============================================================================

async fn create_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NewItem>,
) -> ApiResult<Json<Item>> {
    state.db().create_item(&user, body).map(Json)
}

async fn get_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    state.db().get_item(&id, &user).map(Json)
}

async fn update_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(patch): Json<ContainerPatch>,
) -> ApiResult<Json<Item>> {
    state.db().update_item(&id, patch, &user).map(Json)
}

async fn delete_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_item(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(target): Json<MoveTarget>,
) -> ApiResult<Json<Item>> {
    state.db().move_item(&id, target, &user).map(Json)
}

async fn reorder_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<PositionBody>,
) -> ApiResult<Json<Item>> {
    state.db().reorder_item(&id, body.position, &user).map(Json)
}

async fn duplicate_item(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    state.db().duplicate_item(&id, &user).map(Json)
}

// =============================================================================
// Kanban
// =============================================================================

async fn create_board(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<KanbanBoard>> {
    state.db().create_board(&id, &user).map(Json)
}

async fn get_board(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<BoardView>> {
    state.db().get_board(&id, &user).map(Json)
}

async fn create_column(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NewColumn>,
) -> ApiResult<Json<KanbanColumn>> {
    state.db().create_column(&user, body).map(Json)
}

async fn update_column(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(patch): Json<ColumnPatch>,
) -> ApiResult<Json<KanbanColumn>> {
    state.db().update_column(&id, patch, &user).map(Json)
}

async fn delete_column(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_column(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_column(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<PositionBody>,
) -> ApiResult<Json<KanbanColumn>> {
    state.db().reorder_column(&id, body.position, &user).map(Json)
}

async fn create_task(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Json(body): Json<NewTask>,
) -> ApiResult<Json<KanbanTask>> {
    state.db().create_task(&user, body).map(Json)
}

async fn update_task(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<KanbanTask>> {
    state.db().update_task(&id, patch, &user).map(Json)
}

async fn delete_task(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().delete_task(&id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_task(
    State(state): State<ApiServer>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(target): Json<TaskMove>,
) -> ApiResult<Json<KanbanTask>> {
    state.db().move_task(&id, target, &user).map(Json)
}

/// Build the router with all routes.
pub fn build_router(db: Arc<Database>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", post(upsert_user))
        // Workspaces
        .route("/api/workspaces", get(list_workspaces).post(create_workspace))
        .route(
            "/api/workspaces/{id}",
            get(get_workspace).patch(update_workspace).delete(delete_workspace),
        )
        .route("/api/workspaces/{id}/leave", post(leave_workspace))
        .route("/api/workspaces/{id}/members", get(list_members).post(add_member))
        .route("/api/workspaces/{id}/members/{user_id}", axum::routing::delete(remove_member))
        .route("/api/workspaces/{id}/collections", get(list_collections))
        // Containers
        .route("/api/collections", post(create_collection))
        .route(
            "/api/collections/{id}",
            get(get_collection).patch(update_collection).delete(delete_collection),
        )
        .route("/api/collections/{id}/reorder", post(reorder_collection))
        .route("/api/collections/{id}/duplicate", post(duplicate_collection))
        .route("/api/folders", post(create_folder))
        .route(
            "/api/folders/{id}",
            get(get_folder).patch(update_folder).delete(delete_folder),
        )
        .route("/api/folders/{id}/move", post(move_folder))
        .route("/api/folders/{id}/reorder", post(reorder_folder))
        .route("/api/folders/{id}/duplicate", post(duplicate_folder))
        .route("/api/items", post(create_item))
        .route(
            "/api/items/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/api/items/{id}/move", post(move_item))
        .route("/api/items/{id}/reorder", post(reorder_item))
        .route("/api/items/{id}/duplicate", post(duplicate_item))
        // Kanban
        .route("/api/items/{id}/board", get(get_board).post(create_board))
        .route("/api/columns", post(create_column))
        .route("/api/columns/{id}", axum::routing::patch(update_column).delete(delete_column))
        .route("/api/columns/{id}/reorder", post(reorder_column))
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/{id}", axum::routing::patch(update_task).delete(delete_task))
        .route("/api/tasks/{id}/move", post(move_task))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ApiServer::new(db))
}

/// Serve the API until ctrl-c.
pub async fn serve(db: Arc<Database>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(db);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Playground server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Playground server shutting down");
        })
        .await?;
    Ok(())
}
