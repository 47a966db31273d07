//! HTTP API layer exposing the vault's file operations.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use notevault_common::{Error, ItemKind, Node};
use notevault_store::VaultStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VaultStore>,
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize, Deserialize)]
struct ListResponse {
    files: Vec<Node>,
}

#[derive(Serialize)]
struct ContentResponse {
    content: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

// Path fields stay untyped so a non-string path is reported as an invalid
// path rather than a generic body rejection.
#[derive(Deserialize)]
struct CreateRequest {
    #[serde(default)]
    path: Option<Value>,
    #[serde(default, rename = "type")]
    item_type: Option<Value>,
}

#[derive(Deserialize)]
struct MoveRequest {
    #[serde(default, rename = "sourcePath")]
    source_path: Option<Value>,
    #[serde(default, rename = "destinationPath")]
    destination_path: Option<Value>,
}

#[derive(Deserialize)]
struct RenameRequest {
    #[serde(default)]
    new_name: Option<Value>,
}

#[derive(Serialize)]
struct RenameResponse {
    message: String,
    old_name: String,
    new_name: String,
}

/// Build the `/files` router over a store.
///
/// `/files/create`, `/files/move` and `/files/rename/...` take POST for their
/// operation and still serve GET, PUT and DELETE for vault items at those
/// paths.
pub fn router(store: Arc<dyn VaultStore>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/files", get(list_files))
        .route("/files/create", fixed_item_routes("create").post(create_item))
        .route("/files/move", fixed_item_routes("move").post(move_item))
        .route(
            "/files/rename/{*path}",
            get(read_renamed)
                .put(write_renamed)
                .delete(delete_renamed)
                .post(rename_item),
        )
        .route(
            "/files/{*path}",
            get(read_file).put(write_file).delete(delete_item),
        )
        .with_state(AppState { store })
}

/// Item routes for a vault path that coincides with a fixed route segment.
fn fixed_item_routes(path: &'static str) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| async move { read_path(&state, path).await })
        .put(move |State(state): State<AppState>, body: Bytes| async move {
            write_path(&state, path, body).await
        })
        .delete(move |State(state): State<AppState>| async move {
            delete_path(&state, path).await
        })
}

/// Extract a required path argument, trimmed and validated against the
/// sandbox before the operation is dispatched.
fn path_arg<'a>(store: &dyn VaultStore, value: Option<&'a Value>, missing: &str) -> ApiResult<&'a str> {
    match value {
        None | Some(Value::Null) => Err(Error::InvalidRequest(missing.to_string()).into()),
        Some(Value::String(s)) => {
            let path = s.trim();
            if path.is_empty() {
                return Err(Error::InvalidRequest(missing.to_string()).into());
            }
            store.root().resolve(path)?;
            Ok(path)
        }
        Some(_) => Err(Error::InvalidPath("Path must be a string".to_string()).into()),
    }
}

async fn list_files(State(state): State<AppState>) -> ApiResult<Json<ListResponse>> {
    let files = state.store.list().await?;
    Ok(Json(ListResponse { files }))
}

async fn read_path(state: &AppState, path: &str) -> ApiResult<Json<ContentResponse>> {
    let content = state.store.read(path).await?;
    Ok(Json(ContentResponse {
        content: String::from_utf8_lossy(&content).into_owned(),
    }))
}

async fn write_path(state: &AppState, path: &str, body: Bytes) -> ApiResult<Json<MessageResponse>> {
    state.store.write(path, body.to_vec()).await?;
    Ok(MessageResponse::new("File saved successfully"))
}

async fn delete_path(state: &AppState, path: &str) -> ApiResult<Json<MessageResponse>> {
    state.store.delete(path).await?;
    Ok(MessageResponse::new(format!(
        "Item '{}' deleted successfully",
        path
    )))
}

async fn read_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<ContentResponse>> {
    read_path(&state, &path).await
}

async fn write_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<Json<MessageResponse>> {
    write_path(&state, &path, body).await
}

async fn delete_item(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    delete_path(&state, &path).await
}

// Items below a top-level `rename` folder share the rename route's prefix.
async fn read_renamed(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<ContentResponse>> {
    read_path(&state, &format!("rename/{}", path)).await
}

async fn write_renamed(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<Json<MessageResponse>> {
    write_path(&state, &format!("rename/{}", path), body).await
}

async fn delete_renamed(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    delete_path(&state, &format!("rename/{}", path)).await
}

async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    const MISSING: &str = "Path and type are required";

    let kind = match req.item_type.as_ref() {
        Some(Value::String(s)) => s.parse::<ItemKind>()?,
        Some(Value::Null) | None => return Err(Error::InvalidRequest(MISSING.to_string()).into()),
        Some(_) => {
            return Err(Error::InvalidRequest(
                "Invalid type: must be 'file' or 'folder'".to_string(),
            )
            .into())
        }
    };
    let path = path_arg(state.store.as_ref(), req.path.as_ref(), MISSING)?;

    state.store.create(path, kind).await?;

    let label = match kind {
        ItemKind::File => "File",
        ItemKind::Folder => "Folder",
    };
    Ok((
        StatusCode::CREATED,
        MessageResponse::new(format!("{} '{}' created successfully", label, path)),
    ))
}

async fn move_item(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<MessageResponse>> {
    const MISSING: &str = "Source and destination paths are required";

    let store = state.store.as_ref();
    let source = path_arg(store, req.source_path.as_ref(), MISSING)?;
    let destination = path_arg(store, req.destination_path.as_ref(), MISSING)?;

    store.move_item(source, destination).await?;
    Ok(MessageResponse::new("Item moved successfully"))
}

async fn rename_item(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<RenameResponse>> {
    let new_name = match req.new_name.as_ref() {
        Some(Value::String(s)) => s.as_str(),
        _ => {
            return Err(Error::InvalidRequest(
                "New name is required and must be a string".to_string(),
            )
            .into())
        }
    };

    let outcome = state.store.rename(&path, new_name).await?;
    info!(from = %outcome.old_path, to = %outcome.new_path, "Rename served");

    Ok(Json(RenameResponse {
        message: "Item renamed successfully".to_string(),
        old_name: outcome.old_path,
        new_name: outcome.new_path,
    }))
}
