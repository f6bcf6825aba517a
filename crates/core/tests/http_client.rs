//! End-to-end tests against a fake REST API served by axum

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use tc_core::app::{AppShell, Screen, SESSION_EXPIRED_MESSAGE};
use tc_core::board::{Board, BoardSyncEngine};
use tc_core::remote::{AuthApi, BoardApi, Credentials, HttpRemoteClient, TaskApi};
use tc_core::session::{Location, MemoryCredentialStore, SessionStore};
use tc_core::sync::Confirm;
use tc_core::task::{
    DragReorderController, Task, TaskDraft, TaskEvent, TaskMutation, TaskStatus, TaskSyncEngine,
};
use tc_core::Error;

const VALID_TOKEN: &str = "valid-token";

#[derive(Default)]
struct FakeDb {
    boards: Vec<Board>,
    tasks: Vec<Task>,
    fail_task_updates: bool,
    auth_headers: Vec<Option<String>>,
}

type Db = Arc<Mutex<FakeDb>>;
type ApiError = (StatusCode, Json<Value>);

fn reject(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "message": message })))
}

fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), ApiError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    db.lock().unwrap().auth_headers.push(header.clone());
    if header.as_deref() == Some(&format!("Bearer {}", VALID_TOKEN)) {
        Ok(())
    } else {
        Err(reject(StatusCode::UNAUTHORIZED, "Token is not valid"))
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct NameBody {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftBody {
    title: String,
    description: Option<String>,
    progress: u8,
}

#[derive(Deserialize)]
struct PatchBody {
    status: Option<TaskStatus>,
    progress: Option<u8>,
    title: Option<String>,
}

async fn login(Json(body): Json<LoginBody>) -> Result<Json<Value>, ApiError> {
    if body.email == "dev@example.com" && body.password == "secret" {
        Ok(Json(json!({ "token": VALID_TOKEN })))
    } else {
        Err(reject(StatusCode::UNAUTHORIZED, "Invalid credentials"))
    }
}

async fn signup(Json(_body): Json<LoginBody>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "message": "User created" })))
}

async fn list_boards(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<Board>>, ApiError> {
    authorize(&db, &headers)?;
    Ok(Json(db.lock().unwrap().boards.clone()))
}

async fn create_board(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(body): Json<NameBody>,
) -> Result<(StatusCode, Json<Board>), ApiError> {
    authorize(&db, &headers)?;
    let board = Board::new(Uuid::new_v4().to_string(), body.name);
    db.lock().unwrap().boards.push(board.clone());
    Ok((StatusCode::CREATED, Json(board)))
}

async fn rename_board(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<NameBody>,
) -> Result<Json<Board>, ApiError> {
    authorize(&db, &headers)?;
    let mut db = db.lock().unwrap();
    let board = db
        .boards
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Board not found"))?;
    board.name = body.name;
    Ok(Json(board.clone()))
}

async fn delete_board(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&db, &headers)?;
    let mut db = db.lock().unwrap();
    db.boards.retain(|b| b.id != id);
    db.tasks.retain(|t| t.board_id.as_deref() != Some(id.as_str()));
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(
    State(db): State<Db>,
    Path(board_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Task>>, ApiError> {
    authorize(&db, &headers)?;
    let db = db.lock().unwrap();
    let tasks = db
        .tasks
        .iter()
        .filter(|t| t.board_id.as_deref() == Some(board_id.as_str()))
        .cloned()
        .collect();
    Ok(Json(tasks))
}

async fn create_task(
    State(db): State<Db>,
    Path(board_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<DraftBody>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    authorize(&db, &headers)?;
    let mut task = Task::new(Uuid::new_v4().to_string(), body.title);
    task.board_id = Some(board_id);
    task.description = body.description;
    task.progress = body.progress;
    db.lock().unwrap().tasks.push(task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PatchBody>,
) -> Result<Json<Task>, ApiError> {
    authorize(&db, &headers)?;
    let mut db = db.lock().unwrap();
    if db.fail_task_updates {
        return Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Server error updating task"));
    }
    let task = db
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Task not found"))?;
    if let Some(status) = body.status {
        task.status = status;
    }
    if let Some(progress) = body.progress {
        task.progress = progress;
    }
    if let Some(title) = body.title {
        task.title = title;
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&db, &headers)?;
    db.lock().unwrap().tasks.retain(|t| t.id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn spawn_api() -> (String, Db) {
    let db: Db = Arc::new(Mutex::new(FakeDb::default()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/boards", get(list_boards).post(create_board))
        .route("/api/boards/{id}", put(rename_board).delete(delete_board))
        .route("/api/boards/{id}/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .with_state(Arc::clone(&db));

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), db)
}

struct Yes;

#[async_trait]
impl Confirm for Yes {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Session already holding `token`, plus a client bound to it
async fn client_with_token(base_url: &str, token: &str) -> (SessionStore, Arc<HttpRemoteClient>) {
    let session = SessionStore::new(Arc::new(MemoryCredentialStore::with_token(token)));
    session.restore().await.unwrap();
    let client = Arc::new(HttpRemoteClient::new(base_url, session.handle()));
    (session, client)
}

#[tokio::test]
async fn test_login_flow_reaches_dashboard() {
    let (base_url, _db) = spawn_api().await;
    let session = SessionStore::new(Arc::new(MemoryCredentialStore::default()));
    let client = Arc::new(HttpRemoteClient::new(&base_url, session.handle()));
    let mut shell = AppShell::new(session, client.clone());

    assert_eq!(shell.boot(&mut Location::root()).await, &Screen::Auth);

    assert!(shell.login("dev@example.com", "nope").await.is_err());
    assert_eq!(shell.auth_error(), Some("Invalid credentials"));
    // A rejected login is not a session expiry
    assert!(!shell.process_signals().await);

    shell.login("dev@example.com", "secret").await.unwrap();
    assert_eq!(shell.screen(), &Screen::Dashboard);

    // Subsequent calls carry the credential
    assert!(client.list_boards().await.unwrap().is_empty());
    assert_eq!(
        shell.google_auth_url(),
        format!("{}/auth/google", base_url)
    );
}

#[tokio::test]
async fn test_signup_then_login() {
    let (base_url, _db) = spawn_api().await;
    let session = SessionStore::new(Arc::new(MemoryCredentialStore::default()));
    let client = HttpRemoteClient::new(&base_url, session.handle());

    client
        .signup(&Credentials::new("dev@example.com", "secret"))
        .await
        .unwrap();
    let credential = client
        .login(&Credentials::new("dev@example.com", "secret"))
        .await
        .unwrap();
    assert_eq!(credential.expose(), VALID_TOKEN);
}

#[tokio::test]
async fn test_board_lifecycle() {
    let (base_url, db) = spawn_api().await;
    let (_session, client) = client_with_token(&base_url, VALID_TOKEN).await;
    let boards = BoardSyncEngine::new(client.clone());

    boards.create("Sprint 1").await.unwrap();
    let set = boards.snapshot().await;
    assert_eq!(set.boards.len(), 1);
    assert_eq!(set.boards[0].name, "Sprint 1");

    let id = set.boards[0].id.clone();
    boards.rename(&id, "Sprint 2").await.unwrap();
    assert_eq!(boards.snapshot().await.boards[0].name, "Sprint 2");

    assert!(boards.delete(&id, &Yes).await.unwrap());
    assert!(boards.snapshot().await.boards.is_empty());

    let headers = db.lock().unwrap().auth_headers.clone();
    assert!(headers
        .iter()
        .all(|h| h.as_deref() == Some("Bearer valid-token")));
}

#[tokio::test]
async fn test_task_drag_to_done() {
    let (base_url, _db) = spawn_api().await;
    let (_session, client) = client_with_token(&base_url, VALID_TOKEN).await;
    client.create_board("Sprint 1").await.unwrap();
    let board_id = client.list_boards().await.unwrap()[0].id.clone();

    let tasks = TaskSyncEngine::new(client.clone());
    tasks.load(&board_id).await.unwrap();
    tasks
        .add(TaskDraft::new("Write release notes").with_description("for v1"))
        .await
        .unwrap();

    let set = tasks.snapshot().await;
    let task = set.column(TaskStatus::Todo)[0].clone();
    assert_eq!(task.progress, 0);
    assert_eq!(task.description.as_deref(), Some("for v1"));

    let mut events = tasks.subscribe();
    let mut drag = DragReorderController::new();
    drag.begin_drag(task.id.clone());
    drag.hover(TaskStatus::Done);
    assert!(drag.drop_on(TaskStatus::Done, &tasks).await.unwrap());
    drag.end_drag();

    let server_view = client.list_tasks(&board_id).await.unwrap();
    assert_eq!(server_view[0].status, TaskStatus::Done);
    assert_eq!(server_view[0].progress, 100);
    assert_eq!(
        events.try_recv().unwrap(),
        TaskEvent::Completed {
            task_id: task.id.clone()
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_progress_commit_reverts_to_server_value() {
    let (base_url, db) = spawn_api().await;
    let (_session, client) = client_with_token(&base_url, VALID_TOKEN).await;
    client.create_board("Sprint 1").await.unwrap();
    let board_id = client.list_boards().await.unwrap()[0].id.clone();

    let tasks = TaskSyncEngine::new(client.clone());
    tasks.load(&board_id).await.unwrap();
    tasks.add(TaskDraft::new("Profile queries")).await.unwrap();
    let id = tasks.snapshot().await.tasks[0].id.clone();
    tasks
        .update(&id, TaskMutation::status(TaskStatus::InProgress))
        .await
        .unwrap();

    db.lock().unwrap().fail_task_updates = true;
    let err = tasks.update(&id, TaskMutation::progress(70)).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500, .. }));

    let set = tasks.snapshot().await;
    assert_eq!(set.get(&id).unwrap().progress, 25);
    assert_eq!(set.tasks, client.list_tasks(&board_id).await.unwrap());
    assert_eq!(set.error_message(), Some("Server error updating task"));
}

#[tokio::test]
async fn test_stale_token_forces_logout() {
    let (base_url, _db) = spawn_api().await;
    let session = SessionStore::new(Arc::new(MemoryCredentialStore::with_token("expired")));
    let client = Arc::new(HttpRemoteClient::new(&base_url, session.handle()));
    let mut shell = AppShell::new(session, client.clone());
    assert_eq!(shell.boot(&mut Location::root()).await, &Screen::Dashboard);

    let boards = BoardSyncEngine::new(client.clone());
    let err = boards.load().await.unwrap_err();
    assert!(err.is_unauthorized());

    assert!(shell.process_signals().await);
    assert_eq!(shell.screen(), &Screen::Auth);
    assert_eq!(shell.auth_error(), Some(SESSION_EXPIRED_MESSAGE));
}

#[tokio::test]
async fn test_logout_discards_loaded_boards_and_tasks() {
    let (base_url, _db) = spawn_api().await;
    let session = SessionStore::new(Arc::new(MemoryCredentialStore::with_token(VALID_TOKEN)));
    let client = Arc::new(HttpRemoteClient::new(&base_url, session.handle()));
    let mut shell = AppShell::new(session, client.clone());
    shell.boot(&mut Location::root()).await;

    let boards = BoardSyncEngine::new(client.clone());
    let tasks = TaskSyncEngine::new(client.clone());
    boards.create("Private").await.unwrap();
    let board_id = boards.snapshot().await.boards[0].id.clone();
    tasks.load(&board_id).await.unwrap();
    tasks.add(TaskDraft::new("Salary review")).await.unwrap();

    shell.logout().await;
    boards.reset().await;
    tasks.reset().await;

    // Without a credential every load is rejected
    assert!(boards.load().await.is_err());
    assert!(tasks.load(&board_id).await.is_err());
    assert!(boards.snapshot().await.boards.is_empty());
    assert!(tasks.snapshot().await.tasks.is_empty());
    // No credential was attached, so this is not a session expiry
    assert!(!shell.process_signals().await);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_session, client) =
        client_with_token(&format!("http://{}/api", addr), VALID_TOKEN).await;
    match client.list_boards().await {
        Err(Error::Network(_)) => {}
        other => panic!("Expected network error, got: {:?}", other),
    }
}
