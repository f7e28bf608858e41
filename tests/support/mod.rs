//! In-process stand-in for the admin backend: Axum router with JWT bearer
//! auth and in-memory collections, bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use backoffice::auth::{AuthCoordinator, LoggingNavigator};
use backoffice::manager::Prompter;
use backoffice::session::{MemoryTokenStore, TokenStore};
use backoffice::{ApiError, ClientConfig, HttpClient};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse";

pub const TESTIMONIALS: &str = "testimonials";
pub const CLIENTS: &str = "admin/clients";
pub const PROJECTS: &str = "admin/client-projects";

const SECRET_KEY: &[u8] = b"stub_backend_secret";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub struct Backend {
    password_hash: String,
    collections: Mutex<HashMap<&'static str, Vec<Value>>>,
    /// When set, every authenticated route answers 401.
    pub revoked: AtomicBool,
    pub unauthorized: AtomicUsize,
    pub requests: AtomicUsize,
    pub last_authorization: Mutex<Option<String>>,
}

impl Backend {
    pub fn new() -> Self {
        Self {
            password_hash: bcrypt::hash(ADMIN_PASSWORD, 4).unwrap(),
            collections: Mutex::new(HashMap::new()),
            revoked: AtomicBool::new(false),
            unauthorized: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
        }
    }

    pub fn records(&self, collection: &'static str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a record directly, bypassing validation. Returns its id.
    pub fn seed(&self, collection: &'static str, mut record: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        record["id"] = json!(id);
        if record.get("created_at").is_none() {
            record["created_at"] = json!(chrono::Utc::now().to_rfc3339());
        }
        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(record);
        id
    }
}

pub fn token_for(username: &str) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
        + 3600;
    let claims = Claims {
        sub: username.to_owned(),
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET_KEY)).unwrap()
}

fn validate_jwt(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET_KEY),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn auth_middleware(
    State(backend): State<Arc<Backend>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *backend.last_authorization.lock().unwrap() = header.clone();

    let valid = header
        .as_deref()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| validate_jwt(token).is_ok())
        .unwrap_or(false);

    if !valid || backend.revoked.load(Ordering::SeqCst) {
        backend.unauthorized.fetch_add(1, Ordering::SeqCst);
        // Hold the response so concurrent callers overlap on the client
        tokio::time::sleep(Duration::from_millis(10)).await;
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    next.run(req).await
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login_handler(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<LoginBody>,
) -> Response {
    let ok = body.username == ADMIN_USER
        && bcrypt::verify(&body.password, &backend.password_hash).unwrap_or(false);
    if !ok {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }
    let token = token_for(&body.username);
    Json(json!({ "access_token": token, "token_type": "bearer" })).into_response()
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn required_fields(collection: &str) -> &'static [&'static str] {
    match collection {
        TESTIMONIALS => &["name", "message"],
        CLIENTS => &["name", "email"],
        _ => &["name", "client_id"],
    }
}

fn list(backend: &Backend, collection: &'static str) -> Response {
    Json(Value::Array(backend.records(collection))).into_response()
}

fn fetch(backend: &Backend, collection: &'static str, id: &str) -> Response {
    match backend.records(collection).into_iter().find(|r| r["id"] == id) {
        Some(record) => Json(record).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn create(backend: &Backend, collection: &'static str, body: Value) -> Response {
    let Value::Object(mut fields) = body else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "Expected an object");
    };

    let missing: Vec<Value> = required_fields(collection)
        .iter()
        .filter(|f| {
            fields
                .get(**f)
                .and_then(Value::as_str)
                .map_or(true, |s| s.trim().is_empty())
        })
        .map(|f| json!({ "loc": ["body", f], "msg": "field required" }))
        .collect();
    if !missing.is_empty() {
        let body = Json(json!({ "detail": missing }));
        return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
    }

    if collection == PROJECTS {
        fields.entry("files").or_insert_with(|| json!([]));
        fields.entry("status").or_insert_with(|| json!("pending"));
        fields.entry("progress").or_insert_with(|| json!(0));
    }
    let id = backend.seed(collection, Value::Object(fields));
    fetch(backend, collection, &id)
}

fn update(backend: &Backend, collection: &'static str, id: &str, body: Value) -> Response {
    let Value::Object(patch) = body else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "Expected an object");
    };
    let mut collections = backend.collections.lock().unwrap();
    let records = collections.entry(collection).or_default();
    let Some(record) = records.iter_mut().find(|r| r["id"] == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found");
    };
    if let Some(fields) = record.as_object_mut() {
        merge(fields, patch);
        fields.insert("updated_at".into(), json!(chrono::Utc::now().to_rfc3339()));
    }
    Json(record.clone()).into_response()
}

fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if key != "id" {
            target.insert(key, value);
        }
    }
}

fn remove(backend: &Backend, collection: &'static str, id: &str) -> Response {
    let mut collections = backend.collections.lock().unwrap();
    let records = collections.entry(collection).or_default();
    let before = records.len();
    records.retain(|r| r["id"] != id);
    if records.len() == before {
        return detail(StatusCode::NOT_FOUND, "Not found");
    }
    Json(json!({ "message": "Deleted successfully" })).into_response()
}

fn collection_routes(collection: &'static str) -> Router<Arc<Backend>> {
    Router::new()
        .route(
            &format!("/api/{}/", collection),
            get(move |State(b): State<Arc<Backend>>| async move { list(&b, collection) }).post(
                move |State(b): State<Arc<Backend>>, Json(body): Json<Value>| async move {
                    create(&b, collection, body)
                },
            ),
        )
        .route(
            &format!("/api/{}/:id/", collection),
            get(move |State(b): State<Arc<Backend>>, Path(id): Path<String>| async move {
                fetch(&b, collection, &id)
            })
            .put(
                move |State(b): State<Arc<Backend>>,
                      Path(id): Path<String>,
                      Json(body): Json<Value>| async move { update(&b, collection, &id, body) },
            )
            .delete(move |State(b): State<Arc<Backend>>, Path(id): Path<String>| async move {
                remove(&b, collection, &id)
            }),
        )
}

async fn client_projects_handler(
    State(backend): State<Arc<Backend>>,
    Path(client_id): Path<String>,
) -> Response {
    if !backend.records(CLIENTS).iter().any(|c| c["id"] == client_id) {
        return detail(StatusCode::NOT_FOUND, "Client not found");
    }
    let projects: Vec<Value> = backend
        .records(PROJECTS)
        .into_iter()
        .filter(|p| p["client_id"] == client_id)
        .collect();
    Json(Value::Array(projects)).into_response()
}

async fn upload_handler(
    State(backend): State<Arc<Backend>>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.unwrap_or_default();
            upload = Some((filename, bytes.len()));
        }
    }
    let Some((filename, size)) = upload else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "file is required");
    };

    let mut collections = backend.collections.lock().unwrap();
    let projects = collections.entry(PROJECTS).or_default();
    let Some(project) = projects.iter_mut().find(|p| p["id"] == project_id) else {
        return detail(StatusCode::NOT_FOUND, "Project not found");
    };

    let file_id = uuid::Uuid::new_v4().to_string();
    let entry = json!({
        "id": file_id,
        "filename": filename,
        "file_path": format!("uploads/{}/{}", project_id, filename),
        "uploaded_at": chrono::Utc::now().to_rfc3339(),
        "uploaded_by": ADMIN_USER,
        "size": size,
    });
    if !project["files"].is_array() {
        project["files"] = json!([]);
    }
    if let Some(files) = project["files"].as_array_mut() {
        files.push(entry);
    }
    Json(json!({ "id": file_id, "filename": filename, "message": "File uploaded successfully" }))
        .into_response()
}

async fn delete_file_handler(
    State(backend): State<Arc<Backend>>,
    Path((project_id, file_id)): Path<(String, String)>,
) -> Response {
    let mut collections = backend.collections.lock().unwrap();
    let projects = collections.entry(PROJECTS).or_default();
    let Some(files) = projects
        .iter_mut()
        .find(|p| p["id"] == project_id)
        .and_then(|p| p.get_mut("files"))
        .and_then(Value::as_array_mut)
    else {
        return detail(StatusCode::NOT_FOUND, "Project not found");
    };
    let before = files.len();
    files.retain(|f| f["id"] != file_id);
    if files.len() == before {
        return detail(StatusCode::NOT_FOUND, "File not found");
    }
    Json(json!({ "message": "File deleted successfully" })).into_response()
}

pub fn create_router(backend: Arc<Backend>) -> Router {
    let auth_routes = Router::new()
        .merge(collection_routes(TESTIMONIALS))
        .merge(collection_routes(CLIENTS))
        .merge(collection_routes(PROJECTS))
        .route("/api/admin/clients/:id/projects/", get(client_projects_handler))
        .route("/api/admin/client-projects/:id/files/", post(upload_handler))
        .route(
            "/api/admin/client-projects/:id/files/:file_id/",
            delete(delete_file_handler),
        )
        .route_layer(middleware::from_fn_with_state(backend.clone(), auth_middleware));

    Router::new()
        .route("/api/", get(health_handler))
        .route("/api/auth/login", post(login_handler))
        .merge(auth_routes)
        .with_state(backend)
}

pub struct StubBackend {
    pub origin: String,
    pub backend: Arc<Backend>,
}

impl StubBackend {
    pub fn api_url(&self) -> String {
        format!("{}/api", self.origin)
    }
}

pub async fn spawn() -> StubBackend {
    let backend = Arc::new(Backend::new());
    let router = create_router(backend.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    StubBackend {
        origin: format!("http://{}", addr),
        backend,
    }
}

/// Memory store that counts wholesale clears.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTokenStore,
    pub clears: AtomicUsize,
}

impl TokenStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.inner.set(key, value)
    }

    fn clear(&self) -> Result<(), ApiError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

pub struct Session {
    pub http: Arc<HttpClient>,
    pub store: Arc<CountingStore>,
    pub navigator: Arc<LoggingNavigator>,
}

pub fn test_config(backend_url: Option<String>, origin: &str) -> ClientConfig {
    ClientConfig {
        backend_url,
        origin: origin.to_string(),
        timeout: Duration::from_secs(5),
        redirect_delay: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

/// Client wired against `config`, with the operator sitting on `route`.
pub fn session_with(config: &ClientConfig, route: &str) -> Session {
    let store = Arc::new(CountingStore::default());
    let navigator = Arc::new(LoggingNavigator::new(route));
    let auth = AuthCoordinator::new(store.clone(), navigator.clone())
        .with_login_route(config.login_route.clone())
        .with_redirect_delay(config.redirect_delay);
    let http = Arc::new(HttpClient::new(config, Arc::new(auth)).unwrap());
    Session {
        http,
        store,
        navigator,
    }
}

/// Client pointed at the stub's absolute API URL, signed in with a valid token.
pub fn signed_in(stub: &StubBackend) -> Session {
    let session = session_with(&test_config(Some(stub.api_url()), &stub.origin), "/admin");
    session.http.auth().sign_in(&token_for(ADMIN_USER)).unwrap();
    session
}

/// Answers every confirmation with a fixed value and records what was shown.
pub struct RecordingPrompter {
    answer: bool,
    pub confirms: Mutex<Vec<String>>,
    pub acks: Mutex<Vec<String>>,
}

impl RecordingPrompter {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            confirms: Mutex::new(Vec::new()),
            acks: Mutex::new(Vec::new()),
        })
    }

    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().unwrap().clone()
    }
}

impl Prompter for RecordingPrompter {
    fn confirm(&self, message: &str) -> bool {
        self.confirms.lock().unwrap().push(message.to_string());
        self.answer
    }

    fn acknowledge(&self, message: &str) {
        self.acks.lock().unwrap().push(message.to_string());
    }
}
