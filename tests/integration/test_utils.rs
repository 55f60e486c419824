//! Shared test utilities for integration tests
//!
//! An in-memory registry that records every call and can be told to fail
//! specific operations, helpers for recording sinks, and an axum-served
//! emoji collection for the HTTP client.

use async_trait::async_trait;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use emote_sync::registry::CreatedResource;
use emote_sync::{Handle, RegistryClient, RegistryError, RemoteId, RemoteResource};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// One recorded registry call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    List,
    Create { name: String, content: Vec<u8> },
    Delete(RemoteId),
}

impl RegistryCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, RegistryCall::List)
    }
}

#[derive(Default)]
struct FakeState {
    resources: Vec<RemoteResource>,
    next_id: RemoteId,
    calls: Vec<RegistryCall>,
    fail_list: bool,
    fail_create: HashSet<String>,
    fail_delete: HashSet<RemoteId>,
    delete_not_found: HashSet<RemoteId>,
}

/// In-memory registry; uploads starting with `GIF8` come back animated
pub struct FakeRegistry {
    state: Mutex<FakeState>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1000,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_resource(self, id: RemoteId, name: &str, animated: bool) -> Self {
        self.state.lock().resources.push(RemoteResource {
            id,
            name: name.to_string(),
            animated,
        });
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<RegistryCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn resources(&self) -> Vec<RemoteResource> {
        self.state.lock().resources.clone()
    }

    pub fn resource(&self, id: RemoteId) -> Option<RemoteResource> {
        self.state.lock().resources.iter().find(|r| r.id == id).cloned()
    }

    /// Remove a resource behind the engine's back
    pub fn drop_resource(&self, id: RemoteId) {
        self.state.lock().resources.retain(|r| r.id != id);
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    pub fn fail_create(&self, name: &str) {
        self.state.lock().fail_create.insert(name.to_string());
    }

    pub fn fail_delete(&self, id: RemoteId) {
        self.state.lock().fail_delete.insert(id);
    }

    /// Answer deletes of `id` with NotFound while keeping it listed
    pub fn delete_reports_not_found(&self, id: RemoteId) {
        self.state.lock().delete_not_found.insert(id);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.fail_list = false;
        state.fail_create.clear();
        state.fail_delete.clear();
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn list_resources(&self) -> Result<Vec<RemoteResource>, RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall::List);
        if state.fail_list {
            return Err(RegistryError::Request("list unavailable".to_string()));
        }
        Ok(state.resources.clone())
    }

    async fn create_resource(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> Result<CreatedResource, RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall::Create {
            name: name.to_string(),
            content: content.clone(),
        });
        if state.fail_create.contains(name) {
            return Err(RegistryError::RateLimited { retry_after: None });
        }
        state.next_id += 1;
        let id = state.next_id;
        let animated = content.starts_with(b"GIF8");
        state.resources.push(RemoteResource {
            id,
            name: name.to_string(),
            animated,
        });
        Ok(CreatedResource { id, animated })
    }

    async fn delete_resource(&self, id: RemoteId) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        state.calls.push(RegistryCall::Delete(id));
        if state.fail_delete.contains(&id) {
            return Err(RegistryError::Unauthorized("missing permission".to_string()));
        }
        if state.delete_not_found.contains(&id) {
            return Err(RegistryError::NotFound(id));
        }
        let before = state.resources.len();
        state.resources.retain(|r| r.id != id);
        if state.resources.len() == before {
            return Err(RegistryError::NotFound(id));
        }
        Ok(())
    }
}

/// A sink that records every handle it receives
pub fn recording_sink() -> (
    Arc<Mutex<Vec<Handle>>>,
    impl Fn(&Handle) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    (seen, move |handle: &Handle| sink_seen.lock().push(handle.clone()))
}

/// Serializes environment variable access across tests in this binary
static ENV_MUTEX: Mutex<()> = parking_lot::const_mutex(());

/// Run `f` with the given variables set (`Some`) or removed (`None`), restoring them afterwards
pub fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock();
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(name, _)| (name.to_string(), std::env::var(name).ok()))
        .collect();

    for (name, value) in vars {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    let result = f();

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}

/// Resource held by [`StubHttpRegistry`]
///
/// An empty `name` is listed as JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEmoji {
    pub id: RemoteId,
    pub name: String,
    pub animated: bool,
}

#[derive(Default)]
struct StubState {
    collection: String,
    emojis: Vec<StubEmoji>,
    next_id: RemoteId,
    token: Option<String>,
    rate_limit_creates: bool,
    requests: Vec<String>,
}

type SharedStub = Arc<Mutex<StubState>>;

/// Emoji collection served by axum from a background thread
///
/// Routes `collections/:collection/emojis` for list and multipart create, and
/// `collections/:collection/emojis/:id` for delete.
pub struct StubHttpRegistry {
    pub base_url: String,
    pub collection: String,
    state: SharedStub,
}

impl StubHttpRegistry {
    pub fn start(collection: &str) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(StubState {
            collection: collection.to_string(),
            next_id: 5000,
            ..StubState::default()
        }));

        let app = Router::new()
            .route(
                "/collections/:collection/emojis",
                get(list_emojis).post(create_emoji),
            )
            .route("/collections/:collection/emojis/:id", delete(delete_emoji))
            .with_state(Arc::clone(&state));

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self {
            base_url: format!("http://{}", addr),
            collection: collection.to_string(),
            state,
        }
    }

    pub fn with_emoji(self, id: RemoteId, name: &str, animated: bool) -> Self {
        self.state.lock().emojis.push(StubEmoji {
            id,
            name: name.to_string(),
            animated,
        });
        self
    }

    pub fn require_token(&self, token: &str) {
        self.state.lock().token = Some(token.to_string());
    }

    pub fn rate_limit_creates(&self, enabled: bool) {
        self.state.lock().rate_limit_creates = enabled;
    }

    pub fn emojis(&self) -> Vec<StubEmoji> {
        self.state.lock().emojis.clone()
    }

    /// `METHOD path` for every request received
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }
}

/// Record the request and check collection and bearer token
fn admit(
    state: &mut StubState,
    method: &str,
    collection: &str,
    suffix: &str,
    headers: &HeaderMap,
) -> Result<(), Response> {
    state
        .requests
        .push(format!("{} /collections/{}/emojis{}", method, collection, suffix));

    if let Some(token) = &state.token {
        let expected = format!("Bearer {}", token);
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err((StatusCode::UNAUTHORIZED, "bad token").into_response());
        }
    }
    if collection != state.collection {
        return Err((StatusCode::NOT_FOUND, "unknown collection").into_response());
    }
    Ok(())
}

async fn list_emojis(
    State(state): State<SharedStub>,
    Path(collection): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock();
    if let Err(response) = admit(&mut state, "GET", &collection, "", &headers) {
        return response;
    }

    let listing: Vec<serde_json::Value> = state
        .emojis
        .iter()
        .map(|e| {
            let name = (!e.name.is_empty()).then(|| e.name.clone());
            serde_json::json!({ "id": e.id.to_string(), "name": name, "animated": e.animated })
        })
        .collect();
    Json(listing).into_response()
}

async fn create_emoji(
    State(state): State<SharedStub>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut name = None;
    let mut animated = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = field.text().await.ok(),
            Some("image") => {
                animated = field.content_type() == Some("image/gif");
                let _ = field.bytes().await;
            }
            _ => {}
        }
    }

    let mut state = state.lock();
    if let Err(response) = admit(&mut state, "POST", &collection, "", &headers) {
        return response;
    }
    if state.rate_limit_creates {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "3")],
            "slow down",
        )
            .into_response();
    }
    let Some(name) = name else {
        return (StatusCode::BAD_REQUEST, "missing name").into_response();
    };

    state.next_id += 1;
    let id = state.next_id;
    state.emojis.push(StubEmoji { id, name, animated });
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id, "animated": animated })),
    )
        .into_response()
}

async fn delete_emoji(
    State(state): State<SharedStub>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock();
    let suffix = format!("/{}", id);
    if let Err(response) = admit(&mut state, "DELETE", &collection, &suffix, &headers) {
        return response;
    }
    let Ok(id) = id.parse::<RemoteId>() else {
        return (StatusCode::BAD_REQUEST, "bad id").into_response();
    };

    let before = state.emojis.len();
    state.emojis.retain(|e| e.id != id);
    if state.emojis.len() == before {
        (StatusCode::NOT_FOUND, "unknown emoji").into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
