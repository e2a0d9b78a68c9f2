use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mconnect_client::devices::merge_last_seen;
use mconnect_client::{CloudClient, CommunityBackend, LatestOnly, Session, SessionHolder};
use mconnect_shared::{
    CommunityId, Department, DeviceDraft, DeviceId, DeviceQuery, DeviceRecord, DeviceScope,
    DriverRecord, EmployeeId, EmployeeRow, Page, PageQuery, Position, SiteDirectory,
};
use mconnect_store::{Database, StoreError, StoredSession};
use mconnect_sync::{
    BulkOutcome, BulkTarget, DeleteRequest, Outcome, SaveMode, SaveRequest, SyncAction,
    SyncError, SyncOptions, Synchronizer,
};

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;

type ApiResult<T> = Result<Json<T>, ConsoleError>;

#[derive(Clone)]
pub struct AppState {
    pub cloud: CloudClient,
    pub sessions: SessionHolder,
    pub db: Arc<Mutex<Database>>,
    pub sites: Arc<SiteDirectory>,
    pub options: SyncOptions,
    list_gates: Arc<Mutex<HashMap<String, Arc<LatestOnly>>>>,
}

impl AppState {
    pub fn new(config: &ConsoleConfig, db: Database) -> Self {
        let mut cloud = CloudClient::new(config.cloud_api_base.clone());
        if let Some(uuid) = config.community_uuid.as_deref() {
            cloud = cloud.with_community_uuid(uuid);
        }

        Self {
            cloud,
            sessions: SessionHolder::new(Duration::seconds(config.session_max_age_secs)),
            db: Arc::new(Mutex::new(db)),
            sites: Arc::new(config.sites.clone()),
            options: SyncOptions {
                edit_miss: config.edit_miss_policy,
            },
            list_gates: Arc::default(),
        }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&mut Database) -> Result<T, StoreError>,
    ) -> Result<T, ConsoleError> {
        let mut db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut db)?)
    }

    /// Resume the session persisted by a previous run, if it is still live.
    pub async fn restore_session(&self) -> Result<(), ConsoleError> {
        let Some(stored) = self.with_db(|db| db.load_session())? else {
            return Ok(());
        };

        match Session::new(stored.access_token, stored.issued_at, stored.username) {
            Ok(session) if !session.is_expired_at(Utc::now(), self.sessions.max_age()) => {
                info!(user = %session.username(), "Restored session");
                self.sessions.set(session).await;
            }
            _ => {
                info!("Discarding stale persisted session");
                self.with_db(|db| db.clear_session())?;
            }
        }
        Ok(())
    }

    async fn session(&self) -> Result<Session, ConsoleError> {
        Ok(self.sessions.current().await?)
    }

    async fn end_session(&self) {
        self.sessions.clear().await;
        if let Err(e) = self.with_db(|db| db.clear_session()) {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    /// Clear the session if `result` failed because of it.
    async fn settle<T>(&self, result: Result<T, ConsoleError>) -> Result<T, ConsoleError> {
        if let Err(ref e) = result {
            if e.is_session_failure() {
                warn!(error = %e, "Session failure, forcing re-authentication");
                self.end_session().await;
            }
        }
        result
    }

    fn synchronizer(&self) -> Synchronizer<'_, CloudClient> {
        Synchronizer::new(&self.cloud, &self.sites, self.options)
    }

    fn home_community(&self, site: &str) -> Result<CommunityId, ConsoleError> {
        self.sites
            .resolve_partitions(site)
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::NoCommunities(site.trim().to_string()).into())
    }

    fn list_gate(&self, site: &str) -> Arc<LatestOnly> {
        let mut gates = self.list_gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.entry(site.trim().to_string()).or_default().clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/session", get(session_info))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .route("/sites/:site/departments", get(site_departments))
        .route(
            "/sites/:site/drivers",
            get(list_drivers).post(add_driver).put(edit_driver),
        )
        .route("/sites/:site/drivers/:id", get(get_driver))
        .route("/sites/:site/drivers/delete", post(delete_driver))
        .route("/sites/:site/drivers/bulk-delete", post(bulk_delete_drivers))
        .route("/communities/:id/devices", get(list_devices).post(add_device))
        .route(
            "/communities/:id/devices/:device_id",
            get(get_device).put(update_device),
        )
        .route("/communities/:id/devices/replace", post(replace_device))
        .route("/communities/:id/devices/delete", post(delete_devices))
        .route("/communities/:id/devices/lastseen/sync", post(sync_last_seen))
        .route("/communities/:id/positions", get(positions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Session> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ConsoleError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let session = state.cloud.login(req.username.trim(), &req.password).await?;
    state.with_db(|db| {
        db.save_session(&StoredSession {
            access_token: session.access_token().to_string(),
            issued_at: session.issued_at(),
            username: session.username().to_string(),
        })
    })?;
    state.cloud.push_cloud_token(&session).await;
    state.sessions.set(session.clone()).await;

    Ok(Json(session))
}

async fn logout(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.end_session().await;
    Json(serde_json::json!({ "loggedOut": true }))
}

async fn session_info(State(state): State<AppState>) -> ApiResult<Session> {
    let result = state.session().await;
    state.settle(result).await.map(Json)
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDriverBody {
    #[serde(flatten)]
    record: DriverRecord,
    /// Name of the selected home department.
    #[serde(default)]
    dept_name: Option<String>,
    /// Card number the record had before the edit.
    #[serde(default)]
    original_card_no: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteDriverBody {
    card_no: String,
}

#[derive(Serialize)]
struct SyncResponse {
    message: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
struct BulkResponse {
    message: String,
    #[serde(flatten)]
    outcome: BulkOutcome,
}

async fn run<T, F>(state: &AppState, body: F) -> ApiResult<T>
where
    F: Future<Output = Result<T, ConsoleError>>,
{
    let result = body.await;
    state.settle(result).await.map(Json)
}

async fn site_departments(
    State(state): State<AppState>,
    Path(site): Path<String>,
) -> ApiResult<Vec<Department>> {
    run(&state, async {
        let session = state.session().await?;
        let home = state.home_community(&site)?;
        Ok(state.cloud.departments(&session, &home).await?)
    })
    .await
}

/// Paged list of the site's home community. A newer request for the same
/// site supersedes one still in flight, which then answers 409.
async fn list_drivers(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<EmployeeRow>> {
    run(&state, async {
        let session = state.session().await?;
        let home = state.home_community(&site)?;
        let gate = state.list_gate(&site);
        gate.run(state.cloud.list_employees(&session, &home, &query))
            .await
            .ok_or(ConsoleError::Superseded)?
            .map_err(ConsoleError::from)
    })
    .await
}

async fn get_driver(
    State(state): State<AppState>,
    Path((site, id)): Path<(String, String)>,
) -> ApiResult<EmployeeRow> {
    run(&state, async {
        let session = state.session().await?;
        let home = state.home_community(&site)?;
        Ok(state
            .cloud
            .get_employee(&session, &home, &EmployeeId::new(id))
            .await?)
    })
    .await
}

async fn save_driver(
    state: &AppState,
    site: String,
    mode: SaveMode,
    body: SaveDriverBody,
) -> ApiResult<SyncResponse> {
    let action = match mode {
        SaveMode::Add => SyncAction::Add,
        SaveMode::Edit { .. } => SyncAction::Update,
    };
    let request = SaveRequest {
        site,
        mode,
        record: body.record,
        department_name: body.dept_name,
    };

    run(state, async {
        let session = state.session().await?;
        let outcome = state.synchronizer().save(&session, &request).await?;
        Ok(SyncResponse {
            message: outcome.summary(action, &request.site),
            outcome,
        })
    })
    .await
}

async fn add_driver(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Json(body): Json<SaveDriverBody>,
) -> ApiResult<SyncResponse> {
    save_driver(&state, site, SaveMode::Add, body).await
}

async fn edit_driver(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Json(body): Json<SaveDriverBody>,
) -> ApiResult<SyncResponse> {
    let original_card_no = body
        .original_card_no
        .clone()
        .unwrap_or_else(|| body.record.card_no.clone());
    save_driver(&state, site, SaveMode::Edit { original_card_no }, body).await
}

async fn delete_driver(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Json(body): Json<DeleteDriverBody>,
) -> ApiResult<SyncResponse> {
    let request = DeleteRequest {
        site,
        card_no: body.card_no,
    };

    run(&state, async {
        let session = state.session().await?;
        let outcome = state.synchronizer().delete(&session, &request).await?;
        Ok(SyncResponse {
            message: outcome.summary(SyncAction::Delete, &request.site),
            outcome,
        })
    })
    .await
}

async fn bulk_delete_drivers(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Json(target): Json<BulkTarget>,
) -> ApiResult<BulkResponse> {
    run(&state, async {
        let session = state.session().await?;
        let outcome = state
            .synchronizer()
            .bulk_delete(&session, &site, &target)
            .await?;
        Ok(BulkResponse {
            message: outcome.summary(),
            outcome,
        })
    })
    .await
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ScopeParams {
    community_uuid: Option<String>,
    dev_sn: Option<String>,
}

impl ScopeParams {
    fn scope(&self, community: String) -> DeviceScope {
        DeviceScope {
            community_id: CommunityId::new(community),
            community_uuid: self.community_uuid.clone().filter(|u| !u.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceDraftBody {
    #[serde(flatten)]
    draft: DeviceDraft,
    #[serde(default)]
    community_uuid: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceDeviceBody {
    old_dev_sn: String,
    new_dev_sn: String,
    #[serde(default)]
    community_uuid: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteDevicesBody {
    dev_sns: Vec<String>,
    #[serde(default)]
    community_uuid: Option<String>,
}

fn body_scope(community: String, uuid: Option<String>) -> DeviceScope {
    ScopeParams {
        community_uuid: uuid,
        dev_sn: None,
    }
    .scope(community)
}

/// Device page with last-seen filled in. The map is refreshed from the cloud
/// and persisted; when the refresh fails the cached copy is used.
async fn list_devices(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Query(params): Query<ScopeParams>,
    Query(query): Query<DeviceQuery>,
) -> ApiResult<Page<DeviceRecord>> {
    run(&state, async {
        let session = state.session().await?;
        let scope = params.scope(community);
        let mut page = state.cloud.list_devices(&session, &scope, &query).await?;

        let map = match state.cloud.last_seen_map(&session, &scope).await {
            Ok(map) => {
                state.with_db(|db| db.replace_last_seen(&map))?;
                map
            }
            Err(e) if e.is_session_failure() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Last-seen refresh failed, using cached map");
                state.with_db(|db| db.last_seen_map())?
            }
        };
        merge_last_seen(&mut page.list, &map, Utc::now());
        Ok(page)
    })
    .await
}

async fn get_device(
    State(state): State<AppState>,
    Path((community, device_id)): Path<(String, String)>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<DeviceRecord> {
    run(&state, async {
        let session = state.session().await?;
        let dev_sn = params.dev_sn.clone().unwrap_or_default();
        let scope = params.scope(community);
        let mut device = state
            .cloud
            .get_device(&session, &scope, &DeviceId::new(device_id), &dev_sn)
            .await?;

        let cached = state.with_db(|db| db.last_seen_map())?;
        merge_last_seen(std::slice::from_mut(&mut device), &cached, Utc::now());
        Ok(device)
    })
    .await
}

async fn add_device(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Json(body): Json<DeviceDraftBody>,
) -> ApiResult<serde_json::Value> {
    run(&state, async {
        let session = state.session().await?;
        let scope = body_scope(community, body.community_uuid.clone());
        state.cloud.add_device(&session, &scope, &body.draft).await?;
        Ok(serde_json::json!({ "message": "Device added successfully" }))
    })
    .await
}

async fn update_device(
    State(state): State<AppState>,
    Path((community, device_id)): Path<(String, String)>,
    Json(body): Json<DeviceDraftBody>,
) -> ApiResult<serde_json::Value> {
    run(&state, async {
        let session = state.session().await?;
        let scope = body_scope(community, body.community_uuid.clone());
        state
            .cloud
            .update_device(&session, &scope, &DeviceId::new(device_id), &body.draft)
            .await?;
        Ok(serde_json::json!({ "message": "Device updated successfully" }))
    })
    .await
}

async fn replace_device(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Json(body): Json<ReplaceDeviceBody>,
) -> ApiResult<serde_json::Value> {
    run(&state, async {
        let session = state.session().await?;
        let scope = body_scope(community, body.community_uuid.clone());
        state
            .cloud
            .replace_device(&session, &scope, &body.old_dev_sn, &body.new_dev_sn)
            .await?;
        Ok(serde_json::json!({ "message": "Device replaced successfully" }))
    })
    .await
}

async fn delete_devices(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Json(body): Json<DeleteDevicesBody>,
) -> ApiResult<serde_json::Value> {
    run(&state, async {
        if body.dev_sns.is_empty() {
            return Err(ConsoleError::BadRequest("No devices selected".into()));
        }
        let session = state.session().await?;
        let scope = body_scope(community, body.community_uuid.clone());
        state
            .cloud
            .delete_devices(&session, &scope, &body.dev_sns)
            .await?;
        Ok(serde_json::json!({ "deleted": body.dev_sns.len() }))
    })
    .await
}

async fn sync_last_seen(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<serde_json::Value> {
    run(&state, async {
        let session = state.session().await?;
        let scope = params.scope(community);
        let processed = state.cloud.sync_last_seen(&session, &scope).await?;

        let map = state.cloud.last_seen_map(&session, &scope).await?;
        state.with_db(|db| db.replace_last_seen(&map))?;
        Ok(serde_json::json!({ "processed": processed, "devices": map.len() }))
    })
    .await
}

async fn positions(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<Vec<Position>> {
    run(&state, async {
        let session = state.session().await?;
        let scope = params.scope(community);
        Ok(state.cloud.building_units(&session, &scope).await?)
    })
    .await
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting console HTTP API");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state_for(cloud_base: &str) -> AppState {
        let config = ConsoleConfig {
            cloud_api_base: cloud_base.to_string(),
            ..ConsoleConfig::default()
        };
        AppState::new(&config, Database::open_in_memory().unwrap())
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn log_in(state: &AppState) {
        let session = Session::new("tok", Utc::now(), "Admin123").unwrap();
        state.sessions.set(session).await;
    }

    /// Fake cloud where community 41982 has no "Sales" department and
    /// community 61476 rejects the token when `reject` is set.
    async fn spawn_cloud(reject: bool) -> String {
        use axum::extract::Query as Q;

        let departments = move |Q(q): Q<HashMap<String, String>>| async move {
            if reject && q.get("extCommunityId").map(String::as_str) == Some("61476") {
                return Json(json!({ "code": 401, "msg": "Invalid token" }));
            }
            match q.get("extCommunityId").map(String::as_str) {
                Some("41982") => Json(json!({ "code": 0, "data": [{ "id": 20, "name": "Ops" }] })),
                _ => Json(json!({ "code": 0, "data": [{ "id": 10, "name": "Sales" }] })),
            }
        };
        let app = Router::new()
            .route("/api/departments", get(departments))
            .route(
                "/api/employees",
                get(|| async { Json(json!({ "code": 0, "data": { "list": [], "totalCount": 0 } })) }),
            )
            .route(
                "/api/employees/add",
                post(|| async { Json(json!({ "code": 0, "msg": "成功" })) }),
            )
            .route("/api/devices/list", post(device_page))
            .route("/api/local/lastseen/map", get(last_seen_millis));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn device_page() -> Json<Value> {
        Json(json!({
            "code": 0,
            "data": {
                "list": [
                    { "id": 1, "devSn": "SN1", "name": "Gate A", "connectionStatus": 1 },
                    { "id": 2, "devSn": "SN2", "name": "Gate B", "connectionStatus": 0 }
                ],
                "totalCount": 2
            }
        }))
    }

    /// Last-seen map with an epoch-millisecond value five minutes old.
    async fn last_seen_millis() -> Json<Value> {
        let five_min_ago = (Utc::now() - Duration::minutes(5)).timestamp_millis();
        Json(json!({ "code": 0, "data": { "map": { "SN1": five_min_ago, "SN2": five_min_ago } } }))
    }

    fn driver_body() -> Value {
        json!({
            "name": "Tan Ah Kow",
            "cardNo": "111",
            "empNo": "E100",
            "dept": "10",
            "gender": 0,
            "deptName": "Sales"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_for("http://127.0.0.1:9");
        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_routes_require_session() {
        let state = state_for("http://127.0.0.1:9");
        for (method, uri) in [
            ("GET", "/session"),
            ("GET", "/sites/Bulim/departments"),
            ("GET", "/sites/Bulim/drivers"),
            ("GET", "/communities/61476/devices"),
        ] {
            let (status, body) = call(&state, method, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_unknown_site_is_bad_request() {
        let state = state_for("http://127.0.0.1:9");
        log_in(&state).await;

        let (status, body) = call(&state, "POST", "/sites/Jurong/drivers", Some(driver_body())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Community IDs not configured"));
    }

    #[tokio::test]
    async fn test_session_returns_user_without_token() {
        let state = state_for("http://127.0.0.1:9");
        log_in(&state).await;

        let (status, body) = call(&state, "GET", "/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "Admin123");
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_add_reports_partial_success() {
        let state = state_for(&spawn_cloud(false).await);
        log_in(&state).await;

        let (status, body) = call(&state, "POST", "/sites/Bulim/drivers", Some(driver_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "partial_success");
        assert_eq!(
            body["message"],
            "Saved in 61476; failed/skipped: 41982: Department \"Sales\" not found"
        );
    }

    #[tokio::test]
    async fn test_add_rejects_department_missing_from_home_catalog() {
        let state = state_for(&spawn_cloud(false).await);
        log_in(&state).await;

        let mut body = driver_body();
        body["dept"] = json!("99");
        let (status, body) = call(&state, "POST", "/sites/Bulim/drivers", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please select a valid department from the dropdown.");
    }

    #[tokio::test]
    async fn test_device_list_describes_last_seen() {
        let state = state_for(&spawn_cloud(false).await);
        log_in(&state).await;

        let (status, body) = call(&state, "GET", "/communities/61476/devices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], 2);
        assert!(body["list"][0]["lastSeenText"].is_null());
        assert_eq!(body["list"][1]["lastSeenText"], "5 min ago");

        let cached = state.with_db(|db| db.last_seen_map()).unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cached["SN2"].bytes().all(|b| b.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_rejected_token_clears_session() {
        let state = state_for(&spawn_cloud(true).await);
        log_in(&state).await;
        state
            .with_db(|db| {
                db.save_session(&StoredSession {
                    access_token: "tok".into(),
                    issued_at: Utc::now(),
                    username: "Admin123".into(),
                })
            })
            .unwrap();

        let (status, _) = call(&state, "POST", "/sites/Bulim/drivers", Some(driver_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(state.sessions.current().await.is_err());
        assert!(state.with_db(|db| db.load_session()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_session_skips_expired() {
        let state = state_for("http://127.0.0.1:9");
        state
            .with_db(|db| {
                db.save_session(&StoredSession {
                    access_token: "tok".into(),
                    issued_at: Utc::now() - Duration::hours(3),
                    username: "Admin123".into(),
                })
            })
            .unwrap();

        state.restore_session().await.unwrap();
        assert!(state.sessions.current().await.is_err());
        assert!(state.with_db(|db| db.load_session()).unwrap().is_none());
    }
}
