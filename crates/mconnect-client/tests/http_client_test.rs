//! CloudClient against an in-process fake of the cloud API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use mconnect_client::devices::merge_last_seen;
use mconnect_client::{ClientError, CloudClient, CommunityBackend, Session};
use mconnect_shared::{
    CommunityId, DepartmentId, DeviceQuery, DeviceScope, DriverRecord, EmployeeId, Gender,
    PageQuery,
};

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

fn remember(seen: &Seen, route: &str, value: Value) {
    seen.lock().unwrap().push((route.to_string(), value));
}

async fn departments(
    State(seen): State<Seen>,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    remember(&seen, "departments", json!(q));
    match q.get("accessToken").map(String::as_str) {
        Some("expired") => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Unauthorized" }))),
        Some("stale") => (StatusCode::OK, Json(json!({ "code": 401, "msg": "Invalid token" }))),
        _ => (
            StatusCode::OK,
            Json(json!({ "code": 0, "data": [{ "id": 3, "name": "Sales" }, { "id": "4", "name": "Ops" }] })),
        ),
    }
}

async fn employees(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    remember(&seen, "employees", json!(q));
    Json(json!({
        "code": 0,
        "data": {
            "list": [{ "id": 7, "name": "Tan", "cardNo": 111, "empNo": "E1", "deptId": 3, "gender": "1" }],
            "totalCount": 1
        }
    }))
}

async fn add(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    remember(&seen, "add", body);
    Json(json!({ "code": 0, "msg": "成功" }))
}

async fn update(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    remember(&seen, "update", body);
    Json(json!({ "code": 10002, "msg": "部门不存在" }))
}

async fn remove(State(seen): State<Seen>) -> (StatusCode, Json<Value>) {
    remember(&seen, "remove", Value::Null);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "code": 0 })))
}

async fn login(Json(body): Json<Value>) -> Json<Value> {
    if body["password"] == "secret" {
        Json(json!({ "code": 0, "data": { "accessToken": "abc", "expiresIn": 1_772_352_000_000_i64 } }))
    } else {
        Json(json!({ "code": 1, "msg": "失败" }))
    }
}

async fn devices(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    remember(&seen, "devices", body);
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

async fn check(Json(body): Json<Value>) -> Json<Value> {
    let status = if body["devSn"] == "FREE" { 0 } else { 1 };
    Json(json!({ "code": 0, "data": { "status": status } }))
}

async fn lastseen_sync() -> Json<Value> {
    Json(json!({ "code": 0, "processed": 12 }))
}

async fn spawn_cloud() -> (CloudClient, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/departments", get(departments))
        .route("/api/employees", get(employees))
        .route("/api/employees/add", post(add))
        .route("/api/employees/update", post(update))
        .route("/api/employees/:id", delete(remove))
        .route("/api/devices/list", post(devices))
        .route("/api/devices/check", post(check))
        .route("/api/local/lastseen/sync", get(lastseen_sync))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (CloudClient::new(format!("http://{addr}/")), seen)
}

fn session(token: &str) -> Session {
    Session::new(token, Utc::now(), "Admin123").unwrap()
}

fn record() -> DriverRecord {
    DriverRecord {
        name: " Tan Ah Kow ".into(),
        card_no: "111".into(),
        emp_no: "E100".into(),
        job: None,
        department: DepartmentId::new("3"),
        gender: Gender::Female,
        phone: Some("98765432".into()),
    }
}

fn last(seen: &Seen, route: &str) -> Value {
    seen.lock()
        .unwrap()
        .iter()
        .rev()
        .find(|(r, _)| r == route)
        .map(|(_, v)| v.clone())
        .unwrap()
}

#[tokio::test]
async fn test_login_builds_session() {
    let (client, _) = spawn_cloud().await;

    let session = client.login("Admin123", "secret").await.unwrap();
    assert_eq!(session.access_token(), "abc");
    assert_eq!(session.issued_at().timestamp_millis(), 1_772_352_000_000);

    let err = client.login("Admin123", "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { message, .. } if message == "Failed"));
}

#[tokio::test]
async fn test_departments_accept_numeric_ids() {
    let (client, seen) = spawn_cloud().await;
    let community = CommunityId::new("61476");

    let list = client.departments(&session("tok"), &community).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id.as_str(), "3");
    assert_eq!(list[1].name, "Ops");

    let q = last(&seen, "departments");
    assert_eq!(q["accessToken"], "tok");
    assert_eq!(q["extCommunityId"], "61476");
}

#[tokio::test]
async fn test_token_rejections_are_session_failures() {
    let (client, _) = spawn_cloud().await;
    let community = CommunityId::new("61476");

    let err = client.departments(&session("expired"), &community).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidToken));

    let err = client.departments(&session("stale"), &community).await.unwrap_err();
    assert!(err.is_session_failure());
}

#[tokio::test]
async fn test_list_passes_filters_through() {
    let (client, seen) = spawn_cloud().await;
    let client = client.with_community_uuid("uuid-1");
    let query = PageQuery {
        name: Some(" Tan ".into()),
        dept: Some("".into()),
        page: 2,
        page_size: 20,
        ..PageQuery::default()
    };

    let page = client
        .list_employees(&session("tok"), &CommunityId::new("41982"), &query)
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.list[0].card_no, "111");
    assert_eq!(page.list[0].dept.as_deref(), Some("3"));
    assert_eq!(page.list[0].gender, Gender::Female);

    let q = last(&seen, "employees");
    assert_eq!(q["currPage"], "2");
    assert_eq!(q["pageSize"], "20");
    assert_eq!(q["name"], "Tan");
    assert_eq!(q["extCommunityUuid"], "uuid-1");
    assert!(q.get("dept").is_none());
}

#[tokio::test]
async fn test_add_sends_employee_body() {
    let (client, seen) = spawn_cloud().await;

    client
        .add_employee(&session("tok"), &CommunityId::new("61476"), &record())
        .await
        .unwrap();

    let body = last(&seen, "add");
    assert_eq!(body["name"], "Tan Ah Kow");
    assert_eq!(body["cardNo"], "111");
    assert_eq!(body["uuid"], "E100");
    assert_eq!(body["dept"], "3");
    assert_eq!(body["gender"], 1);
    assert_eq!(body["extCommunityId"], "61476");
    assert!(body.get("job").is_none());
}

#[tokio::test]
async fn test_update_rejection_is_translated() {
    let (client, seen) = spawn_cloud().await;

    let err = client
        .update_employee(
            &session("tok"),
            &CommunityId::new("61476"),
            &EmployeeId::new("7"),
            &record(),
        )
        .await
        .unwrap_err();

    match err {
        ClientError::Api { code, message } => {
            assert_eq!(code, 10002);
            assert_eq!(message, "Department does not exist");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(last(&seen, "update")["id"], "7");
}

#[tokio::test]
async fn test_server_error_status_fails_even_with_ok_code() {
    let (client, _) = spawn_cloud().await;

    let err = client
        .remove_employee(&session("tok"), &CommunityId::new("61476"), &EmployeeId::new("7"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { code: 500, .. }));
}

#[tokio::test]
async fn test_device_list_and_last_seen_merge() {
    let (client, seen) = spawn_cloud().await;
    let scope = DeviceScope {
        community_id: CommunityId::new("61476"),
        community_uuid: Some("uuid-1".into()),
    };

    let mut page = client
        .list_devices(&session("tok"), &scope, &DeviceQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 2);
    assert_eq!(last(&seen, "devices")["params"]["extCommunityId"], "61476");

    let map = [
        ("SN1".to_string(), "2026-03-01 08:00:00".to_string()),
        ("SN2".to_string(), "2026-03-01 09:00:00".to_string()),
    ]
    .into_iter()
    .collect();
    merge_last_seen(&mut page.list, &map, Utc::now());
    assert_eq!(page.list[0].last_seen, None);
    assert_eq!(page.list[1].last_seen.as_deref(), Some("2026-03-01 09:00:00"));
}

#[tokio::test]
async fn test_replace_refuses_bound_serial() {
    let (client, _) = spawn_cloud().await;
    let scope = DeviceScope {
        community_id: CommunityId::new("61476"),
        community_uuid: None,
    };

    let err = client
        .replace_device(&session("tok"), &scope, "SN1", "TAKEN")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SerialUnavailable(sn) if sn == "TAKEN"));

    let err = client
        .replace_device(&session("tok"), &scope, "SN1", "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn test_last_seen_sync_reports_processed() {
    let (client, _) = spawn_cloud().await;
    let scope = DeviceScope {
        community_id: CommunityId::new("61476"),
        community_uuid: None,
    };

    assert_eq!(client.sync_last_seen(&session("tok"), &scope).await.unwrap(), 12);
}
