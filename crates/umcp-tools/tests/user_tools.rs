use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::Mutex;
use umcp_tools::users::{User, UserSearch};
use umcp_tools::{HttpUserService, InMemoryUserService, ToolRegistry, register_user_tools};

fn registry_with(service: Arc<dyn umcp_tools::UserService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_user_tools(&mut registry, service).unwrap();
    registry
}

#[test]
fn user_tools_are_listed_in_order() {
    let registry = registry_with(Arc::new(InMemoryUserService::new()));
    let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
    assert_eq!(
        names,
        ["get_user_by_id", "search_users", "add_user", "update_user", "delete_user"]
    );
    for descriptor in registry.list() {
        assert_eq!(descriptor.input_schema["type"], "object");
        assert!(!descriptor.description.is_empty());
    }
}

#[tokio::test]
async fn in_memory_crud_through_tools() {
    let registry = registry_with(Arc::new(InMemoryUserService::seeded()));

    let got = registry.invoke("get_user_by_id", json!({"id": 1})).await.unwrap();
    assert!(!got.is_error);
    assert!(got.first_text().unwrap().contains("id: 1"));

    let added = registry
        .invoke(
            "add_user",
            json!({"name": "Zoe", "surname": "Park", "email": "zoe.park@example.com"}),
        )
        .await
        .unwrap();
    assert!(added.first_text().unwrap().starts_with("User successfully added"));

    let found = registry.invoke("search_users", json!({"name": "zoe"})).await.unwrap();
    assert!(found.first_text().unwrap().starts_with("Found 1 users"));

    let updated = registry
        .invoke("update_user", json!({"id": 6, "new_info": {"company": "Globex"}}))
        .await
        .unwrap();
    assert!(updated.first_text().unwrap().contains("company: Globex"));

    let deleted = registry.invoke("delete_user", json!({"id": "6"})).await.unwrap();
    assert_eq!(deleted.first_text(), Some("User with id 6 successfully deleted"));

    let none = registry.invoke("search_users", json!({"name": "zoe"})).await.unwrap();
    assert_eq!(none.first_text(), Some("No users found"));
}

#[tokio::test]
async fn invalid_arguments_are_error_results() {
    let registry = registry_with(Arc::new(InMemoryUserService::seeded()));

    let missing = registry.invoke("get_user_by_id", json!({})).await.unwrap();
    assert!(missing.is_error);
    assert!(missing.first_text().unwrap().starts_with("Tool execution error:"));

    let bad_info = registry
        .invoke("update_user", json!({"id": 1, "new_info": "x"}))
        .await
        .unwrap();
    assert!(bad_info.is_error);

    let unknown = registry.invoke("get_user_by_id", json!({"id": 999})).await.unwrap();
    assert!(unknown.is_error);
    assert!(unknown.first_text().unwrap().contains("404"));
}

#[derive(Clone)]
struct MockState {
    token: String,
    users: Arc<Mutex<Vec<User>>>,
}

fn bearer_ok(headers: &HeaderMap, want: &str) -> bool {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|t| t == want)
}

async fn get_user(
    State(st): State<MockState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<User>, (StatusCode, Json<serde_json::Value>)> {
    if !bearer_ok(&headers, &st.token) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"detail": "bad token"}))));
    }
    let users = st.users.lock().await;
    users
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({"detail": "User not found"}))))
}

async fn search(
    State(st): State<MockState>,
    Query(filter): Query<UserSearch>,
) -> Json<Vec<User>> {
    let users = st.users.lock().await;
    let found = users
        .iter()
        .filter(|u| filter.name.as_deref().is_none_or(|n| u.name == n))
        .cloned()
        .collect();
    Json(found)
}

async fn spawn_mock(token: &str) -> (String, tokio::task::JoinHandle<()>) {
    let st = MockState {
        token: token.to_string(),
        users: Arc::new(Mutex::new(vec![User {
            id: 1,
            name: "Ava".into(),
            surname: "Thompson".into(),
            email: "ava@example.com".into(),
            phone: None,
            date_of_birth: None,
            gender: None,
            company: None,
            salary: None,
            about_me: None,
        }])),
    };
    let app = Router::new()
        .route("/v1/users/search", get(search))
        .route("/v1/users/:id", get(get_user))
        .with_state(st);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), task)
}

#[tokio::test]
async fn http_service_sends_bearer_and_maps_status() {
    let (base, task) = spawn_mock("tok").await;
    let timeout = umcp_tools::users::DEFAULT_TIMEOUT;

    let svc = HttpUserService::new(&base, Some("tok"), timeout).unwrap();
    let registry = registry_with(Arc::new(svc));

    let got = registry.invoke("get_user_by_id", json!({"id": 1})).await.unwrap();
    assert!(!got.is_error, "{got:?}");
    assert!(got.first_text().unwrap().contains("name: Ava"));

    let found = registry.invoke("search_users", json!({"name": "Ava"})).await.unwrap();
    assert!(found.first_text().unwrap().starts_with("Found 1 users"));

    let missing = registry.invoke("get_user_by_id", json!({"id": 2})).await.unwrap();
    assert!(missing.is_error);
    assert_eq!(
        missing.first_text(),
        Some("Tool execution error: User service returned 404: User not found")
    );

    let anon = HttpUserService::new(&base, None, timeout).unwrap();
    let registry = registry_with(Arc::new(anon));
    let denied = registry.invoke("get_user_by_id", json!({"id": 1})).await.unwrap();
    assert!(denied.first_text().unwrap().contains("401"));

    task.abort();
}

#[tokio::test]
async fn unreachable_service_is_error_result() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let svc = HttpUserService::new(
        format!("http://{addr}"),
        None,
        std::time::Duration::from_secs(2),
    )
    .unwrap();
    let registry = registry_with(Arc::new(svc));
    let result = registry.invoke("get_user_by_id", json!({"id": 1})).await.unwrap();
    assert!(result.is_error);
    assert!(result.first_text().unwrap().contains("user service"));
}
