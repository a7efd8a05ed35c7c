use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderName, HeaderValue, Method, StatusCode, header::LOCATION},
    response::IntoResponse,
    routing::get,
};
use platform_api::{ApiJson, ApiQuery, ApiResult};
use products_hr::{EmployeeId, EmployeeRequest, EmployeeResponse, EmployeeService};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

const EMPLOYEE_API: &str = "/employee/api";

#[derive(Clone)]
pub struct AppState {
    pub employees: EmployeeService,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route(
            EMPLOYEE_API,
            get(get_employee)
                .post(add_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
        .route(
            &format!("{EMPLOYEE_API}/all"),
            get(list_employees).delete(delete_all_employees),
        )
        .route(&format!("{EMPLOYEE_API}/total-salary"), get(total_salary))
        .route(&format!("{EMPLOYEE_API}/salary"), get(salary_between))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct IdQuery {
    id: EmployeeId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalaryRangeQuery {
    min_salary: f64,
    max_salary: f64,
}

async fn add_employee(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmployeeRequest>,
) -> ApiResult<impl IntoResponse> {
    let confirmation = state.employees.add(request).await?;
    let location = confirmation
        .employee_id()
        .map(|id| format!("{EMPLOYEE_API}?id={id}"))
        .unwrap_or_else(|| EMPLOYEE_API.to_string());
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        confirmation.message(),
    ))
}

async fn get_employee(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<EmployeeResponse>> {
    Ok(Json(state.employees.get_by_id(query.id).await?))
}

async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    Ok(Json(state.employees.get_all().await?))
}

async fn total_salary(State(state): State<AppState>) -> ApiResult<Json<f64>> {
    Ok(Json(state.employees.total_salary().await?))
}

async fn update_employee(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
    ApiJson(request): ApiJson<EmployeeRequest>,
) -> ApiResult<&'static str> {
    let confirmation = state.employees.update(query.id, request).await?;
    Ok(confirmation.message())
}

async fn salary_between(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<SalaryRangeQuery>,
) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    let employees = state
        .employees
        .salary_between(range.min_salary, range.max_salary)
        .await?;
    Ok(Json(employees))
}

async fn delete_employee(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<&'static str> {
    let confirmation = state.employees.delete(query.id).await?;
    Ok(confirmation.message())
}

async fn delete_all_employees(State(state): State<AppState>) -> ApiResult<&'static str> {
    let confirmation = state.employees.delete_all().await?;
    Ok(confirmation.message())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.employees.store().ping().await.is_ok();
    Json(HealthResponse {
        ok: store_ok,
        store_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    store_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use platform_db::DatabaseSettings;
    use products_hr::InMemoryEmployeeStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        let config = AppConfig {
            database: DatabaseSettings::default(),
            cors_allowed_origins: Vec::new(),
        };
        build_router(AppState {
            employees: EmployeeService::new(Arc::new(InMemoryEmployeeStore::new())),
            config: Arc::new(config),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, http::HeaderMap, Vec<u8>) {
        let mut builder = http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn add_returns_created_with_location() {
        let app = router();
        let (status, headers, body) = send(
            &app,
            Method::POST,
            "/employee/api",
            Some(json!({"name": "John Doe", "salary": 45000.0, "department": "IT"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, b"Employee added");
        assert_eq!(headers[LOCATION], "/employee/api?id=1");
        assert!(headers.contains_key("x-request-id"));

        let (status, _, body) = send(&app, Method::GET, "/employee/api?id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({"id": 1, "name": "John Doe", "salary": 45000.0, "department": "IT"})
        );
    }

    #[tokio::test]
    async fn invalid_input_maps_to_bad_request() {
        let app = router();
        let (status, _, body) = send(
            &app,
            Method::POST,
            "/employee/api",
            Some(json!({"name": "John Doe", "sal": -1.0, "dept": "IT"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["code"], "INVALID_INPUT");

        let (status, _, _) = send(&app, Method::GET, "/employee/api?id=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/employee/api?id=-3",
            Some(json!({"name": "John", "salary": 1.0, "department": "IT"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_records_map_to_not_found() {
        let app = router();
        let (status, _, body) = send(&app, Method::GET, "/employee/api?id=5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(&body)["message"],
            "Employee Not Found For The Id 5"
        );

        let (status, _, _) = send(&app, Method::DELETE, "/employee/api?id=5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_aggregates() {
        let app = router();
        for (name, salary, department) in [("John Doe", 45000.0, "IT"), ("Jane Doe", 30000.0, "HR")]
        {
            send(
                &app,
                Method::POST,
                "/employee/api",
                Some(json!({"name": name, "salary": salary, "department": department})),
            )
            .await;
        }

        let (status, _, body) = send(
            &app,
            Method::PUT,
            "/employee/api?id=2",
            Some(json!({"name": "Jane Doe", "salary": 50000.0, "department": "HR"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Employee updated");

        let (_, _, body) = send(&app, Method::GET, "/employee/api/total-salary", None).await;
        assert_eq!(json_body(&body), json!(95000.0));

        let (_, _, body) = send(
            &app,
            Method::GET,
            "/employee/api/salary?minSalary=46000&maxSalary=50000",
            None,
        )
        .await;
        let hits = json_body(&body);
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["id"], 2);
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let app = router();
        let cases = [
            (Method::GET, "/employee/api?id=abc", None),
            (Method::GET, "/employee/api/salary?minSalary=1", None),
            (Method::DELETE, "/employee/api", None),
            (
                Method::POST,
                "/employee/api",
                Some(json!({"name": "John Doe", "salary": "lots", "department": "IT"})),
            ),
            (Method::POST, "/employee/api", Some(json!("not an object"))),
        ];
        for (method, uri, body) in cases {
            let (status, headers, bytes) = send(&app, method.clone(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            assert_eq!(headers[http::header::CONTENT_TYPE], "application/json");
            assert_eq!(json_body(&bytes)["code"], "INVALID_INPUT", "{method} {uri}");
        }

        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/employee/api")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn null_salary_counts_as_zero() {
        let app = router();
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/employee/api",
            Some(json!({"name": "Intern", "salary": null, "department": "IT"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, _, body) = send(&app, Method::GET, "/employee/api?id=1", None).await;
        assert_eq!(json_body(&body)["salary"], json!(0.0));

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/employee/api",
            Some(json!({"name": null, "salary": 1.0, "department": "IT"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(&body)["message"],
            "bad request: invalid name: cannot be null or empty"
        );
    }

    #[tokio::test]
    async fn delete_one_then_all() {
        let app = router();
        send(
            &app,
            Method::POST,
            "/employee/api",
            Some(json!({"name": "John Doe", "salary": 45000.0, "department": "IT"})),
        )
        .await;

        let (status, _, body) = send(&app, Method::DELETE, "/employee/api?id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Employee Deleted");

        for _ in 0..2 {
            let (status, _, body) = send(&app, Method::DELETE, "/employee/api/all", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"All Employees Deleted");
        }

        let (_, _, body) = send(&app, Method::GET, "/employee/api/all", None).await;
        assert_eq!(json_body(&body), json!([]));
    }

    #[tokio::test]
    async fn health_reports_store_status() {
        let app = router();
        let (status, _, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["ok"], true);
        assert_eq!(body["store_ok"], true);
    }
}
