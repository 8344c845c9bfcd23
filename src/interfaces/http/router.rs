//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{LotService, QueryService, ReservationManager};
use crate::domain::Coordinates;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::metrics::{self, http_metrics_middleware, MetricsState};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::{parking_lots, reservations};

/// State shared by every route. Handlers extract the piece they need
/// through `FromRef`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub lots: Arc<LotService>,
    pub queries: Arc<QueryService>,
    pub reservations: Arc<ReservationManager>,
    pub health: HealthState,
    pub metrics: MetricsState,
}

impl AppState {
    pub fn new(
        lots: Arc<LotService>,
        queries: Arc<QueryService>,
        reservations: Arc<ReservationManager>,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        Self {
            health: HealthState {
                lots: lots.clone(),
                started_at: Arc::new(Instant::now()),
            },
            metrics: MetricsState {
                handle: prometheus_handle,
            },
            lots,
            queries,
            reservations,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Parking lots
        parking_lots::search_parking_lots,
        parking_lots::create_parking_lot,
        parking_lots::get_parking_lot,
        // Reservations
        reservations::reserve_spot,
        reservations::get_reservation,
        reservations::release_reservation,
    ),
    components(schemas(
        Coordinates,
        health::HealthResponse,
        parking_lots::CreateParkingLotRequest,
        parking_lots::ParkingLotDto,
        parking_lots::NearbyParkingLotDto,
        reservations::ReservationDto,
        reservations::ReserveResponse,
        ApiResponse<parking_lots::ParkingLotDto>,
        ApiResponse<reservations::ReserveResponse>,
        ApiResponse<reservations::ReservationDto>,
    )),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Parking Lots", description = "Lot registration and proximity search"),
        (name = "Reservations", description = "Spot reservation and release"),
    ),
    info(
        title = "Parking Service API",
        description = "Find parking lots near a location and reserve spots",
    )
)]
pub struct ApiDoc;

/// Build the REST API router.
pub fn create_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health & metrics
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        // Parking lots
        .route(
            "/parkinglots",
            get(parking_lots::search_parking_lots).post(parking_lots::create_parking_lot),
        )
        .route("/parkinglots/{pl_id}", get(parking_lots::get_parking_lot))
        // Reservations
        .route("/reserve", get(reservations::reserve_spot))
        .route("/reservations/{id}", get(reservations::get_reservation))
        .route(
            "/reservations/{id}/release",
            post(reservations::release_reservation),
        )
        // Middleware
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::infrastructure::{GridGeoIndex, InMemoryLotStore, InMemoryReservationRepository};
    use crate::interfaces::http::modules::request_id::REQUEST_ID_HEADER;

    fn app() -> Router {
        let lot_store = Arc::new(InMemoryLotStore::default());
        let index = Arc::new(GridGeoIndex::new(GridGeoIndex::DEFAULT_CELL_SIZE_DEGREES).unwrap());
        let state = AppState::new(
            Arc::new(LotService::new(lot_store.clone(), index.clone())),
            Arc::new(QueryService::new(index, lot_store.clone())),
            Arc::new(ReservationManager::new(
                lot_store,
                Arc::new(InMemoryReservationRepository::new()),
            )),
            PrometheusBuilder::new().build_recorder().handle(),
        );
        create_api_router(state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn create_lot(app: &Router, lat: f64, lon: f64, spots: i64) -> u64 {
        let (status, body) = send(
            app,
            post_json(
                "/parkinglots",
                json!({
                    "name": "Amir Temur",
                    "address": "Amir Temur ko'chasi 1",
                    "coordinates": {"latitude": lat, "longitude": lon},
                    "total_spots": spots
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn create_then_get_and_search() {
        let app = app();
        let id = create_lot(&app, 41.311, 69.279, 3).await;

        let (status, body) = send(&app, get(&format!("/parkinglots/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total_spots"], 3);
        assert_eq!(body["data"]["available_spots"], 3);

        let (status, body) = send(
            &app,
            get("/parkinglots?username=alice&coorx=41.3115&coory=69.279&radius=500"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let hits = body["data"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["lot"]["id"].as_u64(), Some(id));
        assert!(hits[0]["distance_meters"].as_f64().unwrap() < 100.0);
    }

    #[tokio::test]
    async fn search_orders_by_distance_and_skips_far_lots() {
        let app = app();
        let far = create_lot(&app, 41.33, 69.279, 1).await;
        let near = create_lot(&app, 41.3105, 69.279, 1).await;
        let middle = create_lot(&app, 41.315, 69.279, 1).await;

        let (_, body) = send(
            &app,
            get("/parkinglots?username=alice&coorx=41.31&coory=69.279&radius=1000"),
        )
        .await;
        let ids: Vec<u64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["lot"]["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![near, middle]);
        assert!(!ids.contains(&far));
    }

    #[tokio::test]
    async fn invalid_search_arguments_are_400() {
        let app = app();
        let (status, body) = send(
            &app,
            get("/parkinglots?username=alice&coorx=95&coory=10&radius=100"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            get("/parkinglots?username=alice&coorx=10&coory=10&radius=-1"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_capacity() {
        let app = app();
        for spots in [0, -4] {
            let (status, body) = send(
                &app,
                post_json(
                    "/parkinglots",
                    json!({
                        "name": "Broken",
                        "coordinates": {"latitude": 1.0, "longitude": 1.0},
                        "total_spots": spots
                    }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
        }

        let (_, body) = send(
            &app,
            get("/parkinglots?username=alice&coorx=1&coory=1&radius=1000"),
        )
        .await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (_, health) = send(&app, get("/health")).await;
        assert_eq!(health["parking_lots"], 0);
    }

    #[tokio::test]
    async fn create_rejects_empty_name() {
        let app = app();
        let (status, _) = send(
            &app,
            post_json(
                "/parkinglots",
                json!({
                    "name": "",
                    "coordinates": {"latitude": 1.0, "longitude": 1.0},
                    "total_spots": 5
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_lot_is_404() {
        let app = app();
        let (status, body) = send(&app, get("/parkinglots/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, get("/reserve?username=alice&parkID=404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reserve_until_full_then_release() {
        let app = app();
        let id = create_lot(&app, 41.3, 69.2, 1).await;

        let (status, body) =
            send(&app, get(&format!("/reserve?username=alice&parkID={}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "granted");
        assert_eq!(body["data"]["reservation"]["state"], "ACTIVE");
        let reservation_id = body["data"]["reservation"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, body) =
            send(&app, get(&format!("/reserve?username=bob&parkID={}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "denied");
        assert!(body["data"]["reservation"].is_null());

        let (status, body) = send(
            &app,
            post_empty(&format!("/reservations/{}/release", reservation_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "RELEASED");
        assert_eq!(body["data"]["release_reason"], "cancelled");

        let (status, _) = send(
            &app,
            post_empty(&format!("/reservations/{}/release", reservation_id)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, get(&format!("/parkinglots/{}", id))).await;
        assert_eq!(body["data"]["available_spots"], 1);

        let (_, body) = send(&app, get(&format!("/reserve?username=bob&parkID={}", id))).await;
        assert_eq!(body["data"]["outcome"], "granted");
    }

    #[tokio::test]
    async fn request_token_makes_reserve_idempotent() {
        let app = app();
        let id = create_lot(&app, 41.3, 69.2, 5).await;
        let uri = format!("/reserve?username=alice&parkID={}&requestToken=abc-1", id);

        let (_, first) = send(&app, get(&uri)).await;
        let (_, second) = send(&app, get(&uri)).await;
        assert_eq!(
            first["data"]["reservation"]["id"],
            second["data"]["reservation"]["id"]
        );

        let (_, lot) = send(&app, get(&format!("/parkinglots/{}", id))).await;
        assert_eq!(lot["data"]["available_spots"], 4);
    }

    #[tokio::test]
    async fn get_reservation_roundtrip() {
        let app = app();
        let id = create_lot(&app, 41.3, 69.2, 2).await;
        let (_, body) = send(&app, get(&format!("/reserve?username=carol&parkID={}", id))).await;
        let reservation_id = body["data"]["reservation"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get(&format!("/reservations/{}", reservation_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "carol");
        assert_eq!(body["data"]["lot_id"].as_u64(), Some(id));

        let (status, _) = send(
            &app,
            get(&format!("/reservations/{}", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_lot_count() {
        let app = app();
        create_lot(&app, 41.3, 69.2, 2).await;

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["parking_lots"], 1);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn request_id_is_echoed_or_generated() {
        let app = app();
        let req = Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "trace-me")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-me");

        let resp = app.oneshot(get("/health")).await.unwrap();
        let generated = resp.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text() {
        let app = app();
        let resp = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }

    #[test]
    fn openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/parkinglots",
            "/parkinglots/{pl_id}",
            "/reserve",
            "/reservations/{id}",
            "/reservations/{id}/release",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
