//! API Router with Swagger UI

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::ParkingEngine;
use crate::domain::{ReservationState, SpotStatus, SpotStatusCounts};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::lots::{self, dto as lot_dto};
use crate::interfaces::http::modules::metrics::{self as metrics_module, MetricsState};
use crate::interfaces::http::modules::reservations::{self, dto as reservation_dto};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::handlers::health_check,
        // Lots
        lots::handlers::list_lots,
        lots::handlers::create_lot,
        lots::handlers::get_lot,
        lots::handlers::delete_lot,
        // Capacity
        lots::handlers::grow_lot,
        lots::handlers::shrink_lot,
        lots::handlers::resize_lot,
        // Spots
        lots::handlers::list_spots,
        lots::handlers::list_spot_details,
        // Reservations
        lots::handlers::allocate,
        reservations::handlers::list_reservations,
        reservations::handlers::get_reservation,
        reservations::handlers::check_in,
        reservations::handlers::check_out,
        reservations::handlers::cancel_reservation,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            lot_dto::CreateLotRequest,
            lot_dto::SpotCountRequest,
            lot_dto::ResizeRequest,
            lot_dto::LotDto,
            lot_dto::SpotDto,
            lot_dto::SpotDetailDto,
            reservation_dto::AllocateRequest,
            reservation_dto::CheckOutRequest,
            reservation_dto::ReservationDto,
            SpotStatus,
            SpotStatusCounts,
            ReservationState,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Lots", description = "Parking lot management"),
        (name = "Capacity", description = "Growing and shrinking a lot's spot inventory"),
        (name = "Spots", description = "Spot listings per lot"),
        (name = "Reservations", description = "Booking, check-in, check-out and cancellation"),
    ),
    info(
        title = "Parking Reservation API",
        version = "1.0.0",
        description = "REST API for parking lots, spot allocation and billing",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(
    engine: ParkingEngine,
    jwt_config: JwtConfig,
    health_state: HealthState,
    metrics_state: MetricsState,
) -> Router {
    let auth_state = AuthState { jwt_config };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Lot, capacity and spot routes (protected)
    let lot_routes = Router::new()
        .route("/", get(lots::handlers::list_lots).post(lots::handlers::create_lot))
        .route(
            "/{id}",
            get(lots::handlers::get_lot).delete(lots::handlers::delete_lot),
        )
        .route("/{id}/grow", post(lots::handlers::grow_lot))
        .route("/{id}/shrink", post(lots::handlers::shrink_lot))
        .route("/{id}/capacity", put(lots::handlers::resize_lot))
        .route("/{id}/spots", get(lots::handlers::list_spots))
        .route("/{id}/spots/details", get(lots::handlers::list_spot_details))
        .route("/{id}/reservations", post(lots::handlers::allocate))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(engine.clone());

    // Reservation routes (protected)
    let reservation_routes = Router::new()
        .route("/", get(reservations::handlers::list_reservations))
        .route(
            "/{id}",
            get(reservations::handlers::get_reservation)
                .delete(reservations::handlers::cancel_reservation),
        )
        .route("/{id}/check-in", post(reservations::handlers::check_in))
        .route("/{id}/check-out", post(reservations::handlers::check_out))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(engine);

    let health_routes = Router::new()
        .route("/health", get(health::handlers::health_check))
        .with_state(health_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_module::prometheus_metrics))
        .with_state(metrics_state);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/lots", lot_routes)
        .nest("/api/v1/reservations", reservation_routes)
        // route_layer so MatchedPath is already set when the middleware runs
        .route_layer(middleware::from_fn(metrics_module::http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::application::{create_event_bus, EngineConfig};
    use crate::infrastructure::crypto::jwt::create_token;
    use crate::infrastructure::InMemoryStorage;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "router-test-secret".to_string(),
            issuer: "parking-service".to_string(),
            expiration_hours: 1,
        }
    }

    fn app() -> Router {
        let engine = ParkingEngine::new(
            Arc::new(InMemoryStorage::new()),
            create_event_bus(64),
            &EngineConfig::default(),
        );
        create_api_router(
            engine,
            jwt_config(),
            HealthState::new(None),
            MetricsState { handle: None },
        )
    }

    fn bearer(user: &str, role: &str) -> String {
        format!("Bearer {}", create_token(user, role, &jwt_config()).unwrap())
    }

    async fn call(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_lot(app: &Router, capacity: u32) -> i64 {
        let admin = bearer("admin", "admin");
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/lots",
            Some(&admin),
            Some(json!({"name": "Central", "hourly_price": "5.00", "capacity": capacity})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/api/v1/lots", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn bad_token_is_401() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/api/v1/lots", Some("Bearer nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_cannot_create_lots() {
        let app = app();
        let user = bearer("alice", "user");
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/lots",
            Some(&user),
            Some(json!({"name": "Central", "hourly_price": "5.00", "capacity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_body_is_422() {
        let app = app();
        let admin = bearer("admin", "admin");
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/lots",
            Some(&admin),
            Some(json!({"name": "", "hourly_price": "5.00", "capacity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn booking_until_full_then_409() {
        let app = app();
        let lot_id = create_lot(&app, 1).await;
        let alice = bearer("alice", "user");
        let bob = bearer("bob", "user");
        let uri = format!("/api/v1/lots/{lot_id}/reservations");

        let (status, body) = call(&app, Method::POST, &uri, Some(&alice), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["state"], "Active");
        assert_eq!(body["data"]["user_id"], "alice");

        let (status, _) = call(&app, Method::POST, &uri, Some(&bob), Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, Method::GET, &format!("/api/v1/lots/{lot_id}"), Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["spots"]["reserved"], 1);
    }

    #[tokio::test]
    async fn check_in_and_out_bills_the_stay() {
        let app = app();
        let lot_id = create_lot(&app, 2).await;
        let alice = bearer("alice", "user");

        let (_, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/lots/{lot_id}/reservations"),
            Some(&alice),
            Some(json!({"start_time": "2026-10-14T09:00:00+05:30", "vehicle_number": "KA01AB1234"})),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["start_time"], "2026-10-14T03:30:00Z");

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/reservations/{id}/check-in"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/reservations/{id}/check-out"),
            Some(&alice),
            Some(json!({"end_time": "2026-10-14T05:30:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["state"], "Completed");
        let cost: Decimal = body["data"]["cost"].as_str().unwrap().parse().unwrap();
        assert_eq!(cost, Decimal::new(1000, 2));

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/reservations/{id}"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn other_users_reservations_are_hidden() {
        let app = app();
        let lot_id = create_lot(&app, 1).await;
        let alice = bearer("alice", "user");
        let bob = bearer("bob", "user");

        let (_, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/lots/{lot_id}/reservations"),
            Some(&alice),
            Some(json!({})),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = call(&app, Method::GET, &format!("/api/v1/reservations/{id}"), Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/api/v1/reservations?all=true", Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = bearer("admin", "admin");
        let (status, body) = call(&app, Method::GET, "/api/v1/reservations?all=true", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_reports_in_memory_store() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"]["status"], "in-memory");
    }

    #[tokio::test]
    async fn openapi_document_lists_lot_routes() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["paths"]["/api/v1/lots/{id}/reservations"].is_object());
    }
}
