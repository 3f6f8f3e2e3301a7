// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{self, claims::VerifiedClaims, roles::Role},
    gate,
    state::AppState,
};

pub mod admin;
pub mod health;
pub mod session;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/callback", post(session::auth_callback))
        .route("/me", get(session::me))
        .route("/admin/keys/refresh", post(admin::refresh_keys))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .nest("/v1", protected)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Gate stages. Axum runs the last-added layer first, so requests
        // flow: rate limit -> origin -> sanitize -> headers -> audit.
        .layer(middleware::from_fn(gate::audit::audit_log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::headers::security_headers,
        ))
        .layer(middleware::from_fn(gate::sanitize::sanitize))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::origin::same_origin,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::rate_limit::enforce,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::auth_callback,
        session::me,
        admin::refresh_keys
    ),
    components(schemas(
        VerifiedClaims,
        Role,
        session::CallbackResponse,
        admin::RefreshResponse,
        health::ReadyResponse,
        health::HealthChecks,
        health::HealthResponse
    )),
    tags(
        (name = "Session", description = "Token-gated session endpoints"),
        (name = "Admin", description = "Administrative operations"),
        (name = "Health", description = "Probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::testutil;
    use crate::config::tests::test_config;
    use crate::config::AppConfig;
    use crate::directory::InMemoryDirectory;

    fn app_with(config: AppConfig) -> Router {
        let state = AppState::new(
            config,
            Arc::new(testutil::StaticKeySource::default_set()),
            Arc::new(InMemoryDirectory::new()),
        );
        router(state)
    }

    fn app() -> Router {
        app_with(test_config())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bearer(claims: &serde_json::Value) -> String {
        format!("Bearer {}", testutil::sign_token(claims))
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn every_response_carries_security_headers() {
        let response = app()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("referrer-policy"));
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_identity() {
        let request = Request::get("/v1/me")
            .header("Authorization", bearer(&testutil::valid_claims()))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["subject"], "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert_eq!(body["email"], "user@app.example");
        assert_eq!(body["email_verified"], true);
        assert_eq!(body["role"], "user");
    }

    #[tokio::test]
    async fn garbage_token_yields_uniform_401() {
        let request = Request::get("/v1/me")
            .header("Authorization", "Bearer garbage")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn missing_token_yields_401() {
        let response = app()
            .oneshot(Request::get("/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "authorization_required");
    }

    #[tokio::test]
    async fn callback_records_identity_and_redirects_first_visit() {
        let request = Request::post("/v1/auth/callback")
            .header("Origin", "https://app.example")
            .header("Authorization", bearer(&testutil::valid_claims()))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["user_id"], "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert_eq!(body["redirect_to"], "/onboarding");
    }

    #[tokio::test]
    async fn callback_from_foreign_origin_is_rejected_before_auth() {
        let request = Request::post("/v1/auth/callback")
            .header("Origin", "https://evil.example")
            .header("Authorization", bearer(&testutil::valid_claims()))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_route_requires_admin_role() {
        let app = app();

        let mut admin_claims = testutil::valid_claims();
        admin_claims["role"] = serde_json::json!("admin");
        let request = Request::post("/v1/admin/keys/refresh")
            .header("Origin", "https://app.example")
            .header("Authorization", bearer(&admin_claims))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::post("/v1/admin/keys/refresh")
            .header("Origin", "https://app.example")
            .header("Authorization", bearer(&testutil::valid_claims()))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn over_limit_requests_get_429_with_retry_after() {
        let mut config = test_config();
        config.rate_limits.general_limit = 3;
        let app = app_with(config);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: u64 = response.headers()[header::RETRY_AFTER.as_str()]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after >= 1 && retry_after <= 60);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_end_to_end() {
        let mut claims = testutil::valid_claims();
        claims["exp"] = serde_json::json!(chrono::Utc::now().timestamp() - 600);

        let request = Request::get("/v1/me")
            .header("Authorization", bearer(&claims))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        // Same external shape as any other rejection.
        assert_eq!(body["error_code"], "invalid_token");
    }
}
