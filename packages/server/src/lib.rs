#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the safety map report page.
//!
//! Each visitor of the report page gets a session holding a
//! [`safety_map_page::ReportPage`]. The client forwards user events
//! (keystrokes, suggestion picks, map picks, form edits, submit) to the
//! session endpoints and renders the page view returned by every call.
//! Sessions live in memory only.

pub mod geolocation;
mod handlers;
pub mod interactive;
pub mod sessions;

use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use safety_map_page::PageServices;

use crate::sessions::SessionStore;

/// Shared application state.
pub struct AppState {
    /// Open report page sessions.
    pub sessions: SessionStore,
    /// Place search and report API clients shared by every session.
    pub services: PageServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: PageServices) -> Self {
        Self {
            sessions: SessionStore::default(),
            services,
        }
    }
}

/// Sessions not touched for this long are evicted, unless
/// `SESSION_IDLE_SECS` says otherwise.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

async fn sweep_idle_sessions(state: web::Data<AppState>, max_idle: Duration) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let evicted = state.sessions.evict_idle(max_idle);
        if evicted > 0 {
            log::info!("Evicted {evicted} idle report session(s)");
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route(
                "/reports/{user_id}/sessions",
                web::post().to(handlers::create_session),
            )
            .service(
                web::scope("/sessions/{id}")
                    .route("", web::get().to(handlers::get_session))
                    .route("", web::delete().to(handlers::close_session))
                    .route("/ready", web::post().to(handlers::client_ready))
                    .route("/geolocation", web::post().to(handlers::geolocation))
                    .route("/query", web::put().to(handlers::set_query))
                    .route(
                        "/suggestions/{index}",
                        web::post().to(handlers::select_suggestion),
                    )
                    .route("/search", web::post().to(handlers::submit_search))
                    .route("/location", web::put().to(handlers::pick_location))
                    .route("/description", web::put().to(handlers::set_description))
                    .route("/rating", web::put().to(handlers::set_rating))
                    .route("/hover", web::put().to(handlers::hover_rating))
                    .route("/submit", web::post().to(handlers::submit)),
            ),
    );
}

/// Starts the safety map API server.
///
/// Builds the place search and report API clients from their embedded
/// configuration and the environment (`GEOCODER_URL`,
/// `GEOCODER_COUNTRY_CODES`, `REPORTS_API_URL`), then binds to
/// `BIND_ADDR`:`PORT` (default `127.0.0.1:8080`). Sessions idle for
/// `SESSION_IDLE_SECS` (default [`DEFAULT_SESSION_IDLE`]) are evicted. The caller provides the
/// async runtime, e.g. via `#[actix_web::main]`.
///
/// # Errors
///
/// Returns an `std::io::Result` error if a client cannot be configured,
/// or the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Configuring remote services...");
    let services = PageServices::from_env().map_err(|e| {
        log::error!("Failed to configure remote services: {e}");
        std::io::Error::other(e)
    })?;

    let state = web::Data::new(AppState::new(services));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let max_idle = std::env::var("SESSION_IDLE_SECS")
        .ok()
        .and_then(|secs| secs.parse().ok())
        .map_or(DEFAULT_SESSION_IDLE, Duration::from_secs);
    actix_rt::spawn(sweep_idle_sessions(state.clone(), max_idle));

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actix_web::{App, http::StatusCode, test};
    use safety_map_geocoder::GeocodeError;
    use safety_map_page::services::{PlaceSearchProvider, ReportSubmitter};
    use safety_map_report_models::{PlaceSuggestion, ReportPayload};
    use safety_map_submission::SubmitError;
    use serde_json::{Value, json};

    use super::*;

    struct FixedPlaces;

    #[async_trait::async_trait]
    impl PlaceSearchProvider for FixedPlaces {
        async fn search(&self, query: &str) -> Result<Vec<PlaceSuggestion>, GeocodeError> {
            Ok(vec![PlaceSuggestion {
                lat: "28.6139".to_string(),
                lon: "77.2090".to_string(),
                display_name: format!("{query}, Delhi, India"),
            }])
        }
    }

    #[derive(Default)]
    struct RecordingReports {
        sent: Mutex<Vec<ReportPayload>>,
    }

    #[async_trait::async_trait]
    impl ReportSubmitter for RecordingReports {
        async fn submit(&self, payload: &ReportPayload) -> Result<Value, SubmitError> {
            self.sent.lock().unwrap().push(payload.clone());
            safety_map_submission::interpret_response(
                reqwest::StatusCode::OK,
                r#"{"status":"ok"}"#,
            )
        }
    }

    fn app_state(reports: Arc<RecordingReports>) -> web::Data<AppState> {
        web::Data::new(AppState::new(PageServices {
            places: Arc::new(FixedPlaces),
            reports,
        }))
    }

    fn create_request(uri: &str) -> actix_web::test::TestRequest {
        test::TestRequest::post().uri(uri)
    }

    #[actix_web::test]
    async fn health_reports_session_count() {
        let state = app_state(Arc::default());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let created: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions?geolocation=false").to_request(),
        )
        .await;
        assert!(created["sessionId"].is_string());

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["sessions"], 1);
    }

    #[actix_web::test]
    async fn query_params_seed_session_and_map_waits_for_client() {
        let app =
            test::init_service(App::new().app_data(app_state(Arc::default())).configure(configure))
                .await;

        let created: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions?lat=19.07&lng=72.87").to_request(),
        )
        .await;
        assert_eq!(created["initialLocation"], "queryParams");
        assert_eq!(created["geolocationRequested"], false);
        assert_eq!(created["view"]["userId"], "u1");
        assert_eq!(created["view"]["map"]["status"], "loading");
        assert_eq!(
            created["view"]["coordinate"],
            json!({"latitude": 19.07, "longitude": 72.87})
        );

        let id = created["sessionId"].as_str().unwrap();
        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/ready"))
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["map"]["status"], "ready");
        assert_eq!(view["map"]["center"], json!({"latitude": 19.07, "longitude": 72.87}));

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/geolocation"))
            .set_json(json!({"latitude": 1.0, "longitude": 2.0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn client_geolocation_answer_sets_location() {
        let app =
            test::init_service(App::new().app_data(app_state(Arc::default())).configure(configure))
                .await;

        let created: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions").to_request(),
        )
        .await;
        assert_eq!(created["initialLocation"], "geolocationPending");
        assert_eq!(created["geolocationRequested"], true);
        let id = created["sessionId"].as_str().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/geolocation"))
            .set_json(json!({"latitude": 12.97, "longitude": 77.59}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(20)).await;

        test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/sessions/{id}/ready"))
                .to_request(),
        )
        .await;
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{id}"))
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["map"]["center"], json!({"latitude": 12.97, "longitude": 77.59}));
    }

    #[actix_web::test]
    async fn search_select_and_submit() {
        let reports = Arc::new(RecordingReports::default());
        let app = test::init_service(
            App::new()
                .app_data(app_state(Arc::clone(&reports)))
                .configure(configure),
        )
        .await;

        let created: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions?geolocation=false").to_request(),
        )
        .await;
        let id = created["sessionId"].as_str().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/sessions/{id}/query"))
            .set_json(json!({"query": "Connaught Place"}))
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["query"], "Connaught Place");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/search"))
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["query"], "Connaught Place, Delhi, India");
        assert_eq!(view["suggestions"], json!([]));

        for (path, body) in [
            ("description", json!({"description": "No street lights"})),
            ("rating", json!({"rating": 3})),
        ] {
            let req = test::TestRequest::put()
                .uri(&format!("/api/sessions/{id}/{path}"))
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/submit"))
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["outcome"], "submitted");
        assert_eq!(result["view"]["description"], "");
        assert_eq!(result["view"]["rating"], Value::Null);
        assert_eq!(result["view"]["messageIsFailure"], false);

        let sent = reports.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].latt, 28.6139);
        assert_eq!(sent[0].long, 77.2090);
        assert_eq!(sent[0].rating, 3);
    }

    #[actix_web::test]
    async fn invalid_submit_and_bad_input() {
        let reports = Arc::new(RecordingReports::default());
        let app = test::init_service(
            App::new()
                .app_data(app_state(Arc::clone(&reports)))
                .configure(configure),
        )
        .await;

        let created: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions?geolocation=false").to_request(),
        )
        .await;
        let id = created["sessionId"].as_str().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/sessions/{id}/rating"))
            .set_json(json!({"rating": 11}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/suggestions/0"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{id}/submit"))
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["outcome"], "invalid");
        assert_eq!(result["view"]["messageIsFailure"], true);
        assert!(reports.sent.lock().unwrap().is_empty());

        let req = test::TestRequest::delete()
            .uri(&format!("/api/sessions/{id}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{id}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn idle_sessions_are_evicted() {
        tokio::time::pause();
        let state = app_state(Arc::default());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let idle: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u1/sessions").to_request(),
        )
        .await;
        let active: Value = test::call_and_read_body_json(
            &app,
            create_request("/api/reports/u2/sessions?geolocation=false").to_request(),
        )
        .await;
        assert_eq!(idle["positionOptions"]["timeout"], 5000);
        assert_eq!(active["positionOptions"], Value::Null);
        let idle = idle["sessionId"].as_str().unwrap();
        let active = active["sessionId"].as_str().unwrap();

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{active}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        tokio::time::advance(Duration::from_secs(15 * 60)).await;
        assert_eq!(state.sessions.evict_idle(DEFAULT_SESSION_IDLE), 1);
        assert_eq!(state.sessions.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{idle}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{active}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
