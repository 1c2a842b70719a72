//! HTTP handler functions for the safety map API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use safety_map_page::ReportPage;
use safety_map_page::services::GeolocationError;
use safety_map_report_models::{Coordinate, Rating};
use safety_map_server_models::{
    ApiError, ApiHealth, ApiPageView, ApiSession, ApiSubmitResult, DescriptionUpdate,
    GeolocationReport, HoverUpdate, PageQueryParams, QueryUpdate, RatingUpdate,
};
use uuid::Uuid;

use crate::AppState;
use crate::geolocation::ClientGeolocator;
use crate::sessions::Session;

fn error(mut builder: actix_web::HttpResponseBuilder, message: impl Into<String>) -> HttpResponse {
    builder.json(ApiError {
        error: message.into(),
    })
}

fn view(session: &Session) -> HttpResponse {
    HttpResponse::Ok().json(ApiPageView::from(session.page.view()))
}

/// Looks up a session, or answers 404.
fn session(state: &AppState, id: &Uuid) -> Result<Arc<Session>, HttpResponse> {
    state.sessions.get(id).ok_or_else(|| {
        log::debug!("Unknown session {id}");
        error(HttpResponse::NotFound(), format!("Session {id} not found"))
    })
}

fn parse_rating(value: u8) -> Result<Rating, HttpResponse> {
    Rating::from_value(value).map_err(|e| error(HttpResponse::BadRequest(), e.to_string()))
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
    })
}

/// `POST /api/reports/{user_id}/sessions`
///
/// Opens a report page. A valid `lat`/`lng` pair seeds the location;
/// otherwise the client is asked for its position unless it passed
/// `geolocation=false`.
pub async fn create_session(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    params: web::Query<PageQueryParams>,
) -> HttpResponse {
    let user_id = user_id.into_inner();
    let query_coordinate = Coordinate::from_query(params.lat.as_deref(), params.lng.as_deref());
    let (geolocator, sender) = ClientGeolocator::channel(params.geolocation.unwrap_or(true));

    let page = ReportPage::open(
        user_id.as_str(),
        query_coordinate,
        state.services.clone(),
        Arc::new(geolocator),
    );
    let initial_location = page.initial_location();
    let view = page.view();
    let sender = initial_location.requested_geolocation().then_some(sender);

    let id = state.sessions.insert(Session::new(page, sender));
    log::info!("Opened report session {id} for user {user_id} ({initial_location})");

    HttpResponse::Created().json(ApiSession::new(id, initial_location, view))
}

/// `GET /api/sessions/{id}`
pub async fn get_session(state: web::Data<AppState>, id: web::Path<Uuid>) -> HttpResponse {
    match session(&state, &id) {
        Ok(session) => view(&session),
        Err(resp) => resp,
    }
}

/// `DELETE /api/sessions/{id}`
pub async fn close_session(state: web::Data<AppState>, id: web::Path<Uuid>) -> HttpResponse {
    if state.sessions.remove(&id) {
        log::info!("Closed report session {id}");
        HttpResponse::NoContent().finish()
    } else {
        error(HttpResponse::NotFound(), format!("Session {id} not found"))
    }
}

/// `POST /api/sessions/{id}/ready`
///
/// The client is interactive; the map widget may be constructed.
pub async fn client_ready(state: web::Data<AppState>, id: web::Path<Uuid>) -> HttpResponse {
    match session(&state, &id) {
        Ok(session) => {
            session.page.mark_client_ready();
            view(&session)
        }
        Err(resp) => resp,
    }
}

/// `POST /api/sessions/{id}/geolocation`
///
/// Delivers the client's answer to the one-shot position request.
pub async fn geolocation(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<GeolocationReport>,
) -> HttpResponse {
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let Some(sender) = session.take_geolocation() else {
        return error(
            HttpResponse::Conflict(),
            "No geolocation request is pending for this session",
        );
    };

    let answer = match body.into_inner() {
        GeolocationReport::Position {
            latitude,
            longitude,
        } => Ok(Coordinate::new(latitude, longitude)),
        GeolocationReport::Error { code, message } => {
            log::debug!(
                "Client geolocation error {code}: {}",
                message.as_deref().unwrap_or("")
            );
            Err(GeolocationError::from_code(code))
        }
    };

    if sender.send(answer).is_err() {
        log::debug!("Geolocation answer for session {id} arrived after the request was dropped");
    }
    HttpResponse::Accepted().finish()
}

/// `PUT /api/sessions/{id}/query`
pub async fn set_query(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<QueryUpdate>,
) -> HttpResponse {
    match session(&state, &id) {
        Ok(session) => {
            session.page.set_query(body.into_inner().query);
            view(&session)
        }
        Err(resp) => resp,
    }
}

/// `POST /api/sessions/{id}/suggestions/{index}`
pub async fn select_suggestion(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, usize)>,
) -> HttpResponse {
    let (id, index) = path.into_inner();
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    match session.page.select_suggestion(index) {
        Ok(_) => view(&session),
        Err(e) => {
            log::warn!("Failed to select suggestion {index} in session {id}: {e}");
            error(HttpResponse::UnprocessableEntity(), e.to_string())
        }
    }
}

/// `POST /api/sessions/{id}/search`
///
/// Search-form submit: selects the first suggestion, if any.
pub async fn submit_search(state: web::Data<AppState>, id: web::Path<Uuid>) -> HttpResponse {
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    match session.page.submit_search() {
        Ok(_) => view(&session),
        Err(e) => {
            log::warn!("Failed to select first suggestion in session {id}: {e}");
            error(HttpResponse::UnprocessableEntity(), e.to_string())
        }
    }
}

/// `PUT /api/sessions/{id}/location`
///
/// A point picked directly on the map.
pub async fn pick_location(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<Coordinate>,
) -> HttpResponse {
    match session(&state, &id) {
        Ok(session) => {
            session.page.pick_location(body.into_inner());
            view(&session)
        }
        Err(resp) => resp,
    }
}

/// `PUT /api/sessions/{id}/description`
pub async fn set_description(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<DescriptionUpdate>,
) -> HttpResponse {
    match session(&state, &id) {
        Ok(session) => {
            session.page.set_description(body.into_inner().description);
            view(&session)
        }
        Err(resp) => resp,
    }
}

/// `PUT /api/sessions/{id}/rating`
pub async fn set_rating(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<RatingUpdate>,
) -> HttpResponse {
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    match parse_rating(body.rating) {
        Ok(rating) => {
            session.page.set_rating(rating);
            view(&session)
        }
        Err(resp) => resp,
    }
}

/// `PUT /api/sessions/{id}/hover`
pub async fn hover_rating(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<HoverUpdate>,
) -> HttpResponse {
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let hover = match body.rating.map(parse_rating).transpose() {
        Ok(hover) => hover,
        Err(resp) => return resp,
    };
    session.page.hover_rating(hover);
    view(&session)
}

/// `POST /api/sessions/{id}/submit`
///
/// Validates and sends the report, answering once the report API has.
/// Validation and submission failures are part of the returned view, not
/// HTTP errors.
pub async fn submit(state: web::Data<AppState>, id: web::Path<Uuid>) -> HttpResponse {
    let session = match session(&state, &id) {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let outcome = session.page.submit().await;
    HttpResponse::Ok().json(ApiSubmitResult::new(&outcome, session.page.view()))
}
