use axum::extract::rejection::JsonRejection;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use super::routes::AppState;
use crate::error::RaghuError;
use crate::requests::NewRequest;

const SUBMIT_FAILED: &str = "Error saving your query. Please try again.";
const ANSWER_FAILED: &str = "Error getting AI answer";
const RATING_FAILED: &str = "Error saving rating";
const NOT_FOUND: &str = "Query not found";

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct AnswerQuery {
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Deserialize)]
pub struct RatingBody {
    #[serde(default)]
    pub rating: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// -- Pages ---------------------------------------------------------------

pub async fn form_page() -> Html<&'static str> {
    Html(include_str!("ui/form.html"))
}

pub async fn chat_page(Path(id): Path<String>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    // only a real id is ever interpolated into the page
    let id = Uuid::parse_str(&id)
        .map_err(|_| (StatusCode::NOT_FOUND, Html("<h2>Query not found</h2>".to_string())))?;
    Ok(Html(
        include_str!("ui/chat.html").replace("{{QUERY_ID}}", &id.to_string()),
    ))
}

// -- Submission ----------------------------------------------------------

pub async fn submit_query(
    State(state): State<AppState>,
    Form(fields): Form<NewRequest>,
) -> Response {
    match state.helpdesk.submit_request(&fields).await {
        Ok(id) => Redirect::to(&format!("/chat/{id}")).into_response(),
        Err(RaghuError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg).into_response(),
        Err(e) => {
            error!("submit query: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, SUBMIT_FAILED).into_response()
        }
    }
}

// -- Answer & Rating -----------------------------------------------------

pub async fn get_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<AnswerQuery>,
) -> Result<Json<AnswerResponse>, ApiError> {
    state
        .helpdesk
        .generate_answer(&id, q.regenerate)
        .await
        .map(|answer| Json(AnswerResponse { answer }))
        .map_err(|e| match e {
            RaghuError::NotFound(_) => api_error(StatusCode::NOT_FOUND, NOT_FOUND),
            e => {
                error!("get answer: {e}");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, ANSWER_FAILED)
            }
        })
}

pub async fn submit_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RatingBody>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(body) = body.map_err(|rej| api_error(StatusCode::BAD_REQUEST, rej.body_text()))?;
    state
        .helpdesk
        .submit_rating(&id, &body.rating)
        .await
        .map(|_| Json(OkResponse { ok: true }))
        .map_err(|e| match e {
            RaghuError::Validation(msg) => api_error(StatusCode::BAD_REQUEST, msg),
            RaghuError::NotFound(_) => api_error(StatusCode::NOT_FOUND, NOT_FOUND),
            e => {
                error!("submit rating: {e}");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, RATING_FAILED)
            }
        })
}

// -- Health --------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Result<Json<OkResponse>, ApiError> {
    state
        .helpdesk
        .store()
        .health_check()
        .await
        .map(|_| Json(OkResponse { ok: true }))
        .map_err(|e| {
            error!("health check: {e}");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        })
}
