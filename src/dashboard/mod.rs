mod templates;

use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::app::{AppError, AppHandle};
use crate::job::{DraftField, JobId};
use crate::snapshot::Snapshot;
use crate::store::Event;

#[derive(Clone)]
struct DashboardState {
    app: AppHandle,
}

#[derive(Debug, Deserialize)]
struct NewJobForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    period: String,
}

pub fn router(app: AppHandle) -> Router {
    let state = DashboardState { app };

    Router::new()
        .route("/", get(overview))
        .route("/jobs", post(create_job))
        .route("/jobs/{id}/done", post(mark_done))
        .route("/jobs/{id}/delete", post(delete_job))
        .route("/data", get(load_data).post(save_data))
        .with_state(state)
}

fn unavailable(e: AppError) -> StatusCode {
    error!(error = %e, "Store unavailable");
    StatusCode::SERVICE_UNAVAILABLE
}

async fn overview(State(state): State<DashboardState>) -> Result<Html<String>, StatusCode> {
    let view = state.app.view().await.map_err(unavailable)?;
    Ok(Html(templates::render_page(&view)))
}

async fn create_job(
    State(state): State<DashboardState>,
    Form(form): Form<NewJobForm>,
) -> Result<Redirect, StatusCode> {
    for event in [
        Event::Draft(DraftField::Title(form.title)),
        Event::Draft(DraftField::Period(form.period)),
        Event::Create,
    ] {
        state.app.dispatch(event).await.map_err(unavailable)?;
    }
    Ok(Redirect::to("/"))
}

async fn mark_done(
    State(state): State<DashboardState>,
    Path(id): Path<u64>,
) -> Result<Redirect, StatusCode> {
    state
        .app
        .dispatch(Event::MarkDone(JobId(id)))
        .await
        .map_err(unavailable)?;
    Ok(Redirect::to("/"))
}

async fn delete_job(
    State(state): State<DashboardState>,
    Path(id): Path<u64>,
) -> Result<Redirect, StatusCode> {
    state
        .app
        .dispatch(Event::Delete(JobId(id)))
        .await
        .map_err(unavailable)?;
    Ok(Redirect::to("/"))
}

/// The live store's jobs, in the persisted wire format
async fn load_data(State(state): State<DashboardState>) -> Result<Response, StatusCode> {
    let snapshot = state.app.snapshot().await.map_err(unavailable)?;
    let body = snapshot.encode().map_err(|e| {
        error!(error = %e, "Failed to encode snapshot");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Replace the live store's jobs. The store persists the result itself.
async fn save_data(State(state): State<DashboardState>, body: String) -> StatusCode {
    let snapshot = match Snapshot::decode(&body) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Rejected malformed snapshot");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.app.dispatch(Event::Replace(snapshot)).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => unavailable(e),
    }
}
