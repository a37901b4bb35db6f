use crate::errors::AppError;
use crate::models::{DashboardState, StatePatch};
use crate::nav::{NavOptions, NavOutcome, Navigator};
use crate::query;
use crate::router::NavigateOptions;
use crate::state::AppState;
use crate::storage;
use crate::ui::{self, PageDef};
use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
};
use std::sync::Arc;
use tracing::warn;

const LOCATION_PAGE: PageDef = PageDef {
    path: "/locations/:id",
    title: "Location",
    blurb: "Single club drill-down.",
};

pub async fn overview(State(app): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    serve_page(app, &ui::PAGES[0], query).await
}

pub async fn revenue(State(app): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    serve_page(app, &ui::PAGES[1], query).await
}

pub async fn bookings(State(app): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    serve_page(app, &ui::PAGES[2], query).await
}

pub async fn checkins(State(app): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    serve_page(app, &ui::PAGES[3], query).await
}

pub async fn visitors(State(app): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    serve_page(app, &ui::PAGES[4], query).await
}

pub async fn location_detail(
    State(app): State<AppState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    merge_query(&app, query.as_deref()).await;
    // Visiting a club page scopes the shared filters to that club.
    app.context
        .update(&StatePatch {
            location: Some(id.clone()),
            ..StatePatch::default()
        })
        .await;

    track_route(&app, &format!("/locations/{id}"));
    let state = app.context.state().await;
    Html(ui::render_dashboard(&LOCATION_PAGE, &state, &app.registry))
}

async fn serve_page(app: AppState, page: &PageDef, query: Option<String>) -> Html<String> {
    merge_query(&app, query.as_deref()).await;
    track_route(&app, page.path);
    let state = app.context.state().await;
    Html(ui::render_dashboard(page, &state, &app.registry))
}

async fn merge_query(app: &AppState, query: Option<&str>) {
    if let Some(query) = query {
        let patch = query::patch_from_query(query);
        if !patch.is_empty() {
            app.context.update(&patch).await;
        }
    }
}

fn track_route(app: &AppState, path: &str) {
    match app.router.lock() {
        Ok(router) => {
            router.navigate(
                path,
                &NavigateOptions {
                    source: Some("http".to_string()),
                },
            );
        }
        Err(_) => warn!("spa router lock poisoned, route tracking skipped"),
    }
}

pub async fn get_state(State(app): State<AppState>) -> Json<DashboardState> {
    Json(app.context.state().await)
}

pub async fn update_state(
    State(app): State<AppState>,
    Json(patch): Json<StatePatch>,
) -> Json<DashboardState> {
    Json(app.context.update(&patch).await)
}

pub async fn reset_state(State(app): State<AppState>) -> Json<DashboardState> {
    Json(app.context.reset().await)
}

pub async fn export_state(State(app): State<AppState>) -> impl IntoResponse {
    let state = app.context.state().await;
    (
        [(header::CONTENT_TYPE, "application/json")],
        storage::export_state(&state),
    )
}

pub async fn import_state(
    State(app): State<AppState>,
    body: String,
) -> Result<Json<DashboardState>, AppError> {
    let Some(patch) = storage::import_state(&body) else {
        return Err(AppError::bad_request("request body is not a valid state payload"));
    };
    Ok(Json(app.context.update(&patch).await))
}

pub async fn navigate(
    State(app): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Redirect, AppError> {
    let query = query.unwrap_or_default();
    let mut target = None;
    let mut replace = false;
    let mut params = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "to" => target = Some(value.into_owned()),
            "replace" => replace = value == "1" || value == "true",
            _ => params.push((key.into_owned(), value.into_owned())),
        }
    }
    let Some(target) = target else {
        return Err(AppError::bad_request("missing 'to' parameter"));
    };

    let mut navigator = Navigator::new(Some(Arc::clone(&app.context)));
    match navigator
        .navigate_to(&target, &NavOptions { params, replace })
        .await
    {
        NavOutcome::Load { url, .. } => Ok(Redirect::to(&url)),
        NavOutcome::Spa { path } => Ok(Redirect::to(&path)),
    }
}
