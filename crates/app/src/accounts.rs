use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use domainhub_core::{Account, CreateAccountRequest, UpdateAccountRequest};

use crate::auth::Identity;
use crate::pagination::{Page, PageParams, PageWindow};
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::telemetry::record_request;

const RESOURCE: &str = "account";

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ProblemResponse> {
    let outcome = state.accounts().get(&id).await;
    record_request(RESOURCE, "get", &outcome);
    Ok(Json(outcome?))
}

pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Account>>, ProblemResponse> {
    let service = state.accounts();
    let outcome = match service.count().await {
        Ok(total) => {
            let window = PageWindow::new(&params, total);
            service
                .query(window.offset(), window.limit())
                .await
                .map(|items| window.with_items(items))
        }
        Err(err) => Err(err),
    };
    record_request(RESOURCE, "query", &outcome);
    Ok(Json(outcome?))
}

pub async fn create(
    State(state): State<AppState>,
    Identity(caller): Identity,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ProblemResponse> {
    let Json(request) = payload.map_err(reject_body)?;
    let outcome = state.accounts().create(request).await;
    record_request(RESOURCE, "create", &outcome);
    let account = outcome?;
    info!(stage = "http", caller = %caller.id, id = %account.id, "account created via api");
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update(
    State(state): State<AppState>,
    Identity(_caller): Identity,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<Account>, ProblemResponse> {
    let Json(request) = payload.map_err(reject_body)?;
    let outcome = state.accounts().update(&id, request).await;
    record_request(RESOURCE, "update", &outcome);
    Ok(Json(outcome?))
}

pub async fn delete(
    State(state): State<AppState>,
    Identity(_caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<Account>, ProblemResponse> {
    let outcome = state.accounts().delete(&id).await;
    record_request(RESOURCE, "delete", &outcome);
    Ok(Json(outcome?))
}

pub(crate) fn reject_body(rejection: JsonRejection) -> ProblemResponse {
    info!(stage = "http", error = %rejection.body_text(), "rejected request body");
    ProblemResponse::bad_request("invalid_body", rejection.body_text())
}
