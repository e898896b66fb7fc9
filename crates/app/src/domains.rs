use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use domainhub_core::{CreateDomainRequest, Domain, UpdateDomainRequest};

use crate::accounts::reject_body;
use crate::auth::Identity;
use crate::pagination::{Page, PageParams, PageWindow};
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::telemetry::record_request;

const RESOURCE: &str = "domain";

/// Ownership scope taken from `?account_id=`. A missing value scopes to no
/// account, so lookups come back empty or not found.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    account_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    account_id: String,
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    per_page: Option<String>,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Domain>, ProblemResponse> {
    let outcome = state.domains().get(&id, &owner.account_id).await;
    record_request(RESOURCE, "get", &outcome);
    Ok(Json(outcome?))
}

pub async fn query(
    State(state): State<AppState>,
    Query(list): Query<ListQuery>,
) -> Result<Json<Page<Domain>>, ProblemResponse> {
    let service = state.domains();
    let params = PageParams {
        page: list.page,
        per_page: list.per_page,
    };
    let outcome = match service.count(&list.account_id).await {
        Ok(total) => {
            let window = PageWindow::new(&params, total);
            service
                .query(window.offset(), window.limit(), &list.account_id)
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
    Identity(_caller): Identity,
    payload: Result<Json<CreateDomainRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Domain>), ProblemResponse> {
    let Json(request) = payload.map_err(reject_body)?;
    let outcome = state.domains().create(request).await;
    record_request(RESOURCE, "create", &outcome);
    Ok((StatusCode::CREATED, Json(outcome?)))
}

pub async fn update(
    State(state): State<AppState>,
    Identity(_caller): Identity,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDomainRequest>, JsonRejection>,
) -> Result<Json<Domain>, ProblemResponse> {
    let Json(request) = payload.map_err(reject_body)?;
    let outcome = state.domains().update(&id, request).await;
    record_request(RESOURCE, "update", &outcome);
    Ok(Json(outcome?))
}

pub async fn delete(
    State(state): State<AppState>,
    Identity(_caller): Identity,
    Path(id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Domain>, ProblemResponse> {
    let outcome = state.domains().delete(&id, &owner.account_id).await;
    record_request(RESOURCE, "delete", &outcome);
    Ok(Json(outcome?))
}
