use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use domainhub_core::{AccountService, DomainService};
use domainhub_storage::Database;

use crate::auth::TokenValidator;
use crate::{accounts, domains, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    accounts: AccountService,
    domains: DomainService,
    token_validator: TokenValidator,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        accounts: AccountService,
        domains: DomainService,
        token_validator: TokenValidator,
    ) -> Self {
        Self {
            metrics,
            accounts,
            domains,
            token_validator,
        }
    }

    /// Wires both services to the SQLite repositories of `database`.
    pub fn from_database(metrics: PrometheusHandle, database: &Database, signing_key: &[u8]) -> Self {
        Self::new(
            metrics,
            AccountService::new(Arc::new(database.accounts())),
            DomainService::new(Arc::new(database.domains())),
            TokenValidator::new(signing_key),
        )
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn domains(&self) -> &DomainService {
        &self.domains
    }

    pub fn token_validator(&self) -> &TokenValidator {
        &self.token_validator
    }
}

/// Builds the HTTP surface. Reads are public; handlers that take an
/// `Identity` require a bearer token.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/v1/accounts", get(accounts::query).post(accounts::create))
        .route(
            "/v1/accounts/:id",
            get(accounts::get)
                .put(accounts::update)
                .delete(accounts::delete),
        )
        .route("/v1/domains", get(domains::query).post(domains::create))
        .route(
            "/v1/domains/:id",
            get(domains::get).put(domains::update).delete(domains::delete),
        )
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
