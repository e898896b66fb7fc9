use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::entity::{deserialize_opaque_id, Domain};
use crate::error::{RepositoryError, ServiceError};
use crate::validation::{Validate, ValidationErrors, MAX_TEXT_LEN};
use crate::{system_clock, Clock};

/// Storage contract for domains. Every call is scoped to one owning account.
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Returns the domain with the given id owned by `account_id`.
    async fn get(&self, id: &str, account_id: &str) -> Result<Domain, RepositoryError>;
    /// Returns the number of domains owned by `account_id`.
    async fn count(&self, account_id: &str) -> Result<u64, RepositoryError>;
    /// Returns the account's domains ordered by id.
    async fn query(
        &self,
        offset: u64,
        limit: u64,
        account_id: &str,
    ) -> Result<Vec<Domain>, RepositoryError>;
    /// Persists a new domain, generating its id when empty.
    async fn create(&self, domain: Domain) -> Result<Domain, RepositoryError>;
    /// Overwrites the row matching both `id` and `account_id`.
    async fn update(&self, domain: &Domain) -> Result<(), RepositoryError>;
    /// Removes the domain with the given id owned by `account_id`.
    async fn delete(&self, id: &str, account_id: &str) -> Result<(), RepositoryError>;
}

/// Payload accepted when registering a domain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDomainRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_opaque_id")]
    pub account_id: String,
}

impl Validate for CreateDomainRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("name", &self.name, MAX_TEXT_LEN);
        errors.check_reference("account_id", &self.account_id);
        errors.into_result()
    }
}

/// Payload accepted when renaming a domain. `account_id` scopes the lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDomainRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_opaque_id")]
    pub account_id: String,
}

impl Validate for UpdateDomainRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("name", &self.name, MAX_TEXT_LEN);
        errors.into_result()
    }
}

/// Use cases for the domain resource.
#[derive(Clone)]
pub struct DomainService {
    repo: Arc<dyn DomainRepository>,
    clock: Clock,
}

impl DomainService {
    pub fn new(repo: Arc<dyn DomainRepository>) -> Self {
        Self::with_clock(repo, system_clock())
    }

    pub fn with_clock(repo: Arc<dyn DomainRepository>, clock: Clock) -> Self {
        Self { repo, clock }
    }

    pub async fn get(&self, id: &str, account_id: &str) -> Result<Domain, ServiceError> {
        Ok(self.repo.get(id, account_id).await?)
    }

    pub async fn query(
        &self,
        offset: u64,
        limit: u64,
        account_id: &str,
    ) -> Result<Vec<Domain>, ServiceError> {
        Ok(self.repo.query(offset, limit, account_id).await?)
    }

    pub async fn count(&self, account_id: &str) -> Result<u64, ServiceError> {
        Ok(self.repo.count(account_id).await?)
    }

    pub async fn create(&self, request: CreateDomainRequest) -> Result<Domain, ServiceError> {
        request.validate()?;

        let now = (self.clock)();
        let created = self
            .repo
            .create(Domain {
                id: String::new(),
                account_id: request.account_id.trim().to_string(),
                domain: request.name.trim().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| log_storage_failure("create", err))?;

        let domain = self.get(&created.id, &created.account_id).await?;
        info!(
            stage = "service",
            resource = "domain",
            id = %domain.id,
            account_id = %domain.account_id,
            "domain created"
        );
        Ok(domain)
    }

    /// Renames a domain owned by `request.account_id`. Validation runs
    /// before the lookup.
    pub async fn update(&self, id: &str, request: UpdateDomainRequest) -> Result<Domain, ServiceError> {
        request.validate()?;

        let mut domain = self.get(id, request.account_id.trim()).await?;
        domain.domain = request.name.trim().to_string();
        domain.updated_at = (self.clock)().max(domain.created_at);

        self.repo
            .update(&domain)
            .await
            .map_err(|err| log_storage_failure("update", err))?;
        info!(stage = "service", resource = "domain", id = %domain.id, "domain updated");
        Ok(domain)
    }

    /// Removes a domain and returns it as it was before removal.
    pub async fn delete(&self, id: &str, account_id: &str) -> Result<Domain, ServiceError> {
        let domain = self.get(id, account_id).await?;
        self.repo
            .delete(id, account_id)
            .await
            .map_err(|err| log_storage_failure("delete", err))?;
        info!(stage = "service", resource = "domain", id = %domain.id, "domain deleted");
        Ok(domain)
    }
}

fn log_storage_failure(op: &'static str, err: RepositoryError) -> ServiceError {
    if let RepositoryError::Storage(message) = &err {
        warn!(stage = "service", resource = "domain", op, error = %message, "storage call failed");
    }
    err.into()
}
