use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::entity::Account;
use crate::error::{RepositoryError, ServiceError};
use crate::validation::{Validate, ValidationErrors, MAX_TEXT_LEN};
use crate::{system_clock, Clock};

/// Storage contract for accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Returns the account with the given id.
    async fn get(&self, id: &str) -> Result<Account, RepositoryError>;
    /// Returns the number of stored accounts.
    async fn count(&self) -> Result<u64, RepositoryError>;
    /// Returns accounts ordered by id, skipping `offset` rows and yielding at most `limit`.
    async fn query(&self, offset: u64, limit: u64) -> Result<Vec<Account>, RepositoryError>;
    /// Persists a new account, generating its id when empty.
    async fn create(&self, account: Account) -> Result<Account, RepositoryError>;
    /// Overwrites the stored row with the same id.
    async fn update(&self, account: &Account) -> Result<(), RepositoryError>;
    /// Removes the account with the given id.
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Payload accepted when creating an account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firebase_id: Option<String>,
}

impl Validate for CreateAccountRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("email", &self.email, MAX_TEXT_LEN);
        errors.into_result()
    }
}

/// Payload accepted when updating an account. `name` replaces the email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub name: String,
}

impl Validate for UpdateAccountRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("name", &self.name, MAX_TEXT_LEN);
        errors.into_result()
    }
}

/// Use cases for the account resource.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    clock: Clock,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self {
        Self::with_clock(repo, system_clock())
    }

    pub fn with_clock(repo: Arc<dyn AccountRepository>, clock: Clock) -> Self {
        Self { repo, clock }
    }

    pub async fn get(&self, id: &str) -> Result<Account, ServiceError> {
        Ok(self.repo.get(id).await?)
    }

    /// Returns a page of accounts. Never fails with an absent result; an
    /// empty page is `Ok(vec![])`.
    pub async fn query(&self, offset: u64, limit: u64) -> Result<Vec<Account>, ServiceError> {
        Ok(self.repo.query(offset, limit).await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.repo.count().await?)
    }

    /// Validates the request, stamps timestamps and persists a new account.
    pub async fn create(&self, request: CreateAccountRequest) -> Result<Account, ServiceError> {
        request.validate()?;

        let now = (self.clock)();
        let firebase_id = request
            .firebase_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let created = self
            .repo
            .create(Account {
                id: String::new(),
                email: request.email.trim().to_string(),
                firebase_id,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| log_storage_failure("create", err))?;

        let account = self.get(&created.id).await?;
        info!(stage = "service", resource = "account", id = %account.id, "account created");
        Ok(account)
    }

    /// Replaces the email of an existing account.
    ///
    /// The request is validated before the account is looked up, so an
    /// invalid payload for an unknown id reports a validation failure.
    pub async fn update(
        &self,
        id: &str,
        request: UpdateAccountRequest,
    ) -> Result<Account, ServiceError> {
        request.validate()?;

        let mut account = self.get(id).await?;
        account.email = request.name.trim().to_string();
        account.updated_at = (self.clock)().max(account.created_at);

        self.repo
            .update(&account)
            .await
            .map_err(|err| log_storage_failure("update", err))?;
        info!(stage = "service", resource = "account", id = %account.id, "account updated");
        Ok(account)
    }

    /// Removes an account and returns it as it was before removal.
    pub async fn delete(&self, id: &str) -> Result<Account, ServiceError> {
        let account = self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .map_err(|err| log_storage_failure("delete", err))?;
        info!(stage = "service", resource = "account", id = %account.id, "account deleted");
        Ok(account)
    }
}

fn log_storage_failure(op: &'static str, err: RepositoryError) -> ServiceError {
    if let RepositoryError::Storage(message) = &err {
        warn!(stage = "service", resource = "account", op, error = %message, "storage call failed");
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAccountRepository;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    fn ticking_clock() -> Clock {
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = Arc::new(AtomicI64::new(0));
        Arc::new(move || start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
    }

    fn service(repo: &Arc<MemoryAccountRepository>) -> AccountService {
        AccountService::with_clock(repo.clone(), ticking_clock())
    }

    fn create_request(email: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            email: email.to_string(),
            firebase_id: None,
        }
    }

    fn update_request(name: &str) -> UpdateAccountRequest {
        UpdateAccountRequest {
            name: name.to_string(),
        }
    }

    #[test]
    fn create_request_validation() {
        assert!(create_request("test").validate().is_ok());

        let err = create_request("").validate().unwrap_err();
        assert_eq!(err.get("email"), Some("cannot be blank"));

        let err = create_request(&"1234567890".repeat(13)).validate().unwrap_err();
        assert_eq!(err.get("email"), Some("the length must be no more than 128"));
    }

    #[test]
    fn update_request_validation() {
        assert!(update_request("test").validate().is_ok());
        assert!(update_request("").validate().is_err());
        assert!(update_request(&"x".repeat(129)).validate().is_err());
    }

    #[tokio::test]
    async fn crud_lifecycle() {
        let repo = Arc::new(MemoryAccountRepository::failing_on("error"));
        let service = service(&repo);

        assert_eq!(service.count().await.unwrap(), 0);

        let account = service
            .create(create_request("test"))
            .await
            .expect("create succeeds");
        assert!(!account.id.is_empty());
        assert_eq!(account.email, "test");
        assert_eq!(account.created_at, account.updated_at);
        assert_eq!(service.count().await.unwrap(), 1);
        let id = account.id.clone();

        let err = service.create(create_request("")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.count().await.unwrap(), 1);

        let err = service.create(create_request("error")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(service.count().await.unwrap(), 1);

        service
            .create(create_request("test2"))
            .await
            .expect("second create");

        let updated = service
            .update(&id, update_request("test updated"))
            .await
            .expect("update succeeds");
        assert_eq!(updated.email, "test updated");
        assert!(updated.updated_at > updated.created_at);

        let err = service
            .update("none", update_request("test updated"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound);

        let err = service.update(&id, update_request("")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.count().await.unwrap(), 2);

        let err = service
            .update(&id, update_request("error"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(service.count().await.unwrap(), 2);

        assert_eq!(service.get("none").await.unwrap_err(), ServiceError::NotFound);
        let fetched = service.get(&id).await.expect("get succeeds");
        assert_eq!(fetched.email, "test updated");
        assert_eq!(fetched.id, id);

        let page = service.query(0, 10).await.expect("query succeeds");
        assert_eq!(page.len(), 2);

        assert_eq!(
            service.delete("none").await.unwrap_err(),
            ServiceError::NotFound
        );
        let deleted = service.delete(&id).await.expect("delete succeeds");
        assert_eq!(deleted, fetched);
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn created_account_matches_fetched_account() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);

        let created = service
            .create(CreateAccountRequest {
                email: "  a@example.com ".to_string(),
                firebase_id: Some("fb-123".to_string()),
            })
            .await
            .expect("create succeeds");

        assert_eq!(created.email, "a@example.com");
        assert_eq!(created.firebase_id.as_deref(), Some("fb-123"));
        assert_eq!(service.get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn blank_firebase_id_is_dropped() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);

        let created = service
            .create(CreateAccountRequest {
                email: "a@example.com".to_string(),
                firebase_id: Some("  ".to_string()),
            })
            .await
            .expect("create succeeds");
        assert_eq!(created.firebase_id, None);
    }

    #[tokio::test]
    async fn invalid_update_of_missing_account_reports_validation() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);

        let err = service
            .update("missing", update_request(""))
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert_eq!(errors.get("name"), Some("cannot be blank"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_to_taken_email_is_a_storage_error() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);
        service.create(create_request("a@example.com")).await.unwrap();
        let second = service.create(create_request("b@example.com")).await.unwrap();

        let err = service
            .update(&second.id, update_request("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(service.get(&second.id).await.unwrap().email, "b@example.com");
    }

    #[tokio::test]
    async fn update_never_moves_updated_at_before_created_at() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let created = service(&repo)
            .create(create_request("a@example.com"))
            .await
            .unwrap();

        let earlier = created.created_at - Duration::hours(3);
        let lagging = AccountService::with_clock(repo.clone(), Arc::new(move || earlier));
        let updated = lagging
            .update(&created.id, update_request("b@example.com"))
            .await
            .expect("update succeeds");
        assert_eq!(updated.updated_at, created.created_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);
        let account = service
            .create(create_request("a@example.com"))
            .await
            .unwrap();

        service.delete(&account.id).await.expect("first delete");
        assert_eq!(
            service.delete(&account.id).await.unwrap_err(),
            ServiceError::NotFound
        );
        assert!(repo.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn query_respects_bounds_and_order() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);
        for idx in 0..5 {
            service
                .create(create_request(&format!("user{idx}@example.com")))
                .await
                .unwrap();
        }

        assert!(service.query(0, 0).await.unwrap().is_empty());
        assert!(service.query(10, 5).await.unwrap().is_empty());

        let first = service.query(0, 3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.windows(2).all(|pair| pair[0].id < pair[1].id));

        let rest = service.query(3, 3).await.unwrap();
        assert_eq!(rest.len(), 2);
        assert!(first.last().unwrap().id < rest[0].id);
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = service(&repo);

        let account = service
            .create(create_request("a@example.com"))
            .await
            .unwrap();
        assert_eq!(service.count().await.unwrap(), 1);

        let err = service
            .update(&account.id, update_request(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.count().await.unwrap(), 1);
        assert_eq!(service.get(&account.id).await.unwrap(), account);

        let deleted = service.delete(&account.id).await.unwrap();
        assert_eq!(deleted, account);
        assert_eq!(
            service.get(&account.id).await.unwrap_err(),
            ServiceError::NotFound
        );
    }
}
