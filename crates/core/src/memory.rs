//! In-memory repositories used by tests and local experiments.
//!
//! Each instance owns its rows; nothing is shared between instances.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::account::AccountRepository;
use crate::domain::DomainRepository;
use crate::entity::{Account, Domain};
use crate::error::RepositoryError;

const INJECTED_FAILURE: &str = "injected storage failure";

/// Account rows kept sorted by id.
#[derive(Default)]
pub struct MemoryAccountRepository {
    items: RwLock<Vec<Account>>,
    fail_on: Option<String>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes carrying this email fail with a storage error.
    pub fn failing_on<S: Into<String>>(email: S) -> Self {
        Self {
            items: RwLock::default(),
            fail_on: Some(email.into()),
        }
    }

    /// Returns a copy of every stored row.
    pub async fn snapshot(&self) -> Vec<Account> {
        self.items.read().await.clone()
    }

    fn check_injected(&self, email: &str) -> Result<(), RepositoryError> {
        match &self.fail_on {
            Some(trigger) if trigger == email => {
                Err(RepositoryError::Storage(INJECTED_FAILURE.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn get(&self, id: &str) -> Result<Account, RepositoryError> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.items.read().await.len() as u64)
    }

    async fn query(&self, offset: u64, limit: u64) -> Result<Vec<Account>, RepositoryError> {
        Ok(page(self.items.read().await.as_slice(), offset, limit))
    }

    async fn create(&self, mut account: Account) -> Result<Account, RepositoryError> {
        self.check_injected(&account.email)?;
        if account.id.is_empty() {
            account.id = Uuid::new_v4().to_string();
        }

        let mut items = self.items.write().await;
        if items.iter().any(|item| item.id == account.id) {
            return Err(RepositoryError::Storage(
                "UNIQUE constraint failed: account.id".to_string(),
            ));
        }
        if items.iter().any(|item| item.email == account.email) {
            return Err(RepositoryError::Storage(
                "UNIQUE constraint failed: account.email".to_string(),
            ));
        }
        let position = items.partition_point(|item| item.id < account.id);
        items.insert(position, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        self.check_injected(&account.email)?;
        let mut items = self.items.write().await;
        if items
            .iter()
            .any(|item| item.id != account.id && item.email == account.email)
        {
            return Err(RepositoryError::Storage(
                "UNIQUE constraint failed: account.email".to_string(),
            ));
        }
        let slot = items
            .iter_mut()
            .find(|item| item.id == account.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = account.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.get(id).await?;
        self.items.write().await.retain(|item| item.id != id);
        Ok(())
    }
}

/// Domain rows kept sorted by id.
#[derive(Default)]
pub struct MemoryDomainRepository {
    items: RwLock<Vec<Domain>>,
    fail_on: Option<String>,
}

impl MemoryDomainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes carrying this domain name fail with a storage error.
    pub fn failing_on<S: Into<String>>(name: S) -> Self {
        Self {
            items: RwLock::default(),
            fail_on: Some(name.into()),
        }
    }

    pub async fn snapshot(&self) -> Vec<Domain> {
        self.items.read().await.clone()
    }

    fn check_injected(&self, name: &str) -> Result<(), RepositoryError> {
        match &self.fail_on {
            Some(trigger) if trigger == name => {
                Err(RepositoryError::Storage(INJECTED_FAILURE.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DomainRepository for MemoryDomainRepository {
    async fn get(&self, id: &str, account_id: &str) -> Result<Domain, RepositoryError> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id && item.is_owned_by(account_id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn count(&self, account_id: &str) -> Result<u64, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|item| item.is_owned_by(account_id)).count() as u64)
    }

    async fn query(
        &self,
        offset: u64,
        limit: u64,
        account_id: &str,
    ) -> Result<Vec<Domain>, RepositoryError> {
        let owned: Vec<Domain> = self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.is_owned_by(account_id))
            .cloned()
            .collect();
        Ok(page(owned.as_slice(), offset, limit))
    }

    async fn create(&self, mut domain: Domain) -> Result<Domain, RepositoryError> {
        self.check_injected(&domain.domain)?;
        if domain.id.is_empty() {
            domain.id = Uuid::new_v4().to_string();
        }

        let mut items = self.items.write().await;
        if items.iter().any(|item| item.id == domain.id) {
            return Err(RepositoryError::Storage(
                "UNIQUE constraint failed: domain.id".to_string(),
            ));
        }
        let position = items.partition_point(|item| item.id < domain.id);
        items.insert(position, domain.clone());
        Ok(domain)
    }

    async fn update(&self, domain: &Domain) -> Result<(), RepositoryError> {
        self.check_injected(&domain.domain)?;
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|item| item.id == domain.id && item.is_owned_by(&domain.account_id))
            .ok_or(RepositoryError::NotFound)?;
        *slot = domain.clone();
        Ok(())
    }

    async fn delete(&self, id: &str, account_id: &str) -> Result<(), RepositoryError> {
        self.get(id, account_id).await?;
        self.items
            .write()
            .await
            .retain(|item| !(item.id == id && item.is_owned_by(account_id)));
        Ok(())
    }
}

fn page<T: Clone>(items: &[T], offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: &str, email: &str) -> Account {
        let now = Utc::now();
        Account {
            id: id.to_string(),
            email: email.to_string(),
            firebase_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn keeps_rows_sorted_by_id() {
        let repo = MemoryAccountRepository::new();
        repo.create(account("c", "c@example.com")).await.unwrap();
        repo.create(account("a", "a@example.com")).await.unwrap();
        repo.create(account("b", "b@example.com")).await.unwrap();

        let ids: Vec<String> = repo
            .query(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(repo.query(1, 1).await.unwrap()[0].id, "b");
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let repo = MemoryAccountRepository::new();
        repo.create(account("", "a@example.com")).await.unwrap();
        let err = repo
            .create(account("", "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_rejects_email_held_by_another_row() {
        let repo = MemoryAccountRepository::new();
        repo.create(account("a", "a@example.com")).await.unwrap();
        let mut other = repo.create(account("b", "b@example.com")).await.unwrap();

        other.email = "a@example.com".to_string();
        let err = repo.update(&other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));

        let rows = repo.snapshot().await;
        assert_eq!(rows.iter().filter(|row| row.email == "a@example.com").count(), 1);
        assert_eq!(repo.get("b").await.unwrap().email, "b@example.com");

        let mut same = repo.get("a").await.unwrap();
        same.firebase_id = Some("fb-1".to_string());
        repo.update(&same).await.expect("keeping its own email is fine");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let repo = MemoryAccountRepository::new();
        let err = repo
            .update(&account("ghost", "g@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::NotFound);
    }

    #[tokio::test]
    async fn instances_do_not_share_rows() {
        let first = MemoryAccountRepository::new();
        let second = MemoryAccountRepository::new();
        first.create(account("", "a@example.com")).await.unwrap();
        assert_eq!(second.count().await.unwrap(), 0);
    }
}
