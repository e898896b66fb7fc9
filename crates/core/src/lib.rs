pub mod account;
pub mod domain;
pub mod entity;
pub mod error;
pub mod memory;
pub mod validation;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use account::{AccountRepository, AccountService, CreateAccountRequest, UpdateAccountRequest};
pub use domain::{CreateDomainRequest, DomainRepository, DomainService, UpdateDomainRequest};
pub use entity::{Account, Domain};
pub use error::{RepositoryError, ServiceError};
pub use validation::{Validate, ValidationErrors};

/// Source of "now" for timestamp stamping. Tests swap in a fixed clock.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Returns a clock backed by the system time.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
