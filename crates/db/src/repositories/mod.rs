use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use memberdesk_core::domain::customer::{Customer, CustomerFields, CustomerId};
use memberdesk_core::errors::ApplicationError;

pub mod customer;
pub mod memory;

pub use customer::SqlCustomerRepository;
pub use memory::InMemoryCustomerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl RepositoryError {
    pub fn is_member_number_conflict(&self) -> bool {
        matches!(self, Self::UniqueViolation(constraint) if constraint.contains("member_number"))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                Self::UniqueViolation(db_error.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        if error.is_member_number_conflict() {
            return ApplicationError::member_number_taken();
        }
        ApplicationError::Persistence(error.to_string())
    }
}

/// Storage seam for customer records.
///
/// Implementations must reject a second record holding an existing
/// `member_number` with [`RepositoryError::UniqueViolation`] naming that
/// column; the gateway's own duplicate check is only a pre-check.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Newest `created_at` first; records created in the same instant keep
    /// reverse insertion order.
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn find_by_member_number(
        &self,
        member_number: i64,
        excluding: Option<&CustomerId>,
    ) -> Result<Option<Customer>, RepositoryError>;

    async fn insert(&self, customer: Customer) -> Result<(), RepositoryError>;

    /// Returns `None` when no record has `id`.
    async fn update_fields(
        &self,
        id: &CustomerId,
        fields: CustomerFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Customer>, RepositoryError>;

    async fn delete_by_id(&self, id: &CustomerId) -> Result<bool, RepositoryError>;

    async fn delete_all(&self) -> Result<u64, RepositoryError>;
}
