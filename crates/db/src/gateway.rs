//! Customer persistence gateway.
//!
//! Every operation follows the same shape: validate and coerce the caller's
//! draft, run the duplicate `member_number` pre-check, then write. The
//! pre-check is not atomic with the write; the store's unique index is the
//! authoritative guard and its violation is reported as the same conflict.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use memberdesk_core::domain::customer::{timestamp_now, Customer, CustomerDraft, CustomerId};
use memberdesk_core::errors::ApplicationError;

use crate::repositories::{
    CustomerRepository, InMemoryCustomerRepository, RepositoryError, SqlCustomerRepository,
};
use crate::DbPool;

#[derive(Clone)]
pub struct CustomerGateway {
    repository: Arc<dyn CustomerRepository>,
}

impl CustomerGateway {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }

    pub fn sql(pool: DbPool) -> Self {
        Self::new(Arc::new(SqlCustomerRepository::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCustomerRepository::default()))
    }

    pub async fn list(&self) -> Result<Vec<Customer>, ApplicationError> {
        Ok(self.repository.list().await?)
    }

    pub async fn get_by_id(&self, raw_id: &str) -> Result<Customer, ApplicationError> {
        let id = parse_id(raw_id)?;
        self.repository.find_by_id(&id).await?.ok_or_else(ApplicationError::customer_not_found)
    }

    pub async fn create(&self, draft: CustomerDraft) -> Result<Customer, ApplicationError> {
        let fields = draft.into_fields()?;

        if self.repository.find_by_member_number(fields.member_number, None).await?.is_some() {
            return Err(ApplicationError::member_number_taken());
        }

        let customer = Customer::create(fields, timestamp_now());
        self.repository.insert(customer.clone()).await.map_err(race_lost)?;

        info!(
            event_name = "customer.created",
            customer_id = %customer.id,
            member_number = customer.member_number,
            "customer record created"
        );
        Ok(customer)
    }

    /// Replaces all four editable fields. A record may keep its own
    /// member number; the conflict check runs before the existence check.
    pub async fn update(
        &self,
        raw_id: &str,
        draft: CustomerDraft,
    ) -> Result<Customer, ApplicationError> {
        let fields = draft.into_fields()?;
        let id = CustomerId::parse(raw_id);

        let holder =
            self.repository.find_by_member_number(fields.member_number, id.as_ref()).await?;
        if holder.is_some() {
            return Err(ApplicationError::member_number_taken());
        }

        let id = id.ok_or_else(ApplicationError::customer_not_found)?;
        let current =
            self.repository.find_by_id(&id).await?.ok_or_else(ApplicationError::customer_not_found)?;

        let member_number = fields.member_number;
        let updated_at = next_updated_at(current.updated_at, timestamp_now());
        let updated = self
            .repository
            .update_fields(&id, fields, updated_at)
            .await
            .map_err(race_lost)?
            .ok_or_else(ApplicationError::customer_not_found)?;

        info!(
            event_name = "customer.updated",
            customer_id = %id,
            member_number,
            "customer record updated"
        );
        Ok(updated)
    }

    pub async fn delete_by_id(&self, raw_id: &str) -> Result<CustomerId, ApplicationError> {
        let id = parse_id(raw_id)?;
        if !self.repository.delete_by_id(&id).await? {
            return Err(ApplicationError::customer_not_found());
        }

        info!(event_name = "customer.deleted", customer_id = %id, "customer record deleted");
        Ok(id)
    }

    /// Clears the collection. Intended for test resets; succeeds on an
    /// empty store too.
    pub async fn delete_all(&self) -> Result<u64, ApplicationError> {
        let removed = self.repository.delete_all().await?;
        warn!(event_name = "customer.purged", removed, "all customer records deleted");
        Ok(removed)
    }
}

fn parse_id(raw_id: &str) -> Result<CustomerId, ApplicationError> {
    CustomerId::parse(raw_id).ok_or_else(ApplicationError::customer_not_found)
}

/// `updated_at` must move forward on every successful update, even when the
/// clock has not advanced past the stored value.
fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

fn race_lost(error: RepositoryError) -> ApplicationError {
    if error.is_member_number_conflict() {
        warn!(
            event_name = "customer.member_number_race",
            error = %error,
            "unique index rejected a write that passed the duplicate pre-check"
        );
    }
    ApplicationError::from(error)
}
