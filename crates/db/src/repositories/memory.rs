use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use memberdesk_core::domain::customer::{Customer, CustomerFields, CustomerId};

use super::{CustomerRepository, RepositoryError};

/// Vector-backed repository that mirrors the SQL table's unique index on
/// `member_number`. Records are kept in insertion order.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<Vec<Customer>>,
}

fn member_number_violation() -> RepositoryError {
    RepositoryError::UniqueViolation("customer.member_number".to_string())
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut listed: Vec<Customer> = customers.iter().rev().cloned().collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.iter().find(|customer| &customer.id == id).cloned())
    }

    async fn find_by_member_number(
        &self,
        member_number: i64,
        excluding: Option<&CustomerId>,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .find(|customer| {
                customer.member_number == member_number && Some(&customer.id) != excluding
            })
            .cloned())
    }

    async fn insert(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        if customers.iter().any(|existing| existing.id == customer.id) {
            return Err(RepositoryError::UniqueViolation("customer.id".to_string()));
        }
        if customers.iter().any(|existing| existing.member_number == customer.member_number) {
            return Err(member_number_violation());
        }
        customers.push(customer);
        Ok(())
    }

    async fn update_fields(
        &self,
        id: &CustomerId,
        fields: CustomerFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Customer>, RepositoryError> {
        let mut customers = self.customers.write().await;
        let taken = customers.iter().any(|existing| {
            existing.member_number == fields.member_number && &existing.id != id
        });

        let Some(customer) = customers.iter_mut().find(|customer| &customer.id == id) else {
            return Ok(None);
        };
        if taken {
            return Err(member_number_violation());
        }

        customer.apply(fields, updated_at);
        Ok(Some(customer.clone()))
    }

    async fn delete_by_id(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let mut customers = self.customers.write().await;
        let before = customers.len();
        customers.retain(|customer| &customer.id != id);
        Ok(customers.len() < before)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let mut customers = self.customers.write().await;
        let removed = customers.len() as u64;
        customers.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use memberdesk_core::domain::customer::{Customer, CustomerFields};

    use crate::repositories::{CustomerRepository, InMemoryCustomerRepository};

    fn sample(name: &str, member_number: i64, minutes_ago: i64) -> Customer {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
            - Duration::minutes(minutes_ago);
        Customer::create(
            CustomerFields {
                name: name.to_string(),
                date_of_birth: Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
                member_number,
                interests: "chess".to_string(),
            },
            created,
        )
    }

    #[tokio::test]
    async fn in_memory_customer_repo_round_trip() {
        let repo = InMemoryCustomerRepository::default();
        let customer = sample("Ada", 42, 0);

        repo.insert(customer.clone()).await.expect("save customer");
        let found = repo.find_by_id(&customer.id).await.expect("find customer");

        assert_eq!(found, Some(customer));
    }

    #[tokio::test]
    async fn in_memory_list_matches_sql_ordering() {
        let repo = InMemoryCustomerRepository::default();
        for customer in
            [sample("Old", 1, 30), sample("TieA", 2, 0), sample("TieB", 3, 0), sample("Mid", 4, 5)]
        {
            repo.insert(customer).await.expect("insert");
        }

        let names: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["TieB", "TieA", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn in_memory_enforces_unique_member_number() {
        let repo = InMemoryCustomerRepository::default();
        let ada = sample("Ada", 42, 0);
        repo.insert(ada.clone()).await.expect("insert");

        let duplicate = repo.insert(sample("Grace", 42, 0)).await.expect_err("duplicate");
        assert!(duplicate.is_member_number_conflict());

        let own_number = repo.update_fields(&ada.id, ada.fields(), Utc::now()).await;
        assert!(own_number.expect("keeping own number is allowed").is_some());
    }
}
