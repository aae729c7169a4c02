use chrono::{DateTime, Utc};
use sqlx::Row;

use memberdesk_core::domain::customer::{
    format_timestamp, parse_timestamp, Customer, CustomerFields, CustomerId,
};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str =
    "id, name, date_of_birth, member_number, interests, created_at, updated_at";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    parse_timestamp(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid `{column}` timestamp `{raw}`")))
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let date_of_birth: String =
        row.try_get("date_of_birth").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let member_number: i64 =
        row.try_get("member_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let interests: String =
        row.try_get("interests").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Customer {
        id: CustomerId(id),
        name,
        date_of_birth: decode_timestamp("date_of_birth", &date_of_birth)?,
        member_number,
        interests,
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn find_by_member_number(
        &self,
        member_number: i64,
        excluding: Option<&CustomerId>,
    ) -> Result<Option<Customer>, RepositoryError> {
        let excluded = excluding.map(CustomerId::as_str);
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             WHERE member_number = ? AND (? IS NULL OR id <> ?)
             LIMIT 1"
        ))
        .bind(member_number)
        .bind(excluded)
        .bind(excluded)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn insert(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer (id, name, date_of_birth, member_number, interests,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id.as_str())
        .bind(&customer.name)
        .bind(format_timestamp(&customer.date_of_birth))
        .bind(customer.member_number)
        .bind(&customer.interests)
        .bind(format_timestamp(&customer.created_at))
        .bind(format_timestamp(&customer.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_fields(
        &self,
        id: &CustomerId,
        fields: CustomerFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE customer
             SET name = ?, date_of_birth = ?, member_number = ?, interests = ?, updated_at = ?
             WHERE id = ?
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&fields.name)
        .bind(format_timestamp(&fields.date_of_birth))
        .bind(fields.member_number)
        .bind(&fields.interests)
        .bind(format_timestamp(&updated_at))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn delete_by_id(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
