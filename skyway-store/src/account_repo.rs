use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyway_core::account::{IdentityClaims, PaymentMethod, PaymentMethodPatch, ProfileUpdate, User};
use skyway_core::repository::{PaymentMethodRepository, UserRepository};
use skyway_core::{CoreError, CoreResult};
use skyway_shared::Masked;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{db_error, to_u32};

const USER_COLUMNS: &str = "id, auth_id, email, first_name, last_name, phone, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    auth_id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            auth_id: row.auth_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, filter: &str, bind: impl ToString) -> CoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, filter);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(bind.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: Uuid) -> CoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(User::from))
    }

    async fn find_by_auth_id(&self, auth_id: &str) -> CoreResult<Option<User>> {
        self.fetch_one_by("auth_id", auth_id).await
    }

    async fn upsert_identity(&self, claims: &IdentityClaims) -> CoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, auth_id, email, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (auth_id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = COALESCE(EXCLUDED.first_name, users.first_name),
                last_name = COALESCE(EXCLUDED.last_name, users.last_name),
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&claims.auth_id)
            .bind(&claims.email)
            .bind(claims.first_name.as_deref())
            .bind(claims.last_name.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.into())
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> CoreResult<User> {
        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(update.first_name.as_deref())
            .bind(update.last_name.as_deref())
            .bind(update.phone.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(User::from)
            .ok_or_else(|| CoreError::NotFound("User not found".to_string()))
    }
}

const PAYMENT_COLUMNS: &str = "id, user_id, card_holder_name, card_type, last_four_digits, \
     expiry_month, expiry_year, is_default, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    user_id: Uuid,
    card_holder_name: String,
    card_type: String,
    last_four_digits: String,
    expiry_month: i32,
    expiry_year: i32,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = CoreError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        Ok(PaymentMethod {
            id: row.id,
            user_id: row.user_id,
            card_holder_name: Masked(row.card_holder_name),
            card_type: row.card_type,
            last_four_digits: row.last_four_digits,
            expiry_month: to_u32(row.expiry_month, "expiry_month")?,
            expiry_year: to_u32(row.expiry_year, "expiry_year")?,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Payment methods. Each write that can move the default flag takes the user's rows
/// `FOR UPDATE` first, so concurrent writers for one user run one after another; the partial
/// unique index on `(user_id) WHERE is_default` backs this up.
pub struct PostgresPaymentMethodRepository {
    pub pool: PgPool,
}

impl PostgresPaymentMethodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_user_methods(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> CoreResult<()> {
    sqlx::query("SELECT id FROM payment_methods WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(())
}

async fn clear_default(tx: &mut Transaction<'_, Postgres>, user_id: Uuid, except: Uuid) -> CoreResult<()> {
    sqlx::query(
        "UPDATE payment_methods SET is_default = FALSE, updated_at = NOW() \
         WHERE user_id = $1 AND id <> $2 AND is_default",
    )
    .bind(user_id)
    .bind(except)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl PaymentMethodRepository for PostgresPaymentMethodRepository {
    async fn list(&self, user_id: Uuid) -> CoreResult<Vec<PaymentMethod>> {
        let sql = format!(
            "SELECT {} FROM payment_methods WHERE user_id = $1 ORDER BY created_at",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentMethodRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(PaymentMethod::try_from).collect()
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>> {
        let sql = format!(
            "SELECT {} FROM payment_methods WHERE id = $1 AND user_id = $2",
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentMethodRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(PaymentMethod::try_from).transpose()
    }

    async fn create(&self, method: &PaymentMethod) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        lock_user_methods(&mut tx, method.user_id).await?;
        if method.is_default {
            clear_default(&mut tx, method.user_id, method.id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO payment_methods (id, user_id, card_holder_name, card_type, last_four_digits,
                                         expiry_month, expiry_year, is_default, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(method.id)
        .bind(method.user_id)
        .bind(method.card_holder_name.expose())
        .bind(&method.card_type)
        .bind(&method.last_four_digits)
        .bind(method.expiry_month as i32)
        .bind(method.expiry_year as i32)
        .bind(method.is_default)
        .bind(method.created_at)
        .bind(method.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn update(&self, user_id: Uuid, id: Uuid, patch: &PaymentMethodPatch) -> CoreResult<Option<PaymentMethod>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        lock_user_methods(&mut tx, user_id).await?;
        if patch.is_default == Some(true) {
            clear_default(&mut tx, user_id, id).await?;
        }

        let sql = format!(
            r#"
            UPDATE payment_methods SET
                card_holder_name = COALESCE($3, card_holder_name),
                is_default = COALESCE($4, is_default),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let row: Option<PaymentMethodRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .bind(patch.card_holder_name.as_ref().map(|n| n.expose().as_str()))
            .bind(patch.is_default)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        // Unknown method: roll back so a cleared default is restored.
        let Some(row) = row else {
            tx.rollback().await.map_err(db_error)?;
            return Ok(None);
        };

        tx.commit().await.map_err(db_error)?;
        PaymentMethod::try_from(row).map(Some)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> CoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        lock_user_methods(&mut tx, user_id).await?;

        let was_default: Option<bool> = sqlx::query_scalar(
            "DELETE FROM payment_methods WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some(was_default) = was_default else {
            return Ok(false);
        };

        if was_default {
            sqlx::query(
                r#"
                UPDATE payment_methods SET is_default = TRUE, updated_at = NOW()
                WHERE id = (
                    SELECT id FROM payment_methods WHERE user_id = $1 ORDER BY created_at LIMIT 1
                )
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn set_default(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>> {
        let patch = PaymentMethodPatch { card_holder_name: None, is_default: Some(true) };
        self.update(user_id, id, &patch).await
    }
}
