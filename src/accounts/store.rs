use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Account, AccountFilter, AccountKind, AccountPatch, AccountRow, Asset};

/// Persistence for member and admin credentials.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, kind: AccountKind, email: &str)
        -> anyhow::Result<Option<Account>>;
    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<Option<Account>>;
    async fn insert(&self, account: &Account) -> anyhow::Result<Account>;
    /// Writes the OTP challenge and login bookkeeping columns only.
    async fn save_login_state(&self, account: &Account) -> anyhow::Result<()>;
    async fn update(
        &self,
        kind: AccountKind,
        id: Uuid,
        patch: &AccountPatch,
    ) -> anyhow::Result<Option<Account>>;
    async fn set_avatar(
        &self,
        kind: AccountKind,
        id: Uuid,
        avatar: &Asset,
    ) -> anyhow::Result<Option<Account>>;
    async fn list(
        &self,
        kind: AccountKind,
        filter: &AccountFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Account>, i64)>;
    async fn delete(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<bool>;
}

const COLUMNS: &str = r#"
    id, kind, email, phone, full_name, role, is_verified, is_active,
    otp, otp_expires_at, failed_otp_attempts, last_login_at,
    avatar_url, avatar_public_id,
    dharma_name, ordination_date, date_of_birth, gender, marital_status,
    address, notes, is_monk, created_at, updated_at
"#;

/// Escapes LIKE wildcards and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE kind = $1 AND email = lower($2)"
        ))
        .bind(kind.as_str())
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE kind = $1 AND id = $2"
        ))
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find account by id")?;
        row.map(Account::try_from).transpose()
    }

    async fn insert(&self, a: &Account) -> anyhow::Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (id, kind, email, phone, full_name, role, is_verified, is_active,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(a.id)
        .bind(a.kind.as_str())
        .bind(&a.email)
        .bind(&a.phone)
        .bind(&a.full_name)
        .bind(a.role.as_str())
        .bind(a.is_verified)
        .bind(a.is_active)
        .bind(a.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert account")?;
        Account::try_from(row)
    }

    async fn save_login_state(&self, a: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
               SET otp = $3, otp_expires_at = $4, failed_otp_attempts = $5,
                   is_verified = $6, last_login_at = $7, updated_at = now()
             WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(a.kind.as_str())
        .bind(a.id)
        .bind(&a.otp)
        .bind(a.otp_expires_at)
        .bind(a.failed_otp_attempts)
        .bind(a.is_verified)
        .bind(a.last_login_at)
        .execute(&self.db)
        .await
        .context("save login state")?;
        Ok(())
    }

    async fn update(
        &self,
        kind: AccountKind,
        id: Uuid,
        p: &AccountPatch,
    ) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
               SET email = COALESCE(lower($3), email),
                   full_name = COALESCE($4, full_name),
                   phone = COALESCE($5, phone),
                   is_active = COALESCE($6, is_active),
                   dharma_name = COALESCE($7, dharma_name),
                   ordination_date = COALESCE($8, ordination_date),
                   date_of_birth = COALESCE($9, date_of_birth),
                   gender = COALESCE($10, gender),
                   marital_status = COALESCE($11, marital_status),
                   address = COALESCE($12, address),
                   notes = COALESCE($13, notes),
                   updated_at = now()
             WHERE kind = $1 AND id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(kind.as_str())
        .bind(id)
        .bind(&p.email)
        .bind(&p.full_name)
        .bind(&p.phone)
        .bind(p.is_active)
        .bind(&p.dharma_name)
        .bind(p.ordination_date)
        .bind(p.date_of_birth)
        .bind(&p.gender)
        .bind(&p.marital_status)
        .bind(&p.address)
        .bind(&p.notes)
        .fetch_optional(&self.db)
        .await
        .context("update account")?;
        row.map(Account::try_from).transpose()
    }

    async fn set_avatar(
        &self,
        kind: AccountKind,
        id: Uuid,
        avatar: &Asset,
    ) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
               SET avatar_url = $3, avatar_public_id = $4, updated_at = now()
             WHERE kind = $1 AND id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(kind.as_str())
        .bind(id)
        .bind(&avatar.url)
        .bind(&avatar.public_id)
        .fetch_optional(&self.db)
        .await
        .context("set account avatar")?;
        row.map(Account::try_from).transpose()
    }

    async fn list(
        &self,
        kind: AccountKind,
        f: &AccountFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Account>, i64)> {
        const WHERE: &str = r#"
            WHERE kind = $1
              AND ($2::text IS NULL OR role = $2)
              AND ($3::bool IS NULL OR is_verified = $3)
              AND ($4::text IS NULL OR full_name ILIKE $4 OR email ILIKE $4)
        "#;
        let role = f.role.map(|r| r.as_str());
        let search = f.search.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {COLUMNS} FROM accounts {WHERE} ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(kind.as_str())
        .bind(role)
        .bind(f.is_verified)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list accounts")?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM accounts {WHERE}"))
            .bind(kind.as_str())
            .bind(role)
            .bind(f.is_verified)
            .bind(&search)
            .fetch_one(&self.db)
            .await
            .context("count accounts")?;

        let accounts = rows
            .into_iter()
            .map(Account::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((accounts, total))
    }

    async fn delete(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM accounts WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete account")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("chau"), "%chau%");
    }
}
