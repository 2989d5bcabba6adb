use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Account, AccountFilter, AccountKind, AccountPatch, Asset};
use super::store::AccountStore;

/// In-process store used by router tests.
#[derive(Default)]
pub struct MemoryAccountStore {
    rows: Mutex<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn with(accounts: Vec<Account>) -> Self {
        Self {
            rows: Mutex::new(accounts),
        }
    }

    pub fn snapshot(&self) -> Vec<Account> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, kind: AccountKind, email: &str) -> Option<Account> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.kind == kind && a.email == email)
            .cloned()
    }

    fn with_row<T>(
        &self,
        kind: AccountKind,
        id: Uuid,
        f: impl FnOnce(&mut Account) -> T,
    ) -> Option<T> {
        let mut rows = self.rows.lock().unwrap();
        rows.iter_mut().find(|a| a.kind == kind && a.id == id).map(f)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self.get(kind, &email.to_lowercase()))
    }

    async fn find_by_id(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(self.with_row(kind, id, |a| a.clone()))
    }

    async fn insert(&self, account: &Account) -> anyhow::Result<Account> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|a| a.kind == account.kind && a.email == account.email)
        {
            anyhow::bail!("duplicate email {}", account.email);
        }
        rows.push(account.clone());
        Ok(account.clone())
    }

    async fn save_login_state(&self, account: &Account) -> anyhow::Result<()> {
        self.with_row(account.kind, account.id, |a| {
            a.otp = account.otp.clone();
            a.otp_expires_at = account.otp_expires_at;
            a.failed_otp_attempts = account.failed_otp_attempts;
            a.is_verified = account.is_verified;
            a.last_login_at = account.last_login_at;
        });
        Ok(())
    }

    async fn update(
        &self,
        kind: AccountKind,
        id: Uuid,
        patch: &AccountPatch,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self.with_row(kind, id, |a| {
            patch.apply(a, OffsetDateTime::now_utc());
            a.clone()
        }))
    }

    async fn set_avatar(
        &self,
        kind: AccountKind,
        id: Uuid,
        avatar: &Asset,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self.with_row(kind, id, |a| {
            a.avatar = Some(avatar.clone());
            a.clone()
        }))
    }

    async fn list(
        &self,
        kind: AccountKind,
        filter: &AccountFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Account>, i64)> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Account> = rows
            .iter()
            .filter(|a| a.kind == kind && filter.matches(a))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, kind: AccountKind, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| !(a.kind == kind && a.id == id));
        Ok(rows.len() != before)
    }
}
