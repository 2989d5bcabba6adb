use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::dates::iso_date;

/// Which account table domain a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Member,
    Admin,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Member => "member",
            AccountKind::Admin => "admin",
        }
    }

    pub fn not_found(self) -> &'static str {
        match self {
            AccountKind::Member => "Member not found",
            AccountKind::Admin => "Admin not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }

    pub fn kind(self) -> AccountKind {
        match self {
            Role::Member => AccountKind::Member,
            Role::Admin | Role::Owner => AccountKind::Admin,
        }
    }
}

/// A hosted image: public URL plus the key needed to delete it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemberProfile {
    pub dharma_name: Option<String>,
    #[serde(with = "iso_date::option")]
    pub ordination_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_monk: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub kind: AccountKind,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub otp: Option<String>,
    pub otp_expires_at: Option<OffsetDateTime>,
    pub failed_otp_attempts: i32,
    pub last_login_at: Option<OffsetDateTime>,
    pub avatar: Option<Asset>,
    pub profile: MemberProfile,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Account {
    /// Bare record used when a member signs in for the first time.
    pub fn provision(kind: AccountKind, email: &str, role: Role, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            email: email.to_string(),
            phone: None,
            full_name: None,
            role,
            is_verified: false,
            is_active: true,
            otp: None,
            otp_expires_at: None,
            failed_otp_attempts: 0,
            last_login_at: None,
            avatar: None,
            profile: MemberProfile::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_challenge(&self) -> bool {
        self.otp.is_some() && self.otp_expires_at.is_some()
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            email: self.email.clone(),
            phone: self.phone.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            is_verified: self.is_verified,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            avatar: self.avatar.clone(),
            profile: (self.kind == AccountKind::Member).then(|| self.profile.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Account as returned to clients: never carries OTP state.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    pub avatar: Option<Asset>,
    #[serde(flatten)]
    pub profile: Option<MemberProfile>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields to change; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub dharma_name: Option<String>,
    pub ordination_date: Option<Date>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl AccountPatch {
    pub fn apply(&self, account: &mut Account, now: OffsetDateTime) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(active) = self.is_active {
            account.is_active = active;
        }
        set(&mut account.full_name, &self.full_name);
        set(&mut account.phone, &self.phone);
        let p = &mut account.profile;
        set(&mut p.dharma_name, &self.dharma_name);
        set(&mut p.ordination_date, &self.ordination_date);
        set(&mut p.date_of_birth, &self.date_of_birth);
        set(&mut p.gender, &self.gender);
        set(&mut p.marital_status, &self.marital_status);
        set(&mut p.address, &self.address);
        set(&mut p.notes, &self.notes);
        account.updated_at = now;
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
}

impl AccountFilter {
    pub fn matches(&self, a: &Account) -> bool {
        if self.role.is_some_and(|r| r != a.role) {
            return false;
        }
        if self.is_verified.is_some_and(|v| v != a.is_verified) {
            return false;
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                a.email.contains(&q)
                    || a
                        .full_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

/// Database row for the `accounts` table.
#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub kind: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub otp: Option<String>,
    pub otp_expires_at: Option<OffsetDateTime>,
    pub failed_otp_attempts: i32,
    pub last_login_at: Option<OffsetDateTime>,
    pub avatar_url: Option<String>,
    pub avatar_public_id: Option<String>,
    pub dharma_name: Option<String>,
    pub ordination_date: Option<Date>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_monk: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        let kind = match r.kind.as_str() {
            "member" => AccountKind::Member,
            "admin" => AccountKind::Admin,
            other => anyhow::bail!("unknown account kind {other:?}"),
        };
        let role = Role::parse(&r.role)
            .ok_or_else(|| anyhow::anyhow!("unknown role {:?}", r.role))?;
        let avatar = match (r.avatar_url, r.avatar_public_id) {
            (Some(url), Some(public_id)) => Some(Asset { url, public_id }),
            _ => None,
        };
        Ok(Self {
            id: r.id,
            kind,
            email: r.email,
            phone: r.phone,
            full_name: r.full_name,
            role,
            is_verified: r.is_verified,
            is_active: r.is_active,
            otp: r.otp,
            otp_expires_at: r.otp_expires_at,
            failed_otp_attempts: r.failed_otp_attempts,
            last_login_at: r.last_login_at,
            avatar,
            profile: MemberProfile {
                dharma_name: r.dharma_name,
                ordination_date: r.ordination_date,
                date_of_birth: r.date_of_birth,
                gender: r.gender,
                marital_status: r.marital_status,
                address: r.address,
                notes: r.notes,
                is_monk: r.is_monk,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
