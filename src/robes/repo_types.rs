use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobeKind {
    Borrow,
    Buy,
}

impl RobeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RobeKind::Borrow => "borrow",
            RobeKind::Buy => "buy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "borrow" => Some(RobeKind::Borrow),
            "buy" => Some(RobeKind::Buy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobeStatus {
    Pending,
    Borrowed,
    Returned,
    Paid,
}

impl RobeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RobeStatus::Pending => "pending",
            RobeStatus::Borrowed => "borrowed",
            RobeStatus::Returned => "returned",
            RobeStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RobeStatus::Pending),
            "borrowed" => Some(RobeStatus::Borrowed),
            "returned" => Some(RobeStatus::Returned),
            "paid" => Some(RobeStatus::Paid),
            _ => None,
        }
    }

    /// Borrowed robes go out and come back; bought robes only get paid for.
    pub fn applies_to(self, kind: RobeKind) -> bool {
        matches!(
            (kind, self),
            (_, RobeStatus::Pending)
                | (RobeKind::Borrow, RobeStatus::Borrowed | RobeStatus::Returned)
                | (RobeKind::Buy, RobeStatus::Paid)
        )
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RobeRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub kind: String,
    pub size: Option<String>,
    pub quantity: i32,
    pub price: f64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobeTransaction {
    pub id: Uuid,
    pub participant_id: Uuid,
    #[serde(rename = "type")]
    pub kind: RobeKind,
    pub size: Option<String>,
    pub quantity: i32,
    pub price: f64,
    pub status: RobeStatus,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<RobeRow> for RobeTransaction {
    type Error = anyhow::Error;

    fn try_from(r: RobeRow) -> Result<Self, Self::Error> {
        let kind = RobeKind::parse(&r.kind)
            .ok_or_else(|| anyhow::anyhow!("unknown robe kind {:?}", r.kind))?;
        let status = RobeStatus::parse(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown robe status {:?}", r.status))?;
        Ok(Self {
            id: r.id,
            participant_id: r.participant_id,
            kind,
            size: r.size,
            quantity: r.quantity,
            price: r.price,
            status,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewRobe {
    pub participant_id: Uuid,
    pub kind: RobeKind,
    pub size: Option<String>,
    pub quantity: i32,
    pub price: f64,
    pub notes: Option<String>,
}
