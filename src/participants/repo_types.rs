use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{dates::iso_date, retreats::repo_types::has_room};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Confirmed => "confirmed",
            ParticipantStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ParticipantStatus::Pending),
            "confirmed" => Some(ParticipantStatus::Confirmed),
            "cancelled" => Some(ParticipantStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Participant joined with its member and retreat.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub retreat_id: Uuid,
    pub member_id: Uuid,
    pub status: String,
    pub payment_amount: f64,
    pub payment_status: String,
    pub registered_at: OffsetDateTime,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub member_email: String,
    pub member_full_name: Option<String>,
    pub member_dharma_name: Option<String>,
    pub member_phone: Option<String>,
    pub retreat_title: String,
    pub retreat_slug: String,
    pub retreat_start_date: Date,
    pub retreat_end_date: Date,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub dharma_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetreatSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
}

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub status: ParticipantStatus,
    pub payment_amount: f64,
    pub payment_status: PaymentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub notes: Option<String>,
    pub member: MemberSummary,
    pub retreat: RetreatSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = anyhow::Error;

    fn try_from(r: ParticipantRow) -> Result<Self, Self::Error> {
        let status = ParticipantStatus::parse(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown participant status {:?}", r.status))?;
        let payment_status = PaymentStatus::parse(&r.payment_status)
            .ok_or_else(|| anyhow::anyhow!("unknown payment status {:?}", r.payment_status))?;
        Ok(Self {
            id: r.id,
            status,
            payment_amount: r.payment_amount,
            payment_status,
            registered_at: r.registered_at,
            notes: r.notes,
            member: MemberSummary {
                id: r.member_id,
                email: r.member_email,
                full_name: r.member_full_name,
                dharma_name: r.member_dharma_name,
                phone: r.member_phone,
            },
            retreat: RetreatSummary {
                id: r.retreat_id,
                title: r.retreat_title,
                slug: r.retreat_slug,
                start_date: r.retreat_start_date,
                end_date: r.retreat_end_date,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantChanges {
    pub status: Option<ParticipantStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_amount: Option<f64>,
    pub notes: Option<String>,
}

/// Capacity fields of the retreat being registered for.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct RetreatSeats {
    pub max_participants: i32,
    pub is_published: bool,
}

/// Why a registration was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    RetreatUnavailable,
    Full,
    AlreadyRegistered,
}

/// Result of a registration attempt.
#[derive(Debug)]
pub enum Registration {
    Created(Participant),
    Refused(Refusal),
}

/// Decides whether a member may take a seat. `existing` is the member's
/// current row for this retreat, if any; `active` counts pending and
/// confirmed rows. A cancelled row does not block and is reactivated.
pub fn admit(
    retreat: Option<RetreatSeats>,
    existing: Option<ParticipantStatus>,
    active: i64,
) -> Result<(), Refusal> {
    let Some(seats) = retreat.filter(|r| r.is_published) else {
        return Err(Refusal::RetreatUnavailable);
    };
    if existing.is_some_and(|s| s != ParticipantStatus::Cancelled) {
        return Err(Refusal::AlreadyRegistered);
    }
    if !has_room(seats.max_participants, active) {
        return Err(Refusal::Full);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn seats(max_participants: i32, is_published: bool) -> Option<RetreatSeats> {
        Some(RetreatSeats {
            max_participants,
            is_published,
        })
    }

    #[test]
    fn missing_or_unpublished_retreat_is_unavailable() {
        assert_eq!(admit(None, None, 0), Err(Refusal::RetreatUnavailable));
        assert_eq!(
            admit(seats(10, false), None, 0),
            Err(Refusal::RetreatUnavailable)
        );
    }

    #[test]
    fn live_registration_is_a_duplicate() {
        assert_eq!(
            admit(seats(10, true), Some(ParticipantStatus::Pending), 3),
            Err(Refusal::AlreadyRegistered)
        );
        assert_eq!(
            admit(seats(1, true), Some(ParticipantStatus::Confirmed), 1),
            Err(Refusal::AlreadyRegistered)
        );
    }

    #[test]
    fn full_retreat_turns_members_away() {
        assert_eq!(admit(seats(2, true), None, 2), Err(Refusal::Full));
        assert_eq!(
            admit(seats(2, true), Some(ParticipantStatus::Cancelled), 2),
            Err(Refusal::Full)
        );
        assert_eq!(admit(seats(2, true), None, 1), Ok(()));
    }

    #[test]
    fn cancelled_member_can_come_back() {
        assert_eq!(
            admit(seats(5, true), Some(ParticipantStatus::Cancelled), 4),
            Ok(())
        );
    }

    #[test]
    fn zero_capacity_is_unlimited() {
        assert_eq!(admit(seats(0, true), None, 10_000), Ok(()));
    }

    fn row(status: &str) -> ParticipantRow {
        ParticipantRow {
            id: Uuid::new_v4(),
            retreat_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            status: status.into(),
            payment_amount: 0.0,
            payment_status: "unpaid".into(),
            registered_at: datetime!(2025-05-01 8:00 UTC),
            notes: None,
            created_at: datetime!(2025-05-01 8:00 UTC),
            updated_at: datetime!(2025-05-01 8:00 UTC),
            member_email: "bob@example.com".into(),
            member_full_name: Some("Bob".into()),
            member_dharma_name: None,
            member_phone: None,
            retreat_title: "Summer retreat".into(),
            retreat_slug: "summer-retreat".into(),
            retreat_start_date: date!(2025 - 07 - 10),
            retreat_end_date: date!(2025 - 07 - 12),
        }
    }

    #[test]
    fn row_nests_member_and_retreat() {
        let p = Participant::try_from(row("pending")).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_status"], "unpaid");
        assert_eq!(json["member"]["email"], "bob@example.com");
        assert_eq!(json["retreat"]["start_date"], "2025-07-10");
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!(Participant::try_from(row("waitlisted")).is_err());
    }
}
