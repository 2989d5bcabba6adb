use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{
    admit, Participant, ParticipantChanges, ParticipantRow, ParticipantStatus, Refusal,
    Registration, RetreatSeats,
};

const COLUMNS: &str = r#"
    p.id, p.retreat_id, p.member_id, p.status, p.payment_amount, p.payment_status,
    p.registered_at, p.notes, p.created_at, p.updated_at,
    m.email AS member_email, m.full_name AS member_full_name,
    m.dharma_name AS member_dharma_name, m.phone AS member_phone,
    r.title AS retreat_title, r.slug AS retreat_slug,
    r.start_date AS retreat_start_date, r.end_date AS retreat_end_date
"#;

const JOINS: &str = r#"
    JOIN accounts m ON m.id = p.member_id
    JOIN retreats r ON r.id = p.retreat_id
"#;

fn convert(rows: Vec<ParticipantRow>) -> anyhow::Result<Vec<Participant>> {
    rows.into_iter().map(Participant::try_from).collect()
}

/// Registers `member_id` for a published retreat. The retreat row is locked
/// for the duration so concurrent registrations cannot overfill it. A
/// cancelled registration is reactivated instead of duplicated.
pub async fn register(
    db: &PgPool,
    retreat_id: Uuid,
    member_id: Uuid,
    notes: Option<&str>,
) -> anyhow::Result<Registration> {
    let mut tx = db.begin().await.context("begin tx")?;

    let retreat: Option<RetreatSeats> = sqlx::query_as(
        "SELECT max_participants, is_published FROM retreats WHERE id = $1 FOR UPDATE",
    )
    .bind(retreat_id)
    .fetch_optional(&mut *tx)
    .await
    .context("lock retreat")?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT status FROM participants WHERE retreat_id = $1 AND member_id = $2",
    )
    .bind(retreat_id)
    .bind(member_id)
    .fetch_optional(&mut *tx)
    .await
    .context("find registration")?;
    let existing = existing
        .map(|s| {
            ParticipantStatus::parse(&s)
                .ok_or_else(|| anyhow::anyhow!("unknown participant status {s:?}"))
        })
        .transpose()?;

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM participants WHERE retreat_id = $1 AND status <> 'cancelled'",
    )
    .bind(retreat_id)
    .fetch_one(&mut *tx)
    .await
    .context("count registrations")?;

    if let Err(refusal) = admit(retreat, existing, active) {
        return Ok(Registration::Refused(refusal));
    }

    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        r#"
        WITH p AS (
            INSERT INTO participants (id, retreat_id, member_id, notes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (retreat_id, member_id) DO UPDATE
               SET status = 'pending', payment_status = 'unpaid', payment_amount = 0,
                   notes = EXCLUDED.notes, registered_at = now(), updated_at = now()
             WHERE participants.status = 'cancelled'
            RETURNING *
        )
        SELECT {COLUMNS} FROM p {JOINS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(retreat_id)
    .bind(member_id)
    .bind(notes)
    .fetch_optional(&mut *tx)
    .await
    .context("insert registration")?;

    let Some(row) = row else {
        return Ok(Registration::Refused(Refusal::AlreadyRegistered));
    };
    tx.commit().await.context("commit tx")?;
    Ok(Registration::Created(Participant::try_from(row)?))
}

pub async fn cancel(
    db: &PgPool,
    retreat_id: Uuid,
    member_id: Uuid,
) -> anyhow::Result<Option<Participant>> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        r#"
        WITH p AS (
            UPDATE participants
               SET status = 'cancelled', updated_at = now()
             WHERE retreat_id = $1 AND member_id = $2 AND status <> 'cancelled'
            RETURNING *
        )
        SELECT {COLUMNS} FROM p {JOINS}
        "#
    ))
    .bind(retreat_id)
    .bind(member_id)
    .fetch_optional(db)
    .await
    .context("cancel registration")?;
    row.map(Participant::try_from).transpose()
}

pub async fn list_for_member(db: &PgPool, member_id: Uuid) -> anyhow::Result<Vec<Participant>> {
    let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {COLUMNS} FROM participants p {JOINS} WHERE p.member_id = $1 ORDER BY r.start_date DESC"
    ))
    .bind(member_id)
    .fetch_all(db)
    .await
    .context("list member registrations")?;
    convert(rows)
}

pub async fn list_for_retreat(
    db: &PgPool,
    retreat_id: Uuid,
    status: Option<ParticipantStatus>,
) -> anyhow::Result<Vec<Participant>> {
    let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM participants p {JOINS}
         WHERE p.retreat_id = $1 AND ($2::text IS NULL OR p.status = $2)
         ORDER BY p.registered_at ASC
        "#
    ))
    .bind(retreat_id)
    .bind(status.map(ParticipantStatus::as_str))
    .fetch_all(db)
    .await
    .context("list retreat participants")?;
    convert(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Participant>> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {COLUMNS} FROM participants p {JOINS} WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find participant")?;
    row.map(Participant::try_from).transpose()
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    c: &ParticipantChanges,
) -> anyhow::Result<Option<Participant>> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        r#"
        WITH p AS (
            UPDATE participants
               SET status = COALESCE($2, status),
                   payment_status = COALESCE($3, payment_status),
                   payment_amount = COALESCE($4, payment_amount),
                   notes = COALESCE($5, notes),
                   updated_at = now()
             WHERE id = $1
            RETURNING *
        )
        SELECT {COLUMNS} FROM p {JOINS}
        "#
    ))
    .bind(id)
    .bind(c.status.map(|s| s.as_str()))
    .bind(c.payment_status.map(|s| s.as_str()))
    .bind(c.payment_amount)
    .bind(&c.notes)
    .fetch_optional(db)
    .await
    .context("update participant")?;
    row.map(Participant::try_from).transpose()
}
