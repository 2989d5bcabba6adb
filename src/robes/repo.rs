use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewRobe, RobeRow, RobeStatus, RobeTransaction};

const COLUMNS: &str =
    "id, participant_id, kind, size, quantity, price, status, notes, created_at, updated_at";

pub async fn insert(db: &PgPool, r: &NewRobe) -> anyhow::Result<RobeTransaction> {
    let row = sqlx::query_as::<_, RobeRow>(&format!(
        r#"
        INSERT INTO robe_transactions (id, participant_id, kind, size, quantity, price, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(r.participant_id)
    .bind(r.kind.as_str())
    .bind(&r.size)
    .bind(r.quantity)
    .bind(r.price)
    .bind(&r.notes)
    .fetch_one(db)
    .await
    .context("insert robe transaction")?;
    RobeTransaction::try_from(row)
}

pub async fn list_for_participant(
    db: &PgPool,
    participant_id: Uuid,
) -> anyhow::Result<Vec<RobeTransaction>> {
    let rows = sqlx::query_as::<_, RobeRow>(&format!(
        "SELECT {COLUMNS} FROM robe_transactions WHERE participant_id = $1 ORDER BY created_at ASC"
    ))
    .bind(participant_id)
    .fetch_all(db)
    .await
    .context("list robe transactions")?;
    rows.into_iter().map(RobeTransaction::try_from).collect()
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RobeTransaction>> {
    let row = sqlx::query_as::<_, RobeRow>(&format!(
        "SELECT {COLUMNS} FROM robe_transactions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find robe transaction")?;
    row.map(RobeTransaction::try_from).transpose()
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    status: Option<RobeStatus>,
    notes: Option<&str>,
) -> anyhow::Result<Option<RobeTransaction>> {
    let row = sqlx::query_as::<_, RobeRow>(&format!(
        r#"
        UPDATE robe_transactions
           SET status = COALESCE($2, status), notes = COALESCE($3, notes), updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.map(RobeStatus::as_str))
    .bind(notes)
    .fetch_optional(db)
    .await
    .context("update robe transaction")?;
    row.map(RobeTransaction::try_from).transpose()
}
