use log::*;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertTransactionResult},
    db_types::{merge_metadata, NewTransaction, Transaction, TransactionUpdate},
};

/// Inserts the transaction unless one with the same reference already exists.
pub async fn idempotent_insert(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<InsertTransactionResult, SqliteDatabaseError> {
    let result = match transaction_exists(&tx.reference, conn).await? {
        Some(id) => InsertTransactionResult::AlreadyExists(id),
        None => insert_transaction(tx, conn).await?,
    };
    Ok(result)
}

/// Inserts a new transaction. This is not atomic with respect to the existence check in [`idempotent_insert`]; wrap
/// both in a database transaction if that matters.
async fn insert_transaction(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<InsertTransactionResult, SqliteDatabaseError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO transactions (
                reference,
                user_id,
                network,
                data_amount,
                recipient_phone,
                status,
                metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id;
        "#,
    )
    .bind(&tx.reference)
    .bind(&tx.user_id)
    .bind(tx.network)
    .bind(&tx.data_amount)
    .bind(&tx.recipient_phone)
    .bind(tx.status)
    .bind(Json(&tx.metadata))
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Transaction {} inserted with id {id}", tx.reference);
    Ok(InsertTransactionResult::Inserted(id))
}

pub async fn transaction_exists(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let id = sqlx::query_scalar("SELECT id FROM transactions WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn fetch_transaction(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, SqliteDatabaseError> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

pub async fn fetch_transaction_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, SqliteDatabaseError> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(tx)
}

pub async fn fetch_submission_candidates(
    limit: i64,
    max_retries: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, SqliteDatabaseError> {
    let transactions = sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE status IN ('queued', 'processing')
              AND COALESCE(TRIM(provider_order_id), '') = ''
              AND COALESCE(TRIM(provider_reference), '') = ''
              AND retries < $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2;
        "#,
    )
    .bind(max_retries)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(transactions)
}

pub async fn fetch_reconciliation_candidates(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, SqliteDatabaseError> {
    let transactions = sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE status IN ('queued', 'processing')
              AND (COALESCE(TRIM(provider_order_id), '') <> '' OR COALESCE(TRIM(provider_reference), '') <> '')
            ORDER BY updated_at ASC, id ASC
            LIMIT $1;
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(transactions)
}

/// Applies `update` to transaction `id`. Run this inside a database transaction so that the metadata read and the
/// write cannot interleave with another update.
pub async fn update_transaction(
    id: i64,
    update: TransactionUpdate,
    conn: &mut SqliteConnection,
) -> Result<Transaction, SqliteDatabaseError> {
    let existing = fetch_transaction(id, conn).await?.ok_or(SqliteDatabaseError::TransactionNotFound(id))?;
    let mut metadata = existing.metadata.0;
    merge_metadata(&mut metadata, &update.metadata);
    let mut builder =
        QueryBuilder::<Sqlite>::new("UPDATE transactions SET updated_at = CURRENT_TIMESTAMP, metadata = ");
    builder.push_bind(Json(metadata));
    if let Some(status) = update.status {
        builder.push(", status = ").push_bind(status);
    }
    if let Some(order_id) = update.provider_order_id {
        builder.push(", provider_order_id = ").push_bind(order_id);
    }
    if let Some(reference) = update.provider_reference {
        builder.push(", provider_reference = ").push_bind(reference);
    }
    if let Some(retries) = update.retries {
        builder.push(", retries = ").push_bind(retries);
    }
    if let Some(last_error) = update.last_error {
        builder.push(", last_error = ").push_bind(last_error);
    }
    builder.push(" WHERE id = ").push_bind(id);
    let result = builder.build().execute(&mut *conn).await?;
    trace!("🗃️ Transaction #{id} updated. {} rows affected", result.rows_affected());
    fetch_transaction(id, conn).await?.ok_or(SqliteDatabaseError::TransactionNotFound(id))
}
