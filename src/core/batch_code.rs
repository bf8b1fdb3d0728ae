//! Batch code generation.
//!
//! Generated codes look like `BC<ddmmyy><seq>`: the calendar date (UTC) followed
//! by that day's sequence number, zero-padded to two digits. The sequence comes
//! from the `secuencias_lote` counter, incremented with a single
//! `UPDATE ... SET ultimo = ultimo + 1` inside the caller's transaction, so two
//! creations never read the same value and a rolled-back creation gives its number
//! back.

use crate::{
    entities::{DailySequence, daily_sequence},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ConnectionTrait, DbErr, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

const CODE_PREFIX: &str = "BC";

/// Formats the `ddmmyy` date key used in batch codes.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// Builds a batch code from a date key and a sequence number.
#[must_use]
pub fn format_batch_code(date_key: &str, sequence: i64) -> String {
    format!("{CODE_PREFIX}{date_key}{sequence:02}")
}

/// Returns the next batch code for today.
pub async fn generate<C>(conn: &C) -> Result<String>
where
    C: ConnectionTrait,
{
    next_batch_code(conn, Utc::now().date_naive()).await
}

/// Returns the next batch code for `date`, advancing that day's counter.
pub async fn next_batch_code<C>(conn: &C, date: NaiveDate) -> Result<String>
where
    C: ConnectionTrait,
{
    let key = date_key(date);

    // Make sure the day's counter row exists
    let seed = daily_sequence::ActiveModel {
        fecha_clave: Set(key.clone()),
        ultimo: Set(0),
    };
    DailySequence::insert(seed)
        .on_conflict(
            OnConflict::column(daily_sequence::Column::FechaClave)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    // Atomic increment: ultimo = ultimo + 1
    DailySequence::update_many()
        .col_expr(
            daily_sequence::Column::Ultimo,
            Expr::col(daily_sequence::Column::Ultimo).add(1),
        )
        .filter(daily_sequence::Column::FechaClave.eq(key.as_str()))
        .exec(conn)
        .await?;

    let counter = DailySequence::find_by_id(key.clone())
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("secuencias_lote[{key}]")))?;

    Ok(format_batch_code(&key, counter.ultimo))
}
