//! Count mismatch log - Audit entries for rejected warehouse counts.
//!
//! Writing an entry is best effort: the caller is already returning a rejection to
//! the operator, and a failure here must not replace that rejection.

use crate::{
    entities::{CountMismatch, count_mismatch},
    errors::Result,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};
use tracing::{error, info};

/// Appends a mismatch entry for `codigo_lote`. Failures are logged and swallowed.
pub async fn record<C>(conn: &C, codigo_lote: Option<&str>)
where
    C: ConnectionTrait,
{
    let entry = count_mismatch::ActiveModel {
        codigo_lote: Set(codigo_lote.map(str::to_string)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match entry.insert(conn).await {
        Ok(saved) => info!("Recorded count mismatch #{} for batch {:?}", saved.id, codigo_lote),
        Err(e) => error!("Failed to record count mismatch for {:?}: {}", codigo_lote, e),
    }
}

/// Lists the mismatch entries recorded on `date` (UTC), newest first.
pub async fn report(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<count_mismatch::Model>> {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .succ_opt()
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
        .and_utc();

    CountMismatch::find()
        .filter(count_mismatch::Column::CreatedAt.gte(start))
        .filter(count_mismatch::Column::CreatedAt.lt(end))
        .order_by_desc(count_mismatch::Column::CreatedAt)
        .order_by_desc(count_mismatch::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists today's mismatch entries, newest first.
pub async fn report_today(db: &DatabaseConnection) -> Result<Vec<count_mismatch::Model>> {
    report(db, Utc::now().date_naive()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::Duration;
    use sea_orm::{Database, PaginatorTrait};

    #[tokio::test]
    async fn test_record_and_report_today() -> Result<()> {
        let db = setup_test_db().await?;

        record(&db, Some("BC19102601")).await;
        record(&db, Some("BC19102602")).await;
        record(&db, None).await;

        let entries = report_today(&db).await?;
        assert_eq!(entries.len(), 3);
        // Newest first
        assert_eq!(entries[0].codigo_lote, None);
        assert_eq!(entries[2].codigo_lote.as_deref(), Some("BC19102601"));

        Ok(())
    }

    #[tokio::test]
    async fn test_report_filters_by_day() -> Result<()> {
        let db = setup_test_db().await?;
        let yesterday = Utc::now() - Duration::days(1);

        count_mismatch::ActiveModel {
            codigo_lote: Set(Some("AYER".to_string())),
            created_at: Set(yesterday),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        record(&db, Some("HOY")).await;

        let today = report_today(&db).await?;
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].codigo_lote.as_deref(), Some("HOY"));

        let past = report(&db, yesterday.date_naive()).await?;
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].codigo_lote.as_deref(), Some("AYER"));

        assert!(report(&db, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_swallows_failures() -> Result<()> {
        // No tables: the insert fails and must not surface
        let db = Database::connect("sqlite::memory:").await?;
        record(&db, Some("BC19102601")).await;

        let db = setup_test_db().await?;
        assert_eq!(CountMismatch::find().count(&db).await?, 0);
        Ok(())
    }
}
