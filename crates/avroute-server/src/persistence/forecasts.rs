//! Location and forecast persistence operations.

use anyhow::{bail, Context, Result};
use avroute_core::models::{Facing, ForecastRecord};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Insert a forecast location and return its id.
pub async fn add_location(pool: &SqlitePool, name: &str, url: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        bail!("location name must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("forecast url must be http(s), got {url:?}");
    }

    let result = sqlx::query(
        "INSERT INTO locations (location_name, location_forecast_url) VALUES (?1, ?2)",
    )
    .bind(name)
    .bind(url)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// First location (lowest id) whose name contains `name`, ignoring case.
pub async fn select_location_by_name(pool: &SqlitePool, name: &str) -> Result<Option<i64>> {
    let pattern = format!("%{}%", name.trim());
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT location_id FROM locations WHERE location_name LIKE ?1 ORDER BY location_id LIMIT 1",
    )
    .bind(pattern)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Store one direction of a forecast. Re-importing the same day and
/// direction replaces the earlier values.
pub async fn add_forecast(pool: &SqlitePool, location_id: i64, record: &ForecastRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO forecasts (
            location_id, forecast_date, direction,
            lower_boundary, middle_boundary, upper_boundary,
            lower_primary_colour, lower_secondary_colour,
            upper_primary_colour, upper_secondary_colour
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(location_id, forecast_date, direction) DO UPDATE SET
            lower_boundary = ?4, middle_boundary = ?5, upper_boundary = ?6,
            lower_primary_colour = ?7, lower_secondary_colour = ?8,
            upper_primary_colour = ?9, upper_secondary_colour = ?10
        "#,
    )
    .bind(location_id)
    .bind(record.date.format("%Y-%m-%d").to_string())
    .bind(record.facing.as_str())
    .bind(record.lower_boundary_m)
    .bind(record.middle_boundary_m)
    .bind(record.upper_boundary_m)
    .bind(i64::from(record.lower_primary))
    .bind(i64::from(record.lower_secondary))
    .bind(i64::from(record.upper_primary))
    .bind(i64::from(record.upper_secondary))
    .execute(pool)
    .await?;

    Ok(())
}

/// All records of the most recent forecast day, in compass order.
pub async fn newest_forecasts(pool: &SqlitePool, location_id: i64) -> Result<Vec<ForecastRecord>> {
    let rows = sqlx::query_as::<_, ForecastRow>(
        r#"
        SELECT forecast_date, direction, lower_boundary, middle_boundary, upper_boundary,
               lower_primary_colour, lower_secondary_colour, upper_primary_colour, upper_secondary_colour
        FROM forecasts
        WHERE location_id = ?1
          AND forecast_date = (SELECT MAX(forecast_date) FROM forecasts WHERE location_id = ?1)
        "#,
    )
    .bind(location_id)
    .fetch_all(pool)
    .await?;

    let mut records = rows
        .into_iter()
        .map(ForecastRecord::try_from)
        .collect::<Result<Vec<_>>>()?;
    records.sort_by_key(|r| r.facing);
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct ForecastRow {
    forecast_date: String,
    direction: String,
    lower_boundary: i64,
    middle_boundary: i64,
    upper_boundary: i64,
    lower_primary_colour: i64,
    lower_secondary_colour: i64,
    upper_primary_colour: i64,
    upper_secondary_colour: i64,
}

impl TryFrom<ForecastRow> for ForecastRecord {
    type Error = anyhow::Error;

    fn try_from(row: ForecastRow) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&row.forecast_date, "%Y-%m-%d")
            .with_context(|| format!("bad forecast date {:?}", row.forecast_date))?;
        let facing: Facing = row.direction.parse().map_err(anyhow::Error::msg)?;
        let colour = |value: i64| u8::try_from(value).context("colour out of range");

        Ok(ForecastRecord {
            date,
            facing,
            lower_boundary_m: i32::try_from(row.lower_boundary)?,
            middle_boundary_m: i32::try_from(row.middle_boundary)?,
            upper_boundary_m: i32::try_from(row.upper_boundary)?,
            lower_primary: colour(row.lower_primary_colour)?,
            lower_secondary: colour(row.lower_secondary_colour)?,
            upper_primary: colour(row.upper_primary_colour)?,
            upper_secondary: colour(row.upper_secondary_colour)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use avroute_core::decode_compass_rose;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, d).unwrap()
    }

    #[tokio::test]
    async fn location_lookup_is_partial_and_case_insensitive() {
        let db = init_database(":memory:", 1).await.unwrap();
        let first = add_location(db.pool(), "Southern Cairngorms", "https://example.org/sc")
            .await
            .unwrap();
        add_location(db.pool(), "Northern Cairngorms", "https://example.org/nc")
            .await
            .unwrap();

        assert_eq!(
            select_location_by_name(db.pool(), "cairngorms").await.unwrap(),
            Some(first)
        );
        assert_eq!(select_location_by_name(db.pool(), "Torridon").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_bad_locations() {
        let db = init_database(":memory:", 1).await.unwrap();
        assert!(add_location(db.pool(), "  ", "https://example.org").await.is_err());
        assert!(add_location(db.pool(), "Glencoe", "ftp://example.org").await.is_err());
    }

    #[tokio::test]
    async fn newest_day_wins_and_reimport_replaces() {
        let db = init_database(":memory:", 1).await.unwrap();
        let id = add_location(db.pool(), "Glencoe", "https://example.org/gc")
            .await
            .unwrap();

        let old = decode_compass_rose(day(1), (300, 600, 900), &"1".repeat(32)).unwrap();
        let new = decode_compass_rose(day(2), (400, 700, 1000), &"2".repeat(32)).unwrap();
        for record in old.iter().chain(new.iter().rev()) {
            add_forecast(db.pool(), id, record).await.unwrap();
        }

        let records = newest_forecasts(db.pool(), id).await.unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(records, new);

        let replaced = decode_compass_rose(day(2), (400, 700, 1000), &"3".repeat(32)).unwrap();
        add_forecast(db.pool(), id, &replaced[0]).await.unwrap();
        let records = newest_forecasts(db.pool(), id).await.unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(records[0].upper_primary, 3);
    }

    #[tokio::test]
    async fn no_forecasts_is_empty() {
        let db = init_database(":memory:", 1).await.unwrap();
        let id = add_location(db.pool(), "Lochaber", "https://example.org/lo")
            .await
            .unwrap();
        assert!(newest_forecasts(db.pool(), id).await.unwrap().is_empty());
    }
}
