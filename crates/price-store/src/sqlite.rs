use analysis_core::{normalize_symbol, AnalysisError, AnalysisResult, Company, PricePoint, PriceStore};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Read-only access to the `daily_prices` and `companies` tables written by
/// the ingestion job
#[derive(Clone)]
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DailyPriceRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl DailyPriceRow {
    fn into_point(self) -> Result<PricePoint, AnalysisError> {
        let date = parse_date(&self.date)?;
        PricePoint::new(date, self.open, self.high, self.low, self.close, self.volume)
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    symbol: String,
    name: String,
    sector: Option<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AnalysisError::InvalidData(format!("bad date '{}' in daily_prices: {}", raw, e)))
}

fn db_err(e: sqlx::Error) -> AnalysisError {
    AnalysisError::DatabaseError(e.to_string())
}

impl SqlitePriceStore {
    /// Open the database at `database_url`. The file must already exist.
    pub async fn connect(database_url: &str) -> Result<Self, AnalysisError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_err)?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        tracing::info!("Connected to price database at {}", database_url);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn fetch_recent(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        days: i64,
    ) -> AnalysisResult<Vec<PricePoint>> {
        if days <= 0 {
            return Ok(Vec::new());
        }
        let start = as_of - Duration::days(days);

        // Casts tolerate integer-typed columns and NULL volume
        let rows = sqlx::query_as::<_, DailyPriceRow>(
            "SELECT date(date) AS date,
                    CAST(open AS REAL) AS open,
                    CAST(high AS REAL) AS high,
                    CAST(low AS REAL) AS low,
                    CAST(close AS REAL) AS close,
                    CAST(COALESCE(volume, 0) AS REAL) AS volume
             FROM daily_prices
             WHERE symbol = ? AND date(date) > date(?) AND date(date) <= date(?)
             ORDER BY date ASC",
        )
        .bind(normalize_symbol(symbol)?)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(as_of.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::debug!("Loaded {} rows for {} up to {}", rows.len(), symbol, as_of);
        rows.into_iter().map(DailyPriceRow::into_point).collect()
    }

    async fn list_symbols(&self) -> AnalysisResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT symbol FROM daily_prices ORDER BY symbol")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_companies(&self) -> AnalysisResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT symbol, name, sector FROM companies ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Company {
                symbol: row.symbol,
                name: row.name,
                sector: row.sector,
            })
            .collect())
    }

    async fn latest_date(&self) -> AnalysisResult<Option<NaiveDate>> {
        let latest = sqlx::query_scalar::<_, Option<String>>("SELECT MAX(date(date)) FROM daily_prices")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        latest.as_deref().map(parse_date).transpose()
    }
}
