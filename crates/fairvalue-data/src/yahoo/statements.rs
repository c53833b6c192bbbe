//! Annual financial statements from Yahoo Finance's fundamentals-timeseries API.
//!
//! One request returns every requested line item for every fiscal year Yahoo
//! has on file (typically four or five). Each line item arrives as its own
//! result block keyed by a type name such as `annualTotalRevenue`, with `null`
//! holes for years the company did not report.

use super::quotes::YahooQuoteProvider;
use crate::error::{DataError, Result};
use crate::provider::StatementProvider;
use crate::statement::{CompanyData, StatementKind, StatementTable, line_items};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Earliest period requested (2015-08-21), far enough back for every annual filing Yahoo keeps.
const PERIOD_START: i64 = 1_440_115_200;

/// Yahoo type names (without the `annual` prefix) and where they land.
const TYPE_MAP: &[(&str, StatementKind, &str)] = &[
    ("TotalRevenue", StatementKind::Income, line_items::TOTAL_REVENUE),
    ("GrossProfit", StatementKind::Income, line_items::GROSS_PROFIT),
    ("OperatingIncome", StatementKind::Income, line_items::OPERATING_INCOME),
    ("NetIncome", StatementKind::Income, line_items::NET_INCOME),
    ("TotalAssets", StatementKind::BalanceSheet, line_items::TOTAL_ASSETS),
    (
        "TotalLiabilitiesNetMinorityInterest",
        StatementKind::BalanceSheet,
        line_items::TOTAL_LIABILITIES,
    ),
    (
        "StockholdersEquity",
        StatementKind::BalanceSheet,
        line_items::TOTAL_STOCKHOLDER_EQUITY,
    ),
    ("OperatingCashFlow", StatementKind::CashFlow, line_items::OPERATING_CASH_FLOW),
    ("CapitalExpenditure", StatementKind::CashFlow, line_items::CAPITAL_EXPENDITURE),
    ("FreeCashFlow", StatementKind::CashFlow, line_items::FREE_CASH_FLOW),
];

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    #[serde(default)]
    result: Option<Vec<TimeseriesResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    meta: TimeseriesMeta,
    /// Holds `timestamp` plus one array keyed by the type name.
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeseriesPoint {
    as_of_date: String,
    reported_value: ReportedValue,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: f64,
}

/// The three annual statements parsed from one timeseries payload.
#[derive(Debug, Clone)]
pub struct AnnualStatements {
    /// Income statement
    pub income_statement: StatementTable,
    /// Balance sheet
    pub balance_sheet: StatementTable,
    /// Cash-flow statement
    pub cash_flow: StatementTable,
}

/// Comma-separated `type` query parameter for every mapped line item.
pub fn timeseries_types() -> String {
    TYPE_MAP
        .iter()
        .map(|(name, _, _)| format!("annual{name}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a fundamentals-timeseries JSON payload into statement tables.
///
/// Fails with [`DataError::YahooApi`] when Yahoo reports an error and with
/// [`DataError::MissingData`] when the payload carries no observations at all,
/// which is what an unknown ticker looks like.
pub fn parse_timeseries(symbol: &str, body: &str) -> Result<AnnualStatements> {
    let response: TimeseriesResponse = serde_json::from_str(body)?;

    if let Some(err) = response.timeseries.error.filter(|e| !e.is_null()) {
        return Err(DataError::YahooApi(err.to_string()));
    }

    let mut observations: BTreeMap<StatementKind, BTreeMap<String, BTreeMap<NaiveDate, f64>>> =
        BTreeMap::new();
    let mut count = 0usize;

    for result in response.timeseries.result.unwrap_or_default() {
        for type_name in &result.meta.types {
            let Some(raw) = result.data.get(type_name) else {
                continue;
            };
            let key = type_name.strip_prefix("annual").unwrap_or(type_name);
            let Some((_, kind, item)) = TYPE_MAP.iter().find(|(name, _, _)| *name == key) else {
                debug!(%type_name, "skipping unmapped timeseries type");
                continue;
            };

            let points: Vec<Option<TimeseriesPoint>> = serde_json::from_value(raw.clone())?;
            for point in points.into_iter().flatten() {
                let date = NaiveDate::parse_from_str(&point.as_of_date, "%Y-%m-%d")
                    .map_err(|e| DataError::Parse(format!("{}: {e}", point.as_of_date)))?;
                observations
                    .entry(*kind)
                    .or_default()
                    .entry((*item).to_string())
                    .or_default()
                    .insert(date, point.reported_value.raw);
                count += 1;
            }
        }
    }

    if count == 0 {
        return Err(DataError::MissingData {
            symbol: symbol.to_string(),
            reason: "Yahoo Finance returned no annual statements".to_string(),
        });
    }

    let table = |kind: StatementKind| -> Result<StatementTable> {
        observations.get(&kind).map_or_else(
            || Ok(StatementTable::empty(kind)),
            |obs| StatementTable::from_observations(kind, obs),
        )
    };

    Ok(AnnualStatements {
        income_statement: table(StatementKind::Income)?,
        balance_sheet: table(StatementKind::BalanceSheet)?,
        cash_flow: table(StatementKind::CashFlow)?,
    })
}

/// Yahoo Finance statement provider: annual statements plus daily prices.
#[derive(Debug)]
pub struct YahooStatementProvider {
    client: reqwest::Client,
    quotes: YahooQuoteProvider,
    history_years: u32,
}

impl YahooStatementProvider {
    /// Create a provider that fetches `history_years` of daily prices.
    pub fn new(history_years: u32) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)")
                .build()?,
            quotes: YahooQuoteProvider::new()?,
            history_years,
        })
    }

    /// Fetch and parse the annual statements for `symbol`.
    pub async fn fetch_statements(&self, symbol: &str) -> Result<AnnualStatements> {
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let url = format!("{TIMESERIES_URL}/{symbol}");
        let types = timeseries_types();
        let period_start = PERIOD_START.to_string();
        let period_end = Utc::now().timestamp().to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("type", types.as_str()),
                ("period1", period_start.as_str()),
                ("period2", period_end.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::Http(format!(
                "Failed to fetch fundamentals for {}: {}",
                symbol,
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_timeseries(symbol, &body)
    }
}

impl StatementProvider for YahooStatementProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_company_data(&self, symbol: &str) -> Result<CompanyData> {
        let statements = self.fetch_statements(symbol).await?;
        info!(
            symbol,
            income_periods = statements.income_statement.len(),
            balance_periods = statements.balance_sheet.len(),
            cash_flow_periods = statements.cash_flow.len(),
            "fetched annual statements"
        );

        let end = Utc::now();
        let start = end - Duration::days(365 * i64::from(self.history_years));
        let prices = self.quotes.fetch_quotes(symbol, start, end).await?;

        Ok(CompanyData {
            symbol: symbol.to_string(),
            income_statement: statements.income_statement,
            balance_sheet: statements.balance_sheet,
            cash_flow: statements.cash_flow,
            prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeseries_types() {
        let types = timeseries_types();
        assert!(types.starts_with("annualTotalRevenue,"));
        assert!(types.contains("annualTotalLiabilitiesNetMinorityInterest"));
        assert_eq!(types.split(',').count(), TYPE_MAP.len());
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"timeseries":{"result":null,"error":{"code":"Bad Request","description":"Invalid symbol"}}}"#;
        let result = parse_timeseries("???", body);
        assert!(matches!(result, Err(DataError::YahooApi(_))));
    }

    #[test]
    fn test_parse_empty_payload_is_missing_data() {
        let body = r#"{"timeseries":{"result":[{"meta":{"symbol":["ZZZZ"],"type":["annualTotalRevenue"]}}],"error":null}}"#;
        let result = parse_timeseries("ZZZZ", body);
        assert!(matches!(result, Err(DataError::MissingData { .. })));
    }

    #[test]
    fn test_parse_skips_null_points() {
        let body = r#"{"timeseries":{"result":[{
            "meta":{"symbol":["T"],"type":["annualNetIncome"]},
            "timestamp":[1,2],
            "annualNetIncome":[null,{"asOfDate":"2023-12-31","periodType":"12M","currencyCode":"USD","reportedValue":{"raw":5.0,"fmt":"5"}}]
        }],"error":null}}"#;
        let statements = parse_timeseries("T", body).unwrap();
        let ni = statements
            .income_statement
            .series(line_items::NET_INCOME)
            .unwrap();
        assert_eq!(ni.values(), &[5.0]);
        assert!(statements.balance_sheet.is_empty());
        assert!(statements.cash_flow.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooStatementProvider::new(5).unwrap();
        let result = provider.fetch_statements("").await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }
}
