//! Annual statements from the SEC EDGAR company facts API.
//!
//! The company facts endpoint returns every XBRL fact a registrant has filed.
//! Only full-year figures from 10-K filings are kept: duration facts (income
//! and cash-flow items) must span roughly one year, instant facts (balance
//! sheet items) are taken at the fiscal year end. When the same period is
//! reported by several filings the latest filing wins, so restatements
//! replace original figures.

use crate::error::{DataError, Result};
use crate::provider::StatementProvider;
use crate::statement::{CompanyData, StatementKind, StatementTable, line_items};
use crate::yahoo::{AnnualStatements, YahooQuoteProvider};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const FACTS_URL: &str = "https://data.sec.gov/api/xbrl/companyfacts";

/// Response from the SEC EDGAR Company Facts API.
#[derive(Debug, Deserialize)]
pub struct CompanyFacts {
    /// Entity name
    #[serde(rename = "entityName", default)]
    pub entity_name: String,
    /// Facts organized by taxonomy and tag
    facts: HashMap<String, HashMap<String, TagFacts>>,
}

/// Facts for a specific XBRL tag.
#[derive(Debug, Deserialize)]
struct TagFacts {
    /// Units (USD, shares, etc.) containing the actual fact values
    units: Option<HashMap<String, Vec<FactValue>>>,
}

/// A single fact value with metadata.
#[derive(Debug, Clone, Deserialize)]
struct FactValue {
    /// Start date of a duration fact
    #[serde(default)]
    start: Option<String>,
    /// End date of the period
    end: String,
    /// Value
    val: f64,
    /// Fiscal period
    #[serde(default)]
    fp: Option<String>,
    /// Form type
    #[serde(default)]
    form: Option<String>,
    /// Filed date
    #[serde(default)]
    filed: Option<String>,
}

/// How a concept is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    /// Flow over the fiscal year (income statement, cash flow)
    Duration,
    /// Balance at the fiscal year end
    Instant,
}

/// Maps canonical line items to the XBRL tags that may carry them.
///
/// Companies switch tags over time (for example `Revenues` to
/// `RevenueFromContractWithCustomerExcludingAssessedTax` after ASC 606),
/// so every concept lists its alternatives in order of preference.
#[derive(Debug)]
struct XbrlTagMapper {
    concepts: Vec<(&'static str, StatementKind, Measure, &'static [&'static str])>,
}

impl XbrlTagMapper {
    fn new() -> Self {
        Self {
            concepts: vec![
                (
                    line_items::TOTAL_REVENUE,
                    StatementKind::Income,
                    Measure::Duration,
                    &[
                        "Revenues",
                        "RevenueFromContractWithCustomerExcludingAssessedTax",
                        "SalesRevenueNet",
                        "RevenueFromContractWithCustomerIncludingAssessedTax",
                    ],
                ),
                (
                    line_items::GROSS_PROFIT,
                    StatementKind::Income,
                    Measure::Duration,
                    &["GrossProfit"],
                ),
                (
                    line_items::OPERATING_INCOME,
                    StatementKind::Income,
                    Measure::Duration,
                    &["OperatingIncomeLoss"],
                ),
                (
                    line_items::NET_INCOME,
                    StatementKind::Income,
                    Measure::Duration,
                    &["NetIncomeLoss", "ProfitLoss"],
                ),
                (
                    line_items::TOTAL_ASSETS,
                    StatementKind::BalanceSheet,
                    Measure::Instant,
                    &["Assets"],
                ),
                (
                    line_items::TOTAL_LIABILITIES,
                    StatementKind::BalanceSheet,
                    Measure::Instant,
                    &["Liabilities"],
                ),
                (
                    line_items::TOTAL_STOCKHOLDER_EQUITY,
                    StatementKind::BalanceSheet,
                    Measure::Instant,
                    &[
                        "StockholdersEquity",
                        "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
                    ],
                ),
                (
                    line_items::OPERATING_CASH_FLOW,
                    StatementKind::CashFlow,
                    Measure::Duration,
                    &[
                        "NetCashProvidedByUsedInOperatingActivities",
                        "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
                    ],
                ),
                (
                    line_items::CAPITAL_EXPENDITURE,
                    StatementKind::CashFlow,
                    Measure::Duration,
                    &[
                        "PaymentsToAcquirePropertyPlantAndEquipment",
                        "PaymentsToAcquireProductiveAssets",
                    ],
                ),
            ],
        }
    }
}

impl CompanyFacts {
    /// Parse a company facts JSON payload.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Full-year values keyed by period end, merged across `tags`.
    ///
    /// Each period takes its value from the first tag in preference order that
    /// reports it; later tags only fill periods that are still empty.
    fn annual_values(&self, tags: &[&str], measure: Measure) -> BTreeMap<NaiveDate, f64> {
        let mut merged = BTreeMap::new();
        let Some(us_gaap) = self.facts.get("us-gaap") else {
            return merged;
        };

        for tag in tags {
            let Some(values) = us_gaap
                .get(*tag)
                .and_then(|t| t.units.as_ref())
                .and_then(|u| u.get("USD"))
            else {
                continue;
            };

            let mut annual: Vec<(&FactValue, NaiveDate)> = values
                .iter()
                .filter(|v| v.form.as_deref().is_some_and(|f| f.starts_with("10-K")))
                .filter(|v| v.fp.as_deref() == Some("FY"))
                .filter_map(|v| {
                    let end = parse_date(&v.end)?;
                    if measure == Measure::Duration {
                        let start = parse_date(v.start.as_deref()?)?;
                        let days = (end - start).num_days();
                        if !(350..=380).contains(&days) {
                            return None;
                        }
                    }
                    Some((v, end))
                })
                .collect();

            if annual.is_empty() {
                continue;
            }

            // Latest filing last so it overwrites earlier reports of the same period
            annual.sort_by(|a, b| a.0.filed.cmp(&b.0.filed));
            let by_period: BTreeMap<NaiveDate, f64> =
                annual.into_iter().map(|(v, end)| (end, v.val)).collect();
            debug!(tag, periods = by_period.len(), "matched annual XBRL facts");
            for (end, val) in by_period {
                merged.entry(end).or_insert(val);
            }
        }

        merged
    }

    /// Build annual statements, keeping the `max_periods` most recent fiscal years.
    pub fn annual_statements(&self, max_periods: usize) -> Result<AnnualStatements> {
        let mapper = XbrlTagMapper::new();
        let mut observations: BTreeMap<StatementKind, BTreeMap<String, BTreeMap<NaiveDate, f64>>> =
            BTreeMap::new();

        for (item, kind, measure, tags) in &mapper.concepts {
            let mut values = self.annual_values(tags, *measure);
            if *item == line_items::CAPITAL_EXPENDITURE {
                // XBRL reports payments as positive amounts; statements carry outflows as negatives
                values.values_mut().for_each(|v| *v = -*v);
            }
            if !values.is_empty() {
                observations
                    .entry(*kind)
                    .or_default()
                    .insert((*item).to_string(), values);
            }
        }

        derive_total_liabilities(self, &mut observations);
        derive_free_cash_flow(&mut observations);

        for by_item in observations.values_mut() {
            retain_recent(by_item, max_periods);
        }

        if observations.is_empty() {
            return Err(DataError::EdgarApi(format!(
                "No annual 10-K facts found for {}",
                self.entity_name
            )));
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
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Liabilities = (Liabilities and Equity) − Equity when the direct tag is absent.
fn derive_total_liabilities(
    facts: &CompanyFacts,
    observations: &mut BTreeMap<StatementKind, BTreeMap<String, BTreeMap<NaiveDate, f64>>>,
) {
    let Some(balance) = observations.get_mut(&StatementKind::BalanceSheet) else {
        return;
    };
    if balance.contains_key(line_items::TOTAL_LIABILITIES) {
        return;
    }
    let Some(equity) = balance.get(line_items::TOTAL_STOCKHOLDER_EQUITY) else {
        return;
    };
    let total = facts.annual_values(&["LiabilitiesAndStockholdersEquity"], Measure::Instant);
    let derived: BTreeMap<NaiveDate, f64> = total
        .iter()
        .filter_map(|(date, t)| equity.get(date).map(|e| (*date, t - e)))
        .collect();
    if !derived.is_empty() {
        balance.insert(line_items::TOTAL_LIABILITIES.to_string(), derived);
    }
}

/// Free cash flow = operating cash flow + capital expenditure (a negative outflow).
fn derive_free_cash_flow(
    observations: &mut BTreeMap<StatementKind, BTreeMap<String, BTreeMap<NaiveDate, f64>>>,
) {
    let Some(cash_flow) = observations.get_mut(&StatementKind::CashFlow) else {
        return;
    };
    let (Some(ocf), Some(capex)) = (
        cash_flow.get(line_items::OPERATING_CASH_FLOW),
        cash_flow.get(line_items::CAPITAL_EXPENDITURE),
    ) else {
        return;
    };
    let fcf: BTreeMap<NaiveDate, f64> = ocf
        .iter()
        .filter_map(|(date, o)| capex.get(date).map(|c| (*date, o + c)))
        .collect();
    if !fcf.is_empty() {
        cash_flow.insert(line_items::FREE_CASH_FLOW.to_string(), fcf);
    }
}

/// Drop every observation older than the `n` most recent period ends of the statement.
fn retain_recent(by_item: &mut BTreeMap<String, BTreeMap<NaiveDate, f64>>, n: usize) {
    let mut dates: Vec<NaiveDate> = by_item.values().flat_map(|m| m.keys().copied()).collect();
    dates.sort_unstable();
    dates.dedup();
    let Some(cutoff) = dates
        .len()
        .checked_sub(n)
        .and_then(|i| dates.get(i).copied())
    else {
        return;
    };
    for values in by_item.values_mut() {
        values.retain(|date, _| *date >= cutoff);
    }
    by_item.retain(|_, values| !values.is_empty());
}

/// Provider for SEC EDGAR annual statements, with prices from Yahoo Finance.
#[derive(Debug)]
pub struct EdgarStatementProvider {
    client: reqwest::Client,
    quotes: YahooQuoteProvider,
    history_years: u32,
    max_periods: usize,
}

impl EdgarStatementProvider {
    /// Default number of fiscal years kept per statement.
    pub const DEFAULT_MAX_PERIODS: usize = 4;

    /// Create a new EDGAR provider.
    ///
    /// The SEC requires a User-Agent header with contact information.
    pub fn new(history_years: u32) -> Result<Self> {
        Self::with_user_agent(history_years, "fairvalue (fairvalue@factordynamics.io)")
    }

    /// Create a provider that identifies itself with `user_agent`.
    pub fn with_user_agent(history_years: u32, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().user_agent(user_agent).build()?,
            quotes: YahooQuoteProvider::new()?,
            history_years,
            max_periods: Self::DEFAULT_MAX_PERIODS,
        })
    }

    /// Look up the zero-padded CIK for a ticker symbol.
    pub async fn fetch_cik(&self, symbol: &str) -> Result<String> {
        let response = self.client.get(TICKERS_URL).send().await?;

        if !response.status().is_success() {
            return Err(DataError::Http(format!(
                "Failed to fetch company tickers: {}",
                response.status()
            )));
        }

        let tickers: HashMap<String, serde_json::Value> = response.json().await?;
        find_cik(&tickers, symbol).ok_or_else(|| DataError::CikNotFound(symbol.to_string()))
    }

    /// Fetch the company facts document for a CIK.
    pub async fn fetch_company_facts(&self, cik: &str) -> Result<CompanyFacts> {
        let url = format!("{FACTS_URL}/CIK{cik}.json");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(DataError::EdgarApi(format!(
                "Failed to fetch company facts for CIK {}: {}",
                cik,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Find a ticker in the SEC `company_tickers.json` map and pad its CIK to 10 digits.
fn find_cik(tickers: &HashMap<String, serde_json::Value>, symbol: &str) -> Option<String> {
    tickers.values().find_map(|company| {
        let ticker = company.get("ticker")?.as_str()?;
        if !ticker.eq_ignore_ascii_case(symbol) {
            return None;
        }
        let cik = match company.get("cik_str")? {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => return None,
        };
        Some(format!("{cik:0>10}"))
    })
}

impl StatementProvider for EdgarStatementProvider {
    fn name(&self) -> &'static str {
        "edgar"
    }

    async fn fetch_company_data(&self, symbol: &str) -> Result<CompanyData> {
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let cik = self.fetch_cik(symbol).await?;
        let facts = self.fetch_company_facts(&cik).await?;
        let statements = facts.annual_statements(self.max_periods)?;
        info!(
            symbol,
            %cik,
            entity = %facts.entity_name,
            income_periods = statements.income_statement.len(),
            "fetched EDGAR annual statements"
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

    fn fact(start: Option<&str>, end: &str, val: f64, form: &str, fp: &str, filed: &str) -> String {
        let start = start.map_or_else(String::new, |s| format!(r#""start":"{s}","#));
        format!(
            r#"{{{start}"end":"{end}","val":{val},"fy":2023,"fp":"{fp}","form":"{form}","filed":"{filed}"}}"#
        )
    }

    fn facts_json(tags: &[(&str, Vec<String>)]) -> String {
        let body = tags
            .iter()
            .map(|(tag, values)| format!(r#""{tag}":{{"units":{{"USD":[{}]}}}}"#, values.join(",")))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"cik":1,"entityName":"Test Co","facts":{{"us-gaap":{{{body}}}}}}}"#)
    }

    #[test]
    fn test_duration_filter_drops_quarters() {
        let json = facts_json(&[(
            "Revenues",
            vec![
                fact(Some("2023-01-01"), "2023-12-31", 400.0, "10-K", "FY", "2024-02-01"),
                fact(Some("2023-10-01"), "2023-12-31", 100.0, "10-K", "FY", "2024-02-01"),
                fact(Some("2023-07-01"), "2023-09-30", 90.0, "10-Q", "Q3", "2023-11-01"),
            ],
        )]);
        let facts = CompanyFacts::from_json(&json).unwrap();
        let statements = facts.annual_statements(4).unwrap();
        let revenue = statements
            .income_statement
            .series(line_items::TOTAL_REVENUE)
            .unwrap();
        assert_eq!(revenue.values(), &[400.0]);
    }

    #[test]
    fn test_restatement_wins() {
        let json = facts_json(&[(
            "NetIncomeLoss",
            vec![
                fact(Some("2022-01-01"), "2022-12-31", 60.0, "10-K", "FY", "2024-02-01"),
                fact(Some("2022-01-01"), "2022-12-31", 50.0, "10-K", "FY", "2023-02-01"),
            ],
        )]);
        let facts = CompanyFacts::from_json(&json).unwrap();
        let statements = facts.annual_statements(4).unwrap();
        let ni = statements
            .income_statement
            .series(line_items::NET_INCOME)
            .unwrap();
        assert_eq!(ni.values(), &[60.0]);
    }

    #[test]
    fn test_revenue_tag_switch_fills_recent_years() {
        let json = facts_json(&[
            (
                "Revenues",
                vec![
                    fact(Some("2017-01-01"), "2017-12-31", 500.0, "10-K", "FY", "2018-02-01"),
                    fact(Some("2022-01-01"), "2022-12-31", 950.0, "10-K", "FY", "2023-02-01"),
                ],
            ),
            (
                "RevenueFromContractWithCustomerExcludingAssessedTax",
                vec![
                    fact(Some("2022-01-01"), "2022-12-31", 900.0, "10-K", "FY", "2023-02-01"),
                    fact(Some("2023-01-01"), "2023-12-31", 1000.0, "10-K", "FY", "2024-02-01"),
                ],
            ),
        ]);
        let facts = CompanyFacts::from_json(&json).unwrap();
        let statements = facts.annual_statements(4).unwrap();
        let revenue = statements
            .income_statement
            .series(line_items::TOTAL_REVENUE)
            .unwrap();

        assert_eq!(revenue.len(), 3);
        // Preferred tag keeps 2022; the newer tag supplies 2023
        assert_eq!(revenue.values(), &[500.0, 950.0, 1000.0]);
        assert_eq!(revenue.latest_finite(), Some(1000.0));
    }

    #[test]
    fn test_derived_free_cash_flow_and_liabilities() {
        let json = facts_json(&[
            (
                "NetCashProvidedByUsedInOperatingActivities",
                vec![fact(Some("2023-01-01"), "2023-12-31", 120.0, "10-K", "FY", "2024-02-01")],
            ),
            (
                "PaymentsToAcquirePropertyPlantAndEquipment",
                vec![fact(Some("2023-01-01"), "2023-12-31", 20.0, "10-K", "FY", "2024-02-01")],
            ),
            (
                "StockholdersEquity",
                vec![fact(None, "2023-12-31", 300.0, "10-K", "FY", "2024-02-01")],
            ),
            (
                "LiabilitiesAndStockholdersEquity",
                vec![fact(None, "2023-12-31", 1000.0, "10-K", "FY", "2024-02-01")],
            ),
        ]);
        let facts = CompanyFacts::from_json(&json).unwrap();
        let statements = facts.annual_statements(4).unwrap();

        let fcf = statements
            .cash_flow
            .series(line_items::FREE_CASH_FLOW)
            .unwrap();
        assert_eq!(fcf.values(), &[100.0]);
        let capex = statements
            .cash_flow
            .series(line_items::CAPITAL_EXPENDITURE)
            .unwrap();
        assert_eq!(capex.values(), &[-20.0]);

        let liabilities = statements
            .balance_sheet
            .series(line_items::TOTAL_LIABILITIES)
            .unwrap();
        assert_eq!(liabilities.values(), &[700.0]);
    }

    #[test]
    fn test_retain_recent() {
        let d = |y| NaiveDate::from_ymd_opt(y, 12, 31).unwrap();
        let mut by_item: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        by_item.insert(
            "a".to_string(),
            [(d(2020), 1.0), (d(2021), 2.0), (d(2022), 3.0)].into_iter().collect(),
        );
        by_item.insert("b".to_string(), [(d(2019), 1.0)].into_iter().collect());

        retain_recent(&mut by_item, 2);
        assert_eq!(by_item.len(), 1);
        assert_eq!(by_item["a"].len(), 2);
    }

    #[test]
    fn test_find_cik_pads() {
        let tickers: HashMap<String, serde_json::Value> = serde_json::from_str(
            r#"{"0":{"cik_str":320193,"ticker":"AAPL","title":"Apple Inc."}}"#,
        )
        .unwrap();
        assert_eq!(find_cik(&tickers, "aapl"), Some("0000320193".to_string()));
        assert_eq!(find_cik(&tickers, "MSFT"), None);
    }

    #[test]
    fn test_no_annual_facts() {
        let json = facts_json(&[]);
        let facts = CompanyFacts::from_json(&json).unwrap();
        assert!(matches!(
            facts.annual_statements(4),
            Err(DataError::EdgarApi(_))
        ));
    }
}
