// shared/src/portfolio.rs
// Portfolio aggregation: balances × prices → net worth, allocation
// percentages, and a concentration-based health score.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PortfolioError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// One wallet holding, as supplied by the API layer.
///
/// `balance` is an arbitrary-precision decimal string pre-scaled to the
/// token's display denomination; `decimals` is informational only.
/// `price_usd` must be a non-negative finite number (0 when the feed does
/// not know the token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolding {
    pub token_address: String,
    pub balance: String,
    pub decimals: u32,
    pub price_usd: f64,
}

/// Per-token valuation in the computed metrics, input order preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValuation {
    pub address: String,
    pub balance: Decimal,
    pub usd_value: Decimal,
    pub percentage: Decimal,
}

/// Aggregated portfolio metrics. `total_value` mirrors `net_worth`; both
/// are kept for interface symmetry with the dashboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    pub net_worth: Decimal,
    pub total_value: Decimal,
    pub tokens: Vec<TokenValuation>,
}

/// Qualitative concentration-risk label derived from `PortfolioMetrics`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthScore {
    NoHoldings,
    HighRisk,
    ModerateRisk,
    WellDiversified,
    Moderate,
    Concentrated,
}

impl HealthScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthScore::NoHoldings => "No Holdings",
            HealthScore::HighRisk => "High Risk",
            HealthScore::ModerateRisk => "Moderate Risk",
            HealthScore::WellDiversified => "Well Diversified",
            HealthScore::Moderate => "Moderate",
            HealthScore::Concentrated => "Concentrated",
        }
    }
}

impl std::fmt::Display for HealthScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_balance(holding: &TokenHolding) -> Result<Decimal, PortfolioError> {
    let balance: Decimal = holding.balance.trim().parse().map_err(|_| {
        PortfolioError::InvalidInput(format!(
            "balance `{}` for {} is not a decimal number",
            holding.balance, holding.token_address
        ))
    })?;
    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(PortfolioError::InvalidInput(format!(
            "balance for {} is negative",
            holding.token_address
        )));
    }
    Ok(balance)
}

fn parse_price(holding: &TokenHolding) -> Result<Decimal, PortfolioError> {
    if !holding.price_usd.is_finite() || holding.price_usd < 0.0 {
        return Err(PortfolioError::InvalidInput(format!(
            "price `{}` for {} is not a non-negative number",
            holding.price_usd, holding.token_address
        )));
    }
    Decimal::from_f64_retain(holding.price_usd).ok_or_else(|| {
        PortfolioError::InvalidInput(format!(
            "price `{}` for {} is out of range",
            holding.price_usd, holding.token_address
        ))
    })
}

/// Compute net worth, per-token USD value, and allocation percentages.
///
/// Two linear passes: value each holding and accumulate the total, then
/// derive percentages against the total. Pure and deterministic; the empty
/// input yields zero metrics. Percentages are all zero when net worth is
/// zero.
pub fn compute_metrics(holdings: &[TokenHolding]) -> Result<PortfolioMetrics, PortfolioError> {
    let mut tokens = Vec::with_capacity(holdings.len());
    let mut net_worth = Decimal::ZERO;

    for holding in holdings {
        let balance = parse_balance(holding)?;
        let price = parse_price(holding)?;
        let usd_value = balance * price;
        net_worth += usd_value;

        tokens.push(TokenValuation {
            address: holding.token_address.clone(),
            balance,
            usd_value,
            percentage: Decimal::ZERO,
        });
    }

    if net_worth > Decimal::ZERO {
        for token in &mut tokens {
            token.percentage = token.usd_value * Decimal::ONE_HUNDRED / net_worth;
        }
    }

    Ok(PortfolioMetrics {
        net_worth,
        total_value: net_worth,
        tokens,
    })
}

/// Classify portfolio health from concentration.
///
/// Rules are evaluated in priority order, first match wins:
/// max concentration above 80% is high risk, above 60% moderate risk;
/// three or more tokens all under 50% is well diversified; two or more
/// tokens is moderate; a single token is concentrated.
pub fn classify_health(metrics: &PortfolioMetrics) -> HealthScore {
    if metrics.tokens.is_empty() || metrics.net_worth <= Decimal::ZERO {
        return HealthScore::NoHoldings;
    }

    let max_concentration = metrics
        .tokens
        .iter()
        .map(|t| t.percentage)
        .max()
        .unwrap_or(Decimal::ZERO);
    let token_count = metrics.tokens.len();

    if max_concentration > Decimal::from(80) {
        HealthScore::HighRisk
    } else if max_concentration > Decimal::from(60) {
        HealthScore::ModerateRisk
    } else if token_count >= 3 && max_concentration < Decimal::from(50) {
        HealthScore::WellDiversified
    } else if token_count >= 2 {
        HealthScore::Moderate
    } else {
        HealthScore::Concentrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(address: &str, balance: &str, price: f64) -> TokenHolding {
        TokenHolding {
            token_address: address.to_string(),
            balance: balance.to_string(),
            decimals: 18,
            price_usd: price,
        }
    }

    #[test]
    fn empty_holdings_yield_zero_metrics() {
        let metrics = compute_metrics(&[]).unwrap();
        assert_eq!(metrics.net_worth, Decimal::ZERO);
        assert_eq!(metrics.total_value, Decimal::ZERO);
        assert!(metrics.tokens.is_empty());
        assert_eq!(classify_health(&metrics), HealthScore::NoHoldings);
    }

    #[test]
    fn usd_value_is_balance_times_price() {
        let metrics = compute_metrics(&[holding("0xaaa", "10", 2.0)]).unwrap();
        assert_eq!(metrics.tokens[0].usd_value, Decimal::from(20));
        assert_eq!(metrics.net_worth, Decimal::from(20));
    }

    #[test]
    fn single_holding_is_fully_concentrated() {
        let metrics = compute_metrics(&[holding("0xaaa", "3.5", 1.25)]).unwrap();
        assert_eq!(metrics.tokens[0].percentage, Decimal::ONE_HUNDRED);
        assert_eq!(classify_health(&metrics), HealthScore::Concentrated);
    }

    #[test]
    fn zero_priced_holdings_have_zero_percentages() {
        let metrics = compute_metrics(&[
            holding("0xaaa", "100", 0.0),
            holding("0xbbb", "50", 0.0),
        ])
        .unwrap();
        assert_eq!(metrics.net_worth, Decimal::ZERO);
        assert!(metrics.tokens.iter().all(|t| t.percentage.is_zero()));
        assert_eq!(classify_health(&metrics), HealthScore::NoHoldings);
    }

    #[test]
    fn input_order_is_preserved() {
        let metrics = compute_metrics(&[
            holding("0xccc", "1", 1.0),
            holding("0xaaa", "1", 1.0),
            holding("0xbbb", "1", 1.0),
        ])
        .unwrap();
        let addresses: Vec<&str> = metrics.tokens.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(addresses, vec!["0xccc", "0xaaa", "0xbbb"]);
    }

    #[test]
    fn rejects_non_numeric_balance() {
        let err = compute_metrics(&[holding("0xaaa", "12abc", 1.0)]).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidInput(_)));
    }

    #[test]
    fn rejects_negative_balance() {
        let err = compute_metrics(&[holding("0xaaa", "-5", 1.0)]).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidInput(_)));
    }

    #[test]
    fn rejects_negative_and_non_finite_prices() {
        assert!(compute_metrics(&[holding("0xaaa", "1", -0.01)]).is_err());
        assert!(compute_metrics(&[holding("0xaaa", "1", f64::NAN)]).is_err());
        assert!(compute_metrics(&[holding("0xaaa", "1", f64::INFINITY)]).is_err());
    }

    #[test]
    fn health_rule_priority_moderate_risk() {
        // 66.7% / 33.3% split: two tokens, max concentration in (60, 80]
        let metrics = compute_metrics(&[
            holding("0xaaa", "10", 2.0),
            holding("0xbbb", "5", 2.0),
        ])
        .unwrap();
        assert_eq!(metrics.net_worth, Decimal::from(30));
        assert_eq!(classify_health(&metrics), HealthScore::ModerateRisk);
    }

    #[test]
    fn health_labels() {
        assert_eq!(HealthScore::NoHoldings.to_string(), "No Holdings");
        assert_eq!(HealthScore::HighRisk.to_string(), "High Risk");
        assert_eq!(HealthScore::ModerateRisk.to_string(), "Moderate Risk");
        assert_eq!(HealthScore::WellDiversified.to_string(), "Well Diversified");
        assert_eq!(HealthScore::Moderate.to_string(), "Moderate");
        assert_eq!(HealthScore::Concentrated.to_string(), "Concentrated");
    }
}
