use rust_decimal::Decimal;
use shared::portfolio::{classify_health, compute_metrics, HealthScore, TokenHolding};
use std::str::FromStr;

fn holding(address: &str, balance: &str, price: f64) -> TokenHolding {
    TokenHolding {
        token_address: address.to_string(),
        balance: balance.to_string(),
        decimals: 18,
        price_usd: price,
    }
}

fn percentage_sum(holdings: &[TokenHolding]) -> Decimal {
    compute_metrics(holdings)
        .unwrap()
        .tokens
        .iter()
        .map(|t| t.percentage)
        .sum()
}

#[test]
fn percentages_sum_to_one_hundred() {
    let tolerance = Decimal::from_str("0.000001").unwrap();

    let cases: Vec<Vec<TokenHolding>> = vec![
        vec![holding("0xa", "10", 2.0), holding("0xb", "5", 2.0)],
        vec![
            holding("0xa", "1", 3.0),
            holding("0xb", "1", 3.0),
            holding("0xc", "1", 3.0),
        ],
        vec![
            holding("0xa", "0.000000000000000001", 1.0),
            holding("0xb", "123456789.123456789", 0.0042),
        ],
    ];

    for case in cases {
        let sum = percentage_sum(&case);
        let diff = (sum - Decimal::ONE_HUNDRED).abs();
        assert!(diff < tolerance, "sum {} deviates from 100", sum);
    }
}

#[test]
fn empty_portfolio_scenario() {
    let metrics = compute_metrics(&[]).unwrap();
    assert_eq!(metrics.net_worth, Decimal::ZERO);
    assert!(metrics.tokens.is_empty());
    assert_eq!(classify_health(&metrics), HealthScore::NoHoldings);
    assert_eq!(classify_health(&metrics).to_string(), "No Holdings");
}

#[test]
fn single_holding_scenario() {
    let metrics = compute_metrics(&[holding("0xoec", "42.5", 0.37)]).unwrap();
    assert_eq!(metrics.tokens[0].percentage, Decimal::ONE_HUNDRED);
    assert_eq!(classify_health(&metrics), HealthScore::Concentrated);
}

#[test]
fn two_thirds_concentration_is_moderate_risk() {
    let metrics = compute_metrics(&[
        holding("0xoec", "10", 2.0),
        holding("0xeloq", "5", 2.0),
    ])
    .unwrap();

    assert_eq!(metrics.tokens[0].usd_value, Decimal::from(20));
    assert_eq!(metrics.tokens[1].usd_value, Decimal::from(10));
    assert_eq!(metrics.net_worth, Decimal::from(30));

    let max = metrics.tokens.iter().map(|t| t.percentage).max().unwrap();
    assert!(max > Decimal::from(60) && max < Decimal::from(80));
    assert_eq!(classify_health(&metrics), HealthScore::ModerateRisk);
}

#[test]
fn even_three_way_split_is_well_diversified() {
    let metrics = compute_metrics(&[
        holding("0xoec", "100", 1.0),
        holding("0xeloq", "100", 1.0),
        holding("eth", "100", 1.0),
    ])
    .unwrap();

    let max = metrics.tokens.iter().map(|t| t.percentage).max().unwrap();
    assert!(max < Decimal::from(50));
    assert_eq!(classify_health(&metrics), HealthScore::WellDiversified);
}

#[test]
fn dominant_holding_is_high_risk() {
    // One token at 90%, two splitting the remaining 10%
    let metrics = compute_metrics(&[
        holding("0xoec", "90", 1.0),
        holding("0xeloq", "5", 1.0),
        holding("eth", "5", 1.0),
    ])
    .unwrap();

    let max = metrics.tokens.iter().map(|t| t.percentage).max().unwrap();
    assert!(max > Decimal::from(80));
    assert_eq!(classify_health(&metrics), HealthScore::HighRisk);
}

#[test]
fn two_even_holdings_are_moderate() {
    let metrics = compute_metrics(&[
        holding("0xoec", "50", 1.0),
        holding("0xeloq", "50", 1.0),
    ])
    .unwrap();
    assert_eq!(classify_health(&metrics), HealthScore::Moderate);
}

#[test]
fn computation_is_deterministic() {
    let holdings = vec![
        holding("0xoec", "1234.567890123456789", 0.0931),
        holding("0xeloq", "98765.4321", 0.00077),
        holding("eth", "2.5", 3412.18),
    ];

    let first = compute_metrics(&holdings).unwrap();
    let second = compute_metrics(&holdings).unwrap();
    assert_eq!(first, second);
    assert_eq!(classify_health(&first), classify_health(&second));
}

#[test]
fn large_supply_balances_do_not_lose_precision() {
    // 10^20 units at a dust price: would round badly through f64
    let metrics = compute_metrics(&[holding("0xeloq", "100000000000000000000", 0.25)]).unwrap();
    assert_eq!(
        metrics.net_worth,
        Decimal::from_str("25000000000000000000").unwrap()
    );
}
