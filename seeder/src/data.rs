use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// The token registry: symbol, name, contract address, decimals, feed id,
/// native flag. ETH is the chain's native coin.
const TOKENS: &[(&str, &str, Option<&str>, i32, Option<&str>, bool)] = &[
    (
        "OEC",
        "Oeconomia",
        Some("0x4a3f9b1c6d8e2f5a7b9c0d1e2f3a4b5c6d7e8f90"),
        18,
        Some("oeconomia"),
        false,
    ),
    (
        "ELOQ",
        "Eloquent",
        Some("0x8c2e5f0a1b3c4d5e6f708192a3b4c5d6e7f80913"),
        18,
        Some("eloquent"),
        false,
    ),
    ("ETH", "Ethereum", None, 18, Some("ethereum"), true),
];

const DEMO_WALLETS: &[(&str, &str)] = &[
    ("0xab5801a7d398351b8be11c439e05c5b3259aec9b", "Main Wallet"),
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", "Cold Storage"),
];

const STAKING_POOLS: &[(&str, &str)] = &[
    ("OEC", "OEC Single Stake"),
    ("ELOQ", "ELOQ-ETH LP"),
];

/// Upsert the three supported tokens. Idempotent by symbol.
pub async fn seed_tokens(pool: &PgPool) -> Result<usize> {
    for (symbol, name, contract, decimals, feed_id, is_native) in TOKENS {
        sqlx::query(
            "INSERT INTO tokens (symbol, name, contract_address, decimals, price_feed_id, is_native)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (symbol)
             DO UPDATE SET name = EXCLUDED.name,
                           contract_address = EXCLUDED.contract_address,
                           decimals = EXCLUDED.decimals,
                           price_feed_id = EXCLUDED.price_feed_id,
                           is_native = EXCLUDED.is_native",
        )
        .bind(symbol)
        .bind(name)
        .bind(contract)
        .bind(decimals)
        .bind(feed_id)
        .bind(is_native)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to upsert token {}", symbol))?;
    }

    Ok(TOKENS.len())
}

/// Create a demo user with two wallets, random balances, and a couple of
/// staking positions. Returns the demo user's id.
pub async fn seed_demo_data(pool: &PgPool, rng: &mut StdRng) -> Result<Uuid> {
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (username, email)
         VALUES ('demo', 'demo@oeconomia.io')
         ON CONFLICT (username)
         DO UPDATE SET email = EXCLUDED.email
         RETURNING id",
    )
    .fetch_one(pool)
    .await
    .context("Failed to upsert demo user")?;

    let tokens: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, symbol FROM tokens")
        .fetch_all(pool)
        .await
        .context("Failed to load tokens")?;

    for (address, label) in DEMO_WALLETS {
        let wallet_id: Uuid = sqlx::query_scalar(
            "INSERT INTO wallets (user_id, address, label)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, address)
             DO UPDATE SET label = EXCLUDED.label
             RETURNING id",
        )
        .bind(user_id)
        .bind(address)
        .bind(label)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to upsert wallet {}", address))?;

        for (token_id, symbol) in &tokens {
            let balance = random_balance(rng, symbol);
            sqlx::query(
                "INSERT INTO balances (wallet_id, token_id, balance)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (wallet_id, token_id)
                 DO UPDATE SET balance = EXCLUDED.balance, updated_at = NOW()",
            )
            .bind(wallet_id)
            .bind(token_id)
            .bind(balance)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to upsert balance for {}", symbol))?;
        }
    }

    let first_wallet: Uuid = sqlx::query_scalar(
        "SELECT id FROM wallets WHERE user_id = $1 ORDER BY created_at ASC LIMIT 1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to load demo wallet")?;

    for (symbol, pool_name) in STAKING_POOLS {
        let Some((token_id, _)) = tokens.iter().find(|(_, s)| s == symbol) else {
            continue;
        };

        let amount = Decimal::from(rng.gen_range(100..5_000));
        let rewards = Decimal::new(rng.gen_range(0..10_000), 2);
        let apy = Decimal::new(rng.gen_range(200..3_500), 2);

        sqlx::query(
            "INSERT INTO staking_positions
                 (wallet_id, token_id, pool_name, amount_staked, rewards_earned, apy)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(first_wallet)
        .bind(token_id)
        .bind(pool_name)
        .bind(amount)
        .bind(rewards)
        .bind(apy)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to insert staking position in {}", pool_name))?;
    }

    Ok(user_id)
}

fn random_balance(rng: &mut StdRng, symbol: &str) -> Decimal {
    match symbol {
        // ETH balances are small, token balances larger
        "ETH" => Decimal::new(rng.gen_range(1..500), 2),
        _ => Decimal::from(rng.gen_range(100..100_000)),
    }
}
