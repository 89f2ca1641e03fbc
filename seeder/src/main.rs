mod data;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use sqlx::postgres::PgPoolOptions;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "seeder")]
#[command(about = "Database seeding utility for the Oeconomia portfolio dashboard")]
struct Args {
    #[arg(long, default_value = "postgresql://localhost/portfolio_dashboard")]
    database_url: String,

    /// Also create a demo user with wallets, balances, and staking positions
    #[arg(long)]
    demo: bool,

    /// Seed for deterministic demo data
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").unwrap_or(args.database_url);

    println!("{}", "=".repeat(80).cyan());
    println!("{}", "Oeconomia Portfolio Dashboard Seeder".bold().cyan());
    println!("{}", "=".repeat(80).cyan());
    println!();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("../database/migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let mut rng: rand::rngs::StdRng = if let Some(seed) = args.seed {
        println!("{} Using seed: {}", "ℹ".blue(), seed);
        rand::SeedableRng::seed_from_u64(seed)
    } else {
        rand::SeedableRng::from_entropy()
    };

    let start_time = Instant::now();

    let token_count = data::seed_tokens(&pool).await?;
    println!("{} Seeded {} tokens (OEC, ELOQ, ETH)", "✓".green(), token_count);

    if args.demo {
        let user_id = data::seed_demo_data(&pool, &mut rng).await?;
        println!("{} Created demo user {}", "✓".green(), user_id);
    }

    let elapsed = start_time.elapsed();
    println!();
    println!("{}", "=".repeat(80).cyan());
    println!(
        "{} Seeding completed in {:.2}s",
        "✓".green().bold(),
        elapsed.as_secs_f64()
    );
    println!("{}", "=".repeat(80).cyan());

    Ok(())
}
