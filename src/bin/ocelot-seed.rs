use anyhow::Result;
use clap::Parser;
use ocelot::config::Config;
use ocelot::seed::seed_sample_links;
use ocelot::storage;

#[derive(Parser)]
#[command(name = "ocelot-seed")]
#[command(about = "Insert sample short links for local development", long_about = None)]
struct Cli {
    /// Owner of the sample links (user id as reported by the identity provider)
    #[arg(long, env = "SEED_OWNER_ID")]
    owner: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;

    println!(
        "Seeding database with {} sample links...",
        ocelot::seed::SAMPLE_LINKS.len()
    );
    let report = seed_sample_links(storage.as_ref(), &cli.owner).await?;

    println!("✓ Inserted {} sample links", report.inserted.len());
    for (index, link) in report.inserted.iter().enumerate() {
        println!(
            "{}. {} ({}) - {} clicks",
            index + 1,
            link.title.as_deref().unwrap_or("-"),
            link.short_code,
            link.clicks
        );
    }
    if !report.skipped.is_empty() {
        println!(
            "⚠ Skipped {} existing codes: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    Ok(())
}
