use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use msp_leadgen::apollo::ApolloClient;
use msp_leadgen::cli::Cli;
use msp_leadgen::config::Config;
use msp_leadgen::db::Database;
use msp_leadgen::pipeline;
use msp_leadgen::scrape::RankingScraper;
use msp_leadgen::storage::LeadStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msp_leadgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    let db = Database::new(&config.database_path).await?;
    tracing::info!("Database ready at {}", config.database_path);
    let store = LeadStore::new(db.pool.clone());

    // Ctrl-C flips the token so multi-hour quota waits abort cleanly
    // instead of holding the process hostage.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting in-flight waits");
            signal_token.cancel();
        }
    });

    if args.refresh || args.refresh_companies {
        let scraper = RankingScraper::new(&config)?;
        let count = pipeline::refresh_companies(&scraper, &store).await?;
        tracing::info!("Company ranking refreshed, {} entries", count);
    } else {
        tracing::info!("Skipping company ranking update");
    }

    if args.refresh || args.refresh_contacts {
        let mut client = ApolloClient::new(&config, cancel.clone())?;
        if args.refresh {
            store.clear_contacts().await?;
        }
        let written =
            pipeline::enrich_contacts(&mut client, &store, args.limit, !args.refresh).await?;
        tracing::info!("Contact enrichment finished, {} contact(s) written", written);
    } else {
        tracing::info!("Skipping contact update");
    }

    if let Some(cleaned_path) = &args.merge {
        pipeline::merge_cleaned(&store, cleaned_path, args.confidence).await?;
    }

    match &args.output {
        Some(path) => {
            pipeline::export_csv(&store, path).await?;
        }
        None => tracing::info!("Not outputting data"),
    }

    Ok(())
}
