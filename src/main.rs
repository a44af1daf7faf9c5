use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_circulation::{config, db, seed, server};

/// `--profile <name>` selects a separate database file.
fn profile_arg() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|arg| arg == "--profile")
        .and_then(|pos| args.get(pos + 1).cloned())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biblio_circulation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::with_profile(profile_arg());
    tracing::info!("Using profile '{}' ({})", config.profile, config.database_url);

    // Initialize database
    let db = match db::init_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db).await {
            tracing::error!("Failed to seed data: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    if let Err(e) = server::run_server(db, &config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
