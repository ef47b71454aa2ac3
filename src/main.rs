use std::{env, sync::Arc};

use log::{error, info, warn};
use recipe_api::{api, error::Error, Config, MemoryStore, PgStore, SharedStore};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| String::from("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    let keys = Arc::new(config.session_keys()?);

    let store: SharedStore = match &config.database {
        Some(database) => {
            let store = PgStore::connect(database).await?;
            store.migrate().await?;
            info!("Migrations applied");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let (address, server) = warp::serve(api(store, keys))
        .try_bind_with_graceful_shutdown(config.bind_address, async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .map_err(|e| Error::Config(format!("Cannot bind {}: {e}", config.bind_address)))?;

    info!("Listening on http://{address}");
    server.await;

    Ok(())
}
