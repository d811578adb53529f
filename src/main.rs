use std::sync::Arc;

use classbook_api::config::ApiConfig;
use classbook_db::{create_pool, schema::initialize_database, PgStore};
use color_eyre::eyre::Result;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let config = ApiConfig::from_env()?;

    let db_pool = create_pool(&config.database_url).await?;
    initialize_database(&db_pool).await?;

    classbook_api::start_server(config, Arc::new(PgStore::new(db_pool))).await?;

    Ok(())
}
