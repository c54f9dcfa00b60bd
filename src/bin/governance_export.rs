use anyhow::Result;
use dq_exporter::{config, db::sql, export};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let pool = sql::connect(&config::database_url()).await?;
    export::export_tables(&pool, &config::governance_exports()).await?;

    println!("Governance artifacts exported successfully.");
    Ok(())
}
