use std::path::Path;

use anyhow::Result;
use dq_exporter::{config, db::sql, export};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let pool = sql::connect(&config::database_url()).await?;
    export::export_report(
        &pool,
        Path::new(config::DQ_REPORT_PATH),
        &config::dq_report_sheets(),
    )
    .await?;

    println!("Data Quality report generated successfully.");
    Ok(())
}
