/// Import or refresh catalog products from a CSV export
///
/// Usage: import-products --file products.csv [--dry-run]
///
/// Expected header: barcode,name,brand,category,ingredients,image_url,safety_score,rating,pao_months
/// Rows are upserted by barcode; rows without a barcode are always inserted.

use std::path::PathBuf;

use clap::Parser;
use skinshield_api::{
    db::{self, Repositories},
    models::product::UpsertProductRequest,
    services::products::ProductService,
};

#[derive(Parser)]
#[command(name = "import-products", about = "Import skincare products from CSV")]
struct Args {
    /// CSV file to import
    #[arg(long)]
    file: PathBuf,

    /// Validate the file without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let mut reader = csv::Reader::from_path(&args.file)?;
    let rows: Vec<UpsertProductRequest> = reader
        .deserialize()
        .collect::<Result<_, csv::Error>>()?;
    tracing::info!("Read {} product row(s) from {}", rows.len(), args.file.display());

    if args.dry_run {
        tracing::info!("Dry run, nothing written");
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = db::create_pool(&database_url).await?;
    let products = ProductService::new(&Repositories::postgres(pool));

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (line, row) in rows.iter().enumerate() {
        match products.upsert(row).await {
            Ok(_) => imported += 1,
            Err(e) => {
                // +2: header row and 1-based lines
                tracing::warn!("Row {} ({}) skipped: {}", line + 2, row.name, e);
                skipped += 1;
            }
        }
    }

    tracing::info!("Import finished: {} upserted, {} skipped", imported, skipped);
    Ok(())
}
