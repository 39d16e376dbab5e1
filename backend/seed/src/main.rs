use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seed document path or http(s) URL
    source: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let loaded = seed::load(&args.source, &args.redis_url).await?;

    println!("Total Categories: {}", loaded.categories);
    println!("Total Recipes: {}", loaded.recipes);

    Ok(())
}
