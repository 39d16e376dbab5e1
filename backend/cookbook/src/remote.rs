use anyhow::Error;
use reqwest::get;

use crate::Seed;

pub async fn get_seed_remote(url: &str) -> Result<Seed, Error> {
    let response = get(url).await?.error_for_status()?;
    let seed = response.json::<Seed>().await?;

    Ok(seed)
}
