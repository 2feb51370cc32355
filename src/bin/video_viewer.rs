use anyhow::Result;
use log::info;
use ring_watch::api::RestApi;
use ring_watch::config;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;

    std::fs::create_dir_all(&config.archive.videos_dir)?;
    info!(
        "Serving clips from {}",
        config.archive.videos_dir.display()
    );

    let api = RestApi::new(&config.viewer, &config.archive.videos_dir)?;
    api.run().await
}
