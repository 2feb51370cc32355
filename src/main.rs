use anyhow::Result;
use log::{error, info, warn};
use ring_watch::archiver::VideoArchiver;
use ring_watch::config;
use ring_watch::device_manager::{DeviceKind, DeviceSession, RingClient};
use ring_watch::notifier::{self, message};
use ring_watch::poller::EventPoller;
use std::path::PathBuf;
use std::sync::Arc;

async fn run_app() -> Result<()> {
    info!("Starting Ring Watch event monitor");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    config.validate()?;
    info!("Configuration loaded");

    if config.archive.download_videos {
        std::fs::create_dir_all(&config.archive.videos_dir)?;
        info!(
            "Videos directory: {}",
            config.archive.videos_dir.display()
        );
    }

    let channel = notifier::create_channel(&config.notifier)?;

    // Unrecoverable authentication aborts here, before the loop starts
    let session: Arc<dyn DeviceSession> =
        Arc::new(RingClient::connect(config.ring.clone()).await?);
    info!("Ring session initialized");

    let devices = session.devices().await?;
    let doorbells = devices
        .iter()
        .filter(|d| d.kind == DeviceKind::Doorbell)
        .count();
    let cameras = devices
        .iter()
        .filter(|d| d.kind == DeviceKind::Camera)
        .count();
    info!("Found {} doorbell(s) and {} camera(s)", doorbells, cameras);

    let archiver = if config.archive.download_videos {
        Some(Arc::new(VideoArchiver::new(
            session.clone(),
            &config.archive.videos_dir,
            config.archive.max_storage_bytes(),
        )?))
    } else {
        None
    };

    let mut poller = EventPoller::new(
        session,
        channel.clone(),
        archiver.clone(),
        config.poller.clone(),
    );
    poller.init_tracking().await?;

    info!(
        "Checking for events every {} seconds",
        config.poller.check_interval_secs
    );
    let startup = message::started_notification(config.archive.download_videos);
    if let Err(e) = channel.send(&startup).await {
        warn!("Failed to send startup notification: {}", e);
    }

    let mut interval = tokio::time::interval(config.poller.check_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut iteration: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                poller.poll_once().await;

                iteration += 1;
                if iteration % 100 == 0 {
                    if let Some(archiver) = &archiver {
                        info!("{}", archiver.stats());
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Shutting down...");
                break;
            }
        }
    }

    let stats = archiver.as_ref().map(|a| a.stats());
    let stopped = message::stopped_notification(stats.as_ref());
    if let Err(e) = channel.send(&stopped).await {
        error!("Failed to send shutdown notification: {}", e);
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    if let Err(e) = runtime.block_on(run_app()) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
