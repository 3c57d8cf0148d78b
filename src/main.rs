//! Discord FUSE filesystem for Linux
//!
//! Mounts the channels of a Discord category as directories and their
//! attachment messages as files.

use anyhow::{Context, Result};
use clap::{Arg, Command};
use discord_fs::bootstrap::build_index;
use discord_fs::bridge::Bridge;
use discord_fs::config::ProjectConfig;
use discord_fs::fuse::mount_filesystem;
use discord_fs::log_appender::setup_logging;
use discord_fs::remote::{DiscordClient, ObjectStoreClient};
use discord_fs::store::ChatStore;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let matches = Command::new("discord-fs")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mount Discord channels as a FUSE filesystem")
        .arg(
            Arg::new("mountpoint")
                .value_name("PATH")
                .help("Mount point path")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Settings file (defaults to the user config directory)")
                .num_args(1),
        )
        .get_matches();

    let mountpoint = matches
        .get_one::<String>("mountpoint")
        .map(PathBuf::from)
        .context("Mount point is required")?;
    let config_file = matches.get_one::<String>("config").map(PathBuf::from);

    let project_config =
        ProjectConfig::new(config_file.as_deref()).context("Failed to load settings")?;
    let settings = project_config.settings.clone();
    setup_logging(&project_config.data_dir(), &settings.log_level)
        .context("Failed to initialize logging")?;

    info!("Starting Discord FUSE filesystem");
    info!("Mount point: {}", mountpoint.display());
    info!("Settings file: {}", project_config.settings_path.display());

    check_mountpoint(&mountpoint)?;

    let (token, root_channel_id) = settings.credentials().with_context(|| {
        format!(
            "Incomplete settings in {}",
            project_config.settings_path.display()
        )
    })?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let client: Arc<dyn ObjectStoreClient> = Arc::new(DiscordClient::new(token));
    let (root, index) = runtime
        .block_on(build_index(client.as_ref(), root_channel_id))
        .with_context(|| format!("Failed to resolve root channel {}", root_channel_id))?;

    let bridge = Bridge::new(runtime.handle().clone(), &settings.bridge);
    let store = Arc::new(ChatStore::new(
        client,
        bridge,
        root.group,
        index,
        settings.store.clone(),
    ));

    let mountpoint_for_shutdown = mountpoint.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        if let Err(e) = std::process::Command::new("fusermount")
            .arg("-u")
            .arg(&mountpoint_for_shutdown)
            .output()
        {
            error!("Failed to unmount filesystem: {}", e);
        }
    })
    .context("Error setting Ctrl-C handler")?;

    // blocks until unmounted; the runtime stays alive for the bridge meanwhile
    mount_filesystem(store, &mountpoint)?;
    info!("Shut down cleanly");
    Ok(())
}

fn check_mountpoint(mountpoint: &Path) -> Result<()> {
    // clear a stale mount left by a previous crash ("Transport endpoint is not connected")
    let _ = std::process::Command::new("fusermount")
        .arg("-u")
        .arg(mountpoint)
        .output();

    if !mountpoint.exists() {
        return Err(anyhow::anyhow!(
            "Mount point does not exist: {}",
            mountpoint.display()
        ));
    }
    if !mountpoint.is_dir() {
        return Err(anyhow::anyhow!(
            "Mount point is not a directory: {}",
            mountpoint.display()
        ));
    }
    Ok(())
}
