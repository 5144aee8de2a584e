use clap::Parser;
use netcfg_device::{Device, DeviceConfig, EventLoop, NmcliBackend, gatt, netcfg_service};
use netcfg_proto::ChunkCodec;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DeviceConfig::parse();
    let hostname = hostname().await;

    let backend = NmcliBackend::new(config.wifi_iface.clone(), config.use_sudo);
    let device = Device::new(backend, ChunkCodec::new(config.chunk_size)?, config.scan_stale_after());
    let (handle, event_loop) = EventLoop::spawn(netcfg_service(device)?);

    let server = gatt::serve(&config.local_name(&hostname), handle).await?;
    info!("netcfg ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    drop(server);
    event_loop.abort();
    Ok(())
}

async fn hostname() -> String {
    tokio::fs::read_to_string("/proc/sys/kernel/hostname")
        .await
        .ok()
        .and_then(|h| h.trim().split('.').next().map(str::to_string))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "device".to_string())
}
