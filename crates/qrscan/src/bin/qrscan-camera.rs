use qrscan::{QrEngine, ScanConfig, ScanEvents, ScanLoop};
use qrscan_base::init_stdout_logger;
use qrscan_video::{CameraConfig, CameraController, FrameSource, V4l2Device};

const DEFAULT_DEVICE: &str = "/dev/video0";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_stdout_logger();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let source = FrameSource::new();
    let mut camera = CameraController::new(V4l2Device::new(&path), source.clone(), CameraConfig::default());
    camera.set_active(true).await?;
    log::info!("scanning from {} at {}", path, source.current_dimensions());

    let events = ScanEvents::new(|payload: String| println!("{payload}"))
        .with_error(|e| log::error!("{}", e));
    let scan_loop = ScanLoop::spawn(source, QrEngine::new(), ScanConfig::default(), events)?;

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    scan_loop.shutdown().await;
    camera.set_active(false).await?;
    Ok(())
}
