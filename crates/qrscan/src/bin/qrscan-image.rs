use qrscan::{DecodeError, OneShotDecoder, QrEngine};
use qrscan_base::init_stdout_logger;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_stdout_logger();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        return Err("usage: qrscan-image <image>...".into());
    }

    let decoder = OneShotDecoder::new(QrEngine::new);
    let mut failures = 0;
    for path in &paths {
        match decoder.scan_image(path.as_path()).await {
            Ok(payload) => println!("{}: {}", path.display(), payload),
            Err(DecodeError::NotFound) => {
                log::warn!("{}: no QR code found", path.display());
                failures += 1;
            }
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} images failed", paths.len()).into());
    }
    Ok(())
}
