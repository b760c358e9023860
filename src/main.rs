//! Multicam-align binary: live aligned color and colorized depth from every
//! attached RealSense device.

use multicam_align::{FramePipeline, PipelineConfig, RealSense, TerminalWindow, WindowConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> multicam_align::Result<()> {
    let camera = RealSense::new()?;
    let mut pipeline = FramePipeline::start(&camera, &PipelineConfig::default())?;
    info!(sessions = pipeline.session_count(), "Pipeline started");

    let window = WindowConfig::default();
    let mut display = TerminalWindow::open(&window.title, window.width, window.height)?;
    pipeline.run(&mut display)?;

    info!("Window closed");
    Ok(())
}
