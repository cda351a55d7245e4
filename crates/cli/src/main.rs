mod job;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden_core::{
    load_config, load_config_from_env, validate_config, FfprobeProber, Probe, TranscodeError,
    TranscodeProgress, Transcoder,
};

use job::Job;

/// Buffer size for progress updates
const PROGRESS_BUFFER_SIZE: usize = 64;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        let report = match e.downcast_ref::<TranscodeError>() {
            Some(err) => json!({
                "state": "failed",
                "error": err.to_string(),
                "reasons": err.reasons(),
                "output_tail": err.output_tail(),
            }),
            None => json!({
                "state": "failed",
                "error": format!("{:#}", e),
            }),
        };
        println!("{}", report);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(job_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("Usage: warden <job.toml>");
    };

    // Load configuration
    let config = match std::env::var_os("WARDEN_CONFIG").map(PathBuf::from) {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            load_config(&config_path)
                .with_context(|| format!("Failed to load config from {:?}", config_path))?
        }
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    validate_config(&config).context("Configuration validation failed")?;
    info!("ffmpeg: {:?}", config.ffmpeg.ffmpeg_path);
    info!("ffprobe: {:?}", config.ffmpeg.ffprobe_path);

    let job = Job::load(&job_path)?;

    let probe: Arc<dyn Probe> = Arc::new(FfprobeProber::new(&config.ffmpeg.ffprobe_path));
    let source = probe
        .probe(&job.input)
        .await
        .with_context(|| format!("Failed to probe {:?}", job.input))?;
    if !source.valid {
        bail!("Input {:?} is not a decodable media file", job.input);
    }
    let mut concat = Vec::with_capacity(job.concat.len());
    for path in &job.concat {
        concat.push(
            probe
                .probe(path)
                .await
                .with_context(|| format!("Failed to probe {:?}", path))?,
        );
    }

    let request = job.into_request(source, concat, &config.supervisor);
    let mut transcoder = Transcoder::build(request, &config.ffmpeg, probe)?;

    let (progress_tx, mut progress_rx) = mpsc::channel::<TranscodeProgress>(PROGRESS_BUFFER_SIZE);
    let reporter = tokio::spawn(async move {
        let mut last_percent = None;
        while let Some(progress) = progress_rx.recv().await {
            let percent = progress.percent().floor() as u32;
            if last_percent != Some(percent) {
                info!(percent, "Progress");
                last_percent = Some(percent);
            }
        }
    });

    let result = transcoder.run_with_progress(progress_tx).await;
    // The sender is gone once the run returns, so the reporter drains and ends.
    let _ = reporter.await;
    let encoded = result?;

    let report = json!({
        "state": transcoder.state(),
        "command": transcoder.command_line(),
        "output": encoded,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
