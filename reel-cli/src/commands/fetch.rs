use std::sync::Arc;
use std::time::Duration;

use indicatif::MultiProgress;
use reel_engine::hls::{HlsConfig, VariantSelectionPolicy};
use reel_engine::{
    ArtifactUploader, DownloadOrchestrator, DownloadOutcome, DownloadRequest, DownloaderConfig,
    LocalDirUploader, OrchestratorConfig, S3Uploader, create_client,
};
use tracing::info;

use crate::cli::{FetchArgs, HttpArgs, Store};
use crate::error::AppError;
use crate::utils::progress::ProgressManager;
use crate::utils::{format_bytes, format_duration, parse_headers, parse_size, parse_time};

pub async fn run(
    args: FetchArgs,
    http: &HttpArgs,
    download_config: DownloaderConfig,
    multi: &MultiProgress,
    show_progress: bool,
) -> Result<(), AppError> {
    let request = build_request(&args, http).await?;
    request.validate()?;
    log_selection(&request);

    let client = create_client(&download_config)?;
    let uploader: Arc<dyn ArtifactUploader> = match args.store {
        Store::S3 => {
            info!("Uploading to S3");
            Arc::new(S3Uploader::from_env(args.region.clone(), args.endpoint.clone()).await)
        }
        Store::Local => {
            info!(root = %args.local_root.display(), "Copying into local store");
            Arc::new(LocalDirUploader::new(&args.local_root))
        }
    };

    let mut hls_config = HlsConfig::default();
    hls_config.playlist_config.variant_selection_policy = parse_variant_policy(&args.variant)?;
    hls_config.fetcher_config.max_segment_retries = args.segment_retries;
    hls_config.fetcher_config.segment_download_timeout = Duration::from_secs(args.segment_timeout);

    let progress_manager = if show_progress {
        ProgressManager::new(multi.clone(), "Downloading")
    } else {
        ProgressManager::new_disabled(multi.clone())
    };

    let orchestrator = DownloadOrchestrator::new(client, uploader)
        .with_config(OrchestratorConfig {
            downloads_dir: http.downloads_dir.clone(),
            key_prefix: args.key_prefix.clone(),
            keep_failed_artifacts: args.keep_failed,
            remove_after_upload: args.remove_after_upload,
        })
        .with_hls_config(hls_config)
        .with_progress(Arc::new(move |event| {
            progress_manager.handle_event(event);
        }));

    let outcome = orchestrator.run(request).await;
    println!("Download result: {outcome}");

    match outcome {
        DownloadOutcome::Success(completed) => {
            info!(
                artifact = %completed.artifact.display(),
                key = %completed.key,
                kind = %completed.kind,
                "Stored {}",
                format_bytes(completed.bytes)
            );
            Ok(())
        }
        DownloadOutcome::Failed(reason) => Err(AppError::Failed(reason)),
    }
}

/// Request from `--request-file`, or assembled from the command line.
/// `-H` headers are added on top of the ones in the file.
async fn build_request(args: &FetchArgs, http: &HttpArgs) -> Result<DownloadRequest, AppError> {
    let mut request = match &args.request_file {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            DownloadRequest::from_json(&json)?
        }
        None => {
            let url = args
                .url
                .clone()
                .ok_or_else(|| AppError::InvalidInput("URL is required".to_string()))?;
            let bucket = args
                .bucket
                .clone()
                .ok_or_else(|| AppError::InvalidInput("--bucket is required".to_string()))?;

            let mut request = DownloadRequest::new(url, bucket).with_time_range(
                args.start.as_deref().map(parse_time).transpose()?,
                args.end.as_deref().map(parse_time).transpose()?,
            );
            if let Some(filename) = &args.filename {
                request = request.with_filename(filename);
            }
            if let Some(byte_range) = &args.byte_range {
                request = request.with_byte_range(parse_size(byte_range)?);
            }
            request
        }
    };

    request.headers.extend(parse_headers(&http.headers));
    Ok(request)
}

fn log_selection(request: &DownloadRequest) {
    if request.start_seconds.is_some() || request.end_seconds.is_some() {
        info!(
            "Playlist window: {} -> {}",
            request
                .start_seconds
                .map(format_duration)
                .unwrap_or_else(|| "start".to_string()),
            request
                .end_seconds
                .map(format_duration)
                .unwrap_or_else(|| "end".to_string()),
        );
    }
    if let Some(length) = request.byte_range {
        info!("Byte range: first {}", format_bytes(length));
    }
}

/// "highest", "lowest" or a target bitrate in bits per second.
fn parse_variant_policy(value: &str) -> Result<VariantSelectionPolicy, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "highest" => Ok(VariantSelectionPolicy::HighestBitrate),
        "lowest" => Ok(VariantSelectionPolicy::LowestBitrate),
        other => other
            .parse::<u64>()
            .map(VariantSelectionPolicy::ClosestToBitrate)
            .map_err(|_| AppError::InvalidInput(format!("Invalid variant selection: '{value}'"))),
    }
}
