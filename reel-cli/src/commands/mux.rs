use std::path::{Path, PathBuf};

use indicatif::MultiProgress;
use reel_engine::naming::base_name;
use reel_engine::{
    ContentClassifier, DownloadRequest, DownloaderConfig, MediaKind, MuxJob, ProgressEvent,
    RangeDownloader, create_client,
};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::{info, warn};

use crate::cli::{HttpArgs, MuxArgs};
use crate::error::AppError;
use crate::utils::progress::ProgressManager;
use crate::utils::{format_bytes, parse_headers};

pub async fn run(
    args: MuxArgs,
    http: &HttpArgs,
    download_config: DownloaderConfig,
    multi: &MultiProgress,
    show_progress: bool,
) -> Result<(), AppError> {
    // both sources come from the same site, so -H applies to every request
    let mut download_config = download_config;
    for (name, value) in parse_headers(&http.headers) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                download_config.headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid header"),
        }
    }
    let client = create_client(&download_config)?;

    tokio::fs::create_dir_all(&http.downloads_dir).await?;
    let manager = |label: &str| {
        if show_progress {
            ProgressManager::new(multi.clone(), label)
        } else {
            ProgressManager::new_disabled(multi.clone())
        }
    };

    let (audio, video) = tokio::try_join!(
        fetch_input(&client, &args.audio, "audio", &http.downloads_dir, manager("Audio")),
        fetch_input(&client, &args.video, "video", &http.downloads_dir, manager("Video")),
    )?;

    let job = MuxJob::new(&audio, &video, &args.output);
    job.run(&args.ffmpeg, manager("Merged").mux_reporter()).await?;
    println!("Mux result: success ({})", args.output.display());

    if !args.keep_inputs {
        for input in [&audio, &video] {
            if let Err(e) = tokio::fs::remove_file(input).await {
                warn!(path = %input.display(), error = %e, "Failed to remove mux input");
            }
        }
    }
    Ok(())
}

/// Download one mux input completely into the downloads directory.
async fn fetch_input(
    client: &Client,
    url: &str,
    role: &str,
    downloads_dir: &Path,
    progress: ProgressManager,
) -> Result<PathBuf, AppError> {
    let headers = HeaderMap::new();
    let classification = ContentClassifier::new(client.clone())
        .classify(url, &headers)
        .await
        .unwrap_or_default();
    if classification.kind == MediaKind::Playlist {
        return Err(AppError::InvalidInput(format!(
            "{role} source is an HLS playlist; mux needs plain media files: {url}"
        )));
    }

    let path = input_path(downloads_dir, url, role, classification.extension);
    progress.handle_event(ProgressEvent::ArtifactOpened { path: path.clone() });

    let mut sink = BufWriter::new(File::create(&path).await?);
    let on_progress: reel_engine::OnProgress = {
        let progress = progress.clone();
        std::sync::Arc::new(move |event| progress.handle_event(event))
    };
    let bytes = RangeDownloader::new(client.clone())
        .download(url, &headers, None, &mut sink, Some(&on_progress))
        .await?;
    drop(sink);

    progress.handle_event(ProgressEvent::ArtifactClosed {
        path: path.clone(),
        bytes,
    });
    info!(role, path = %path.display(), "Fetched {} of {role}", format_bytes(bytes));
    Ok(path)
}

/// `{downloads_dir}/{name}.{role}{extension}`
fn input_path(downloads_dir: &Path, url: &str, role: &str, extension: &str) -> PathBuf {
    let name = base_name(&DownloadRequest::new(url, ""));
    downloads_dir.join(format!("{name}.{role}{extension}"))
}
