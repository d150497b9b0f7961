use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reel_engine::{MuxProgress, PipelineState, ProgressEvent};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap()
        .progress_chars("=> ")
}

fn segment_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.cyan/white}] {pos}/{len} segments")
        .unwrap()
        .progress_chars("=> ")
}

fn mux_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap()
}

/// Renders engine progress events as indicatif bars.
///
/// One manager follows one pipeline; several managers may share a
/// `MultiProgress`.
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    label: String,
    bar: Arc<Mutex<Option<ProgressBar>>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress, label: impl Into<String>) -> Self {
        Self {
            multi,
            label: label.into(),
            bar: Arc::new(Mutex::new(None)),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            label: String::new(),
            bar: Arc::new(Mutex::new(None)),
            disabled: true,
        }
    }

    pub fn handle_event(&self, event: ProgressEvent) {
        if self.disabled {
            return;
        }

        let mut bar = self.bar.lock().unwrap();
        match event {
            ProgressEvent::ArtifactOpened { path } => {
                let new_bar = self.multi.add(ProgressBar::new(0));
                new_bar.set_style(download_style());
                new_bar.set_message(format!("{} {}", self.label, path.to_string_lossy()));
                new_bar.enable_steady_tick(Duration::from_millis(500));
                *bar = Some(new_bar);
            }
            ProgressEvent::BytesReceived { downloaded, total } => {
                if let Some(bar) = bar.as_ref() {
                    if let Some(total) = total {
                        bar.set_length(total);
                    }
                    bar.set_position(downloaded);
                }
            }
            ProgressEvent::SegmentFetched { index, total, .. } => {
                if let Some(bar) = bar.as_ref() {
                    if bar.length() != Some(total as u64) {
                        bar.set_style(segment_style());
                        bar.set_length(total as u64);
                    }
                    bar.set_position(index as u64);
                }
            }
            ProgressEvent::ArtifactClosed { path, .. } => {
                if let Some(bar) = bar.take() {
                    bar.finish_with_message(format!("Finished {}", path.to_string_lossy()));
                }
            }
            ProgressEvent::StateChanged { state } => {
                if state == PipelineState::Failed {
                    if let Some(bar) = bar.take() {
                        bar.abandon_with_message(format!("{} failed", self.label));
                    }
                }
            }
        }
    }

    /// Spinner showing ffmpeg's progress blocks.
    pub fn mux_reporter(&self) -> Box<dyn FnMut(MuxProgress) + Send> {
        let spinner = if self.disabled {
            ProgressBar::hidden()
        } else {
            let spinner = self.multi.add(ProgressBar::new_spinner());
            spinner.set_style(mux_style());
            spinner.enable_steady_tick(Duration::from_millis(200));
            spinner
        };

        Box::new(move |progress: MuxProgress| {
            let message = format!(
                "Merging: frame {} at {} fps => {} ({})",
                progress.frame.unwrap_or_default(),
                progress.fps.unwrap_or_default(),
                progress.speed.as_deref().unwrap_or("-"),
                progress.out_time.as_deref().unwrap_or("--:--:--"),
            );
            if progress.finished {
                spinner.finish_with_message(message);
            } else {
                spinner.set_message(message);
            }
        })
    }
}
