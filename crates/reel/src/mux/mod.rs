//! Audio + video muxing through an external ffmpeg process.

mod progress;

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument};

pub use progress::{MuxProgress, ProgressParser};

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg failed: {0}")]
    Failed(String),
}

/// Take the audio track of one input and the video track of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxJob {
    pub audio: PathBuf,
    pub video: PathBuf,
    pub output: PathBuf,
}

impl MuxJob {
    pub fn new(
        audio: impl Into<PathBuf>,
        video: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            audio: audio.into(),
            video: video.into(),
            output: output.into(),
        }
    }

    /// ffmpeg arguments; video is copied, audio goes through the output
    /// container's default encoder.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-loglevel", "8", "-hide_banner", "-y", "-progress", "pipe:1"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push("-i".into());
        args.push(self.audio.to_string_lossy().into_owned());
        args.push("-i".into());
        args.push(self.video.to_string_lossy().into_owned());
        args.extend(
            ["-map", "0:a", "-map", "1:v", "-c:v", "copy"]
                .into_iter()
                .map(String::from),
        );
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Run ffmpeg to completion, reporting every progress block.
    #[instrument(skip(self, on_progress), fields(output = %self.output.display()))]
    pub async fn run<F>(&self, ffmpeg: &str, mut on_progress: F) -> Result<(), MuxError>
    where
        F: FnMut(MuxProgress) + Send,
    {
        let args = self.args();
        debug!(program = ffmpeg, ?args, "Spawning mux process");

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MuxError::Spawn {
                program: ffmpeg.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MuxError::Failed("stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MuxError::Failed("stderr was not captured".to_string()))?;

        let read_progress = async {
            let mut lines = BufReader::new(stdout).lines();
            let mut parser = ProgressParser::new();
            while let Some(line) = lines.next_line().await? {
                if let Some(block) = parser.push_line(&line) {
                    on_progress(block);
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let read_stderr = async {
            let mut text = String::new();
            stderr.read_to_string(&mut text).await.map(|_| text)
        };

        let (progress, stderr_text) = tokio::join!(read_progress, read_stderr);
        progress?;
        let stderr_text = stderr_text?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(MuxError::Failed(format!("{status}: {}", stderr_text.trim())));
        }

        info!("Mux finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let job = MuxJob::new("dl/audio.weba", "dl/video.mp4", "dl/out.mp4");
        assert_eq!(
            job.args(),
            vec![
                "-loglevel", "8", "-hide_banner", "-y", "-progress", "pipe:1", "-i",
                "dl/audio.weba", "-i", "dl/video.mp4", "-map", "0:a", "-map", "1:v", "-c:v",
                "copy", "dl/out.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let job = MuxJob::new("a", "v", "o");
        let err = job
            .run("reel-definitely-not-a-real-ffmpeg", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::Spawn { .. }));
    }
}
