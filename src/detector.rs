use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::{io::AsyncReadExt, process::Command};

use crate::error::DetectionError;

/// Label used when the detector sees nothing it recognises.
pub const FALLBACK_LABEL: &str = "mysterious object";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for anything that can name the subject of an image.
///
/// The pipeline only depends on this trait, so the subprocess below can be
/// replaced by an in-process model or a remote service.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Returns a short label for the main subject of the JPEG `image`.
    async fn detect(&self, image: &[u8]) -> Result<String, DetectionError>;
}

static STAGED_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A temporary image file that is removed when dropped.
struct StagedImage {
    path: PathBuf,
}

impl StagedImage {
    async fn write(dir: &Path, bytes: &[u8]) -> Result<Self, DetectionError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = STAGED_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("temp_image_{millis}_{seq}.jpg"));

        tokio::fs::write(&path, bytes)
            .await
            .map_err(DetectionError::Stage)?;

        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Runs an external detection program once per image.
///
/// The program is called as `program args... <image path>` and must print a
/// single label on stdout. Anything written to stderr is treated as a failure,
/// whatever the exit code.
pub struct SubprocessDetector {
    program: PathBuf,
    args: Vec<String>,
    temp_dir: PathBuf,
    timeout: Duration,
}

impl SubprocessDetector {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            temp_dir: std::env::temp_dir(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, image_path: &Path) -> Result<String, DetectionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(image_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DetectionError::Spawn)?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            DetectionError::Io(std::io::Error::other("stdout was not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DetectionError::Io(std::io::Error::other("stderr was not captured"))
        })?;

        let mut out = Vec::new();
        let mut err = Vec::new();
        let (out_read, err_read) =
            tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
        out_read.map_err(DetectionError::Io)?;
        err_read.map_err(DetectionError::Io)?;

        let status = child.wait().await.map_err(DetectionError::Io)?;

        if !err.is_empty() {
            let message = String::from_utf8_lossy(&err).trim().to_string();
            log::debug!("Detection process wrote to stderr: {}", message);
            return Err(DetectionError::Stderr(message));
        }

        if !status.success() {
            return Err(DetectionError::Exit(status.code()));
        }

        let label = String::from_utf8_lossy(&out).trim().to_string();
        if label.is_empty() {
            Ok(FALLBACK_LABEL.to_string())
        } else {
            Ok(label)
        }
    }
}

#[async_trait]
impl ObjectDetector for SubprocessDetector {
    async fn detect(&self, image: &[u8]) -> Result<String, DetectionError> {
        let staged = StagedImage::write(&self.temp_dir, image).await?;
        log::debug!("Staged {} bytes at {}", image.len(), staged.path().display());

        // `staged` outlives the child on every path, including the timeout
        // where the child is killed on drop first.
        match tokio::time::timeout(self.timeout, self.run(staged.path())).await {
            Ok(result) => result,
            Err(_) => Err(DetectionError::Timeout(self.timeout)),
        }
    }
}
