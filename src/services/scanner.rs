// src/services/scanner.rs
//
// The checkpoint has one capture device. `Scanner` hands it out to a single
// scan at a time and takes it back on every exit path: explicit stop,
// timeout, error, or the caller's future being dropped.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::net::unix::pipe;

use crate::common::error::AppError;

/// Capability over whatever produces decoded QR text (camera pipeline,
/// handheld scanner, test fake).
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquires the hardware and starts producing frames.
    async fn start(&self) -> Result<Box<dyn FrameStream>, AppError>;
}

/// Frames of one scanning session.
#[async_trait]
pub trait FrameStream: Send {
    /// Next decoded text frame, `None` once the session has nothing more to give.
    async fn next_frame(&mut self) -> Option<String>;

    /// Releases the hardware. Called exactly once per session.
    fn stop(&mut self);
}

#[derive(Clone)]
pub struct Scanner {
    device: Arc<dyn CaptureDevice>,
    active: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Starts a session, failing fast with `ScannerBusy` if one is running.
    pub async fn start(&self) -> Result<ScanSession, AppError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Scan requested while the scanner is already running");
            return Err(AppError::ScannerBusy);
        }
        // From here on the claim is released by Drop, including when start() fails
        let claim = Claim(self.active.clone());

        let stream = self.device.start().await.inspect_err(|e| {
            tracing::warn!("Capture device failed to start: {}", e);
        })?;

        tracing::debug!("Scanner started");
        Ok(ScanSession {
            stream: Some(stream),
            _claim: claim,
        })
    }
}

struct Claim(Arc<AtomicBool>);

impl Drop for Claim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScanSession {
    stream: Option<Box<dyn FrameStream>>,
    // Dropped after `Drop::drop` stopped the stream
    _claim: Claim,
}

impl ScanSession {
    pub async fn next_frame(&mut self) -> Option<String> {
        self.stream.as_mut()?.next_frame().await
    }

    /// Next frame with actual content; blank reads are camera noise.
    pub async fn next_payload(&mut self) -> Option<String> {
        loop {
            let frame = self.next_frame().await?;
            if !frame.trim().is_empty() {
                return Some(frame);
            }
        }
    }

    pub fn stop(self) {}
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Scanner stopped");
        }
    }
}

// ---
// Devices
// ---

/// Handheld scanners in serial/keyboard mode emit one decoded code per line.
///
/// The device (tty or FIFO) is opened non-blocking and driven by the runtime's
/// reactor, so dropping the session closes the descriptor with no read left
/// pending.
pub struct LineDevice {
    path: PathBuf,
}

impl LineDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureDevice for LineDevice {
    async fn start(&self) -> Result<Box<dyn FrameStream>, AppError> {
        let mut options = pipe::OpenOptions::new();
        // Character devices are accepted as well as FIFOs
        options.unchecked(true);
        // Keeps a FIFO from reading EOF while the scanner side is not connected
        #[cfg(any(target_os = "linux", target_os = "android"))]
        options.read_write(true);

        let receiver = options.open_receiver(&self.path).map_err(|e| {
            AppError::DeviceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Box::new(LineFrames::new(BufReader::new(receiver))))
    }
}

pub struct LineFrames<R> {
    lines: Option<Lines<R>>,
}

impl<R> LineFrames<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Some(reader.lines()),
        }
    }
}

#[async_trait]
impl<R> FrameStream for LineFrames<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_frame(&mut self) -> Option<String> {
        match self.lines.as_mut()?.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Scanner read failed: {}", e);
                None
            }
        }
    }

    fn stop(&mut self) {
        // Closes the device handle
        self.lines = None;
    }
}

/// Stand-in when the checkpoint has no scanner configured.
pub struct NoDevice;

#[async_trait]
impl CaptureDevice for NoDevice {
    async fn start(&self) -> Result<Box<dyn FrameStream>, AppError> {
        Err(AppError::DeviceUnavailable(
            "no capture device configured (set SCANNER_DEVICE)".to_string(),
        ))
    }
}
