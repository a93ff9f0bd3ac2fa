//! Frame acquisition.
//!
//! # Why a frame-source trait?
//!
//! In production a capture card films the device screen.  Opening the card
//! and pulling frames is an OS concern (V4L2, AVFoundation, ...) that lives
//! outside this crate; the sequencer only needs "give me the next frame".
//! [`FrameSource`] is that seam.
//!
//! [`ImageFileSource`] is the shipped implementation: it replays still images
//! from disk, which is enough to drive real transports from recorded screens
//! and to run the whole pipeline in tests.
//!
//! # Ownership
//!
//! The capture resource belongs to exactly one [`CaptureSession`].  The
//! session is released when it is dropped, on every exit path of the
//! sequencer, and logs how many frames it delivered.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use touchpilot_core::{Frame, FrameError};
use tracing::{debug, info};

/// Errors that can occur while acquiring a frame.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The configured directory holds no decodable image files.
    #[error("no image frames found in {0}")]
    NoFrames(PathBuf),

    /// The image file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid image.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image could not be turned into a frame.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// A producer of frames, one per call.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource: Send {
    /// Returns the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if no frame could be acquired.  The error is
    /// transient from the sequencer's point of view.
    fn grab(&mut self) -> Result<Frame, CaptureError>;

    /// Human-readable name of the source, for logs.
    fn describe(&self) -> String;
}

// ── Image file source ─────────────────────────────────────────────────────────

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays still images from a single file or a directory.
///
/// Directory entries are sorted by file name and replayed in a loop.
#[derive(Debug)]
pub struct ImageFileSource {
    root: PathBuf,
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageFileSource {
    /// Opens `path`, which may be one image file or a directory of images.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Io`] if the path cannot be read and
    /// [`CaptureError::NoFrames`] if a directory holds no image files.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let root = path.as_ref().to_path_buf();
        let io_error = |source| CaptureError::Io {
            path: root.clone(),
            source,
        };

        let metadata = std::fs::metadata(&root).map_err(io_error)?;
        let paths = if metadata.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(&root)
                .map_err(io_error)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![root.clone()]
        };

        if paths.is_empty() {
            return Err(CaptureError::NoFrames(root));
        }
        debug!(frames = paths.len(), "image source opened: {}", root.display());
        Ok(Self {
            root,
            paths,
            next: 0,
        })
    }

    /// Number of distinct images in the replay loop.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageFileSource {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let path = &self.paths[self.next % self.paths.len()];
        self.next = (self.next + 1) % self.paths.len();

        let image = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(source) => CaptureError::Io {
                path: path.clone(),
                source,
            },
            source => CaptureError::Decode {
                path: path.clone(),
                source,
            },
        })?;
        Ok(Frame::from_image(image)?)
    }

    fn describe(&self) -> String {
        format!("images at {}", self.root.display())
    }
}

// ── Capture session ───────────────────────────────────────────────────────────

/// Exclusive owner of a frame source for the lifetime of one agent session.
pub struct CaptureSession {
    source: Box<dyn FrameSource>,
    frames: u64,
}

impl CaptureSession {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        info!("capture session opened: {}", source.describe());
        Self { source, frames: 0 }
    }

    /// Grabs one frame from the underlying source.
    pub fn grab(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.source.grab()?;
        self.frames += 1;
        Ok(frame)
    }

    /// Frames delivered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("source", &self.source.describe())
            .field("frames", &self.frames)
            .finish()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        info!(
            frames = self.frames,
            "capture session released: {}",
            self.source.describe()
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
