//! Frame sources
//!
//! A source produces frames of known size on demand. `Ok(None)` marks the
//! end of the stream. An individual frame that cannot be decoded is reported
//! as [`VisionError::InvalidFrame`] and the source stays usable, so callers
//! can skip the cycle and ask again.

use crate::frame::Frame;
use crate::{Result, VisionError};
use anyhow::Context;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// A frame with the identifier it was acquired under
#[derive(Debug)]
pub struct CapturedFrame {
    /// File name for image directories, sequence tag for cameras
    pub id: String,
    pub frame: Frame,
}

/// Produces frames on demand
pub trait FrameSource {
    /// Source identifier for logs
    fn name(&self) -> String;

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>>;

    /// Frames handed out so far
    fn frames_captured(&self) -> u64;
}

/// Image files of a directory in file-name order.
#[derive(Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    captured: u64,
}

impl ImageDirSource {
    /// List `.jpg/.jpeg/.png/.bmp` files (case-insensitive) of `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read image directory: {:?}", dir))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        log::info!("found {} images in {:?}", files.len(), dir);
        Ok(Self {
            dir,
            files,
            cursor: 0,
            captured: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Identifier of an image file: its file name
pub fn frame_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> String {
        format!("images:{}", self.dir.display())
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        let Some(path) = self.files.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;

        let frame = Frame::load(&path)?;
        self.captured += 1;
        Ok(Some(CapturedFrame {
            id: frame_id_for(&path),
            frame,
        }))
    }

    fn frames_captured(&self) -> u64 {
        self.captured
    }
}

/// Live camera through OpenCV `VideoCapture`
pub struct CameraSource {
    index: i32,
    capture: VideoCapture,
    captured: u64,
}

impl CameraSource {
    /// Open camera `index` and request a capture size. The device may
    /// deliver a different size; frames report their actual dimensions.
    pub fn open(index: i32, width: u32, height: u32) -> Result<Self> {
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open camera {}", index))?;
        if !capture.is_opened()? {
            anyhow::bail!("Camera {} could not be opened", index);
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width))?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height))?;
        log::info!(
            "camera {} opened, requested {}x{}, got {}x{}",
            index,
            width,
            height,
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?
        );

        Ok(Self {
            index,
            capture,
            captured: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> String {
        format!("camera:{}", self.index)
    }

    /// Fails with [`VisionError::EndOfStream`] once the device is gone and
    /// with [`VisionError::InvalidFrame`] for a failed grab.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        if !self.capture.is_opened()? {
            return Err(VisionError::EndOfStream.into());
        }

        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Err(VisionError::InvalidFrame(format!("camera {} returned no image", self.index)).into());
        }

        self.captured += 1;
        Ok(Some(CapturedFrame {
            id: format!("camera{}-{:06}", self.index, self.captured),
            frame: Frame::from_mat(mat)?,
        }))
    }

    fn frames_captured(&self) -> u64 {
        self.captured
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("failed to release camera {}: {}", self.index, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ImageUtils;

    fn write_png(path: &Path) -> Result<()> {
        let mat = ImageUtils::bgr_bytes_to_mat(4, 3, &[90u8; 36])?;
        ImageUtils::save_image(&mat, path)
    }

    #[test]
    fn test_lists_images_sorted_and_filtered() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(&dir.path().join("b.png"))?;
        write_png(&dir.path().join("a.PNG"))?;
        std::fs::write(dir.path().join("a.json"), "{}")?;
        std::fs::write(dir.path().join("notes.txt"), "x")?;

        let mut source = ImageDirSource::open(dir.path())?;
        assert_eq!(source.len(), 2);

        let first = source.next_frame()?.expect("first frame");
        assert_eq!(first.id, "a.PNG");
        assert_eq!((first.frame.width(), first.frame.height()), (4, 3));

        let second = source.next_frame()?.expect("second frame");
        assert_eq!(second.id, "b.png");
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn test_undecodable_file_is_skippable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.jpg"), b"garbage")?;
        write_png(&dir.path().join("b.png"))?;

        let mut source = ImageDirSource::open(dir.path())?;
        let err = source.next_frame().unwrap_err();
        assert!(VisionError::is_invalid_frame(&err));

        let next = source.next_frame()?.expect("source continues after a bad file");
        assert_eq!(next.id, "b.png");
        Ok(())
    }

    #[test]
    fn test_missing_directory_fails() {
        assert!(ImageDirSource::open("/nonexistent/ballbot/images").is_err());
    }
}
