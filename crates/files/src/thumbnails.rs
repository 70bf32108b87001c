//! Thumbnail rendering and storage
//!
//! [`ThumbnailManager`] renders a small preview of a stored document and places it
//! with the same sharding and exclusive-create rules as [`FileManager`]. Thumbnails
//! are always named after the document id; their extension is that of the rendered
//! image, not of the source.
//!
//! | source              | thumbnail                                   |
//! |---------------------|---------------------------------------------|
//! | JPEG                | JPEG                                        |
//! | GIF                 | animated GIF of every n-th frame            |
//! | other raster images | PNG                                         |
//! | PDF                 | PNG of the first page (via `pdftoppm`)      |
//!
//! Sources that cannot be decoded fail with [`FilesError::RenderFailure`]; nothing
//! is written in that case.
//!
//! Stored thumbnails are immutable like any other file. Rendering again for the same
//! id stores a revision named `<id>-<random suffix>`; the caller removes the
//! thumbnail it replaces with [`ThumbnailManager::remove`] once the new one is in use.

use crate::constants::{
    ANIMATION_FRAME_STRIDE, PDF_RENDERER, REVISION_CLAIM_ATTEMPTS, REVISION_SUFFIX_LEN,
    THUMBNAIL_MAX_DIMENSION,
};
use crate::files::FileManager;
use crate::sniff::FileFormat;
use crate::FilesError;
use docstore_types::DocumentId;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, DynamicImage, Frame, GenericImageView, ImageFormat};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A rendered thumbnail, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedThumbnail {
    /// Encoded format of `data`
    pub format: FileFormat,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

/// A [`FileManager`] that can also render and store thumbnails.
#[derive(Debug, Clone)]
pub struct ThumbnailManager {
    files: FileManager,
}

impl ThumbnailManager {
    /// Creates a thumbnail manager rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if `root` exists but is not a
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FilesError> {
        Ok(Self {
            files: FileManager::new(root)?,
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// Returns the underlying file manager.
    pub fn files(&self) -> &FileManager {
        &self.files
    }

    /// Stores `buffer` exactly as [`FileManager::write`] would.
    pub fn write(
        &self,
        id: &DocumentId,
        buffer: &[u8],
        original_filename: Option<&str>,
    ) -> Result<PathBuf, FilesError> {
        self.files.write(id, buffer, original_filename)
    }

    /// Renders a thumbnail of `source_path` and stores it as `<shard>/<id>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the source cannot be read (I/O)
    /// - the source cannot be rendered ([`FilesError::RenderFailure`])
    /// - no free revision name could be claimed
    pub fn create_thumbnail(
        &self,
        id: &DocumentId,
        source_path: &Path,
    ) -> Result<PathBuf, FilesError> {
        let source = fs::read(source_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read source file {}: {}", source_path.display(), e),
            ))
        })?;

        let rendered = render_thumbnail(&source)?;
        let path = self.store_revision(id, &rendered)?;

        tracing::info!(
            id = %id,
            source = %source_path.display(),
            thumbnail = %path.display(),
            "created thumbnail"
        );
        Ok(path)
    }

    /// Removes a thumbnail previously returned by [`Self::create_thumbnail`].
    ///
    /// A thumbnail that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the path escapes the root or removal fails (I/O).
    pub fn remove(&self, relative_path: &Path) -> Result<(), FilesError> {
        let path = self.files.absolute_path(relative_path)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(thumbnail = %path.display(), "removed thumbnail");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to remove thumbnail {}: {}", path.display(), e),
            ))),
        }
    }

    /// Stores under `<id>` if free, otherwise under `<id>-<random suffix>`.
    fn store_revision(
        &self,
        id: &DocumentId,
        rendered: &RenderedThumbnail,
    ) -> Result<PathBuf, FilesError> {
        let extension = Some(rendered.format.extension());
        if let Some(path) = self.files.try_store(id.as_str(), extension, &rendered.data)? {
            return Ok(path);
        }

        for _ in 0..REVISION_CLAIM_ATTEMPTS {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let name = format!("{id}-{}", &suffix[..REVISION_SUFFIX_LEN]);
            if let Some(path) = self.files.try_store(&name, extension, &rendered.data)? {
                return Ok(path);
            }
        }

        Err(FilesError::FileAlreadyExists(format!(
            "{id}: no free thumbnail revision after {REVISION_CLAIM_ATTEMPTS} attempts"
        )))
    }
}

/// Renders a thumbnail of `source` that fits in the configured bounding box.
///
/// # Errors
///
/// Returns [`FilesError::RenderFailure`] if the source format is unsupported or the
/// bytes cannot be decoded.
pub fn render_thumbnail(source: &[u8]) -> Result<RenderedThumbnail, FilesError> {
    match FileFormat::sniff(source) {
        Some(FileFormat::Gif) => render_animation(source),
        Some(FileFormat::Pdf) => render_pdf_page(source),
        Some(format) => render_still(source, format),
        None => Err(FilesError::RenderFailure(
            "source is not a recognised image or PDF".into(),
        )),
    }
}

fn render_still(source: &[u8], format: FileFormat) -> Result<RenderedThumbnail, FilesError> {
    let image = image::load_from_memory(source)
        .map_err(|e| FilesError::RenderFailure(format!("Failed to decode image: {e}")))?;
    let thumbnail = fit_within(image, THUMBNAIL_MAX_DIMENSION);

    let (output, encoded) = match format {
        // JPEG cannot carry an alpha channel.
        FileFormat::Jpeg => (
            FileFormat::Jpeg,
            DynamicImage::ImageRgb8(thumbnail.to_rgb8()),
        ),
        _ => (FileFormat::Png, thumbnail),
    };

    let image_format = match output {
        FileFormat::Jpeg => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };

    let mut data = Vec::new();
    encoded
        .write_to(&mut Cursor::new(&mut data), image_format)
        .map_err(|e| FilesError::RenderFailure(format!("Failed to encode thumbnail: {e}")))?;

    Ok(RenderedThumbnail {
        format: output,
        data,
    })
}

/// Keeps every `ANIMATION_FRAME_STRIDE`-th frame, scaled down, with delays stretched
/// so the animation plays at the original speed.
fn render_animation(source: &[u8]) -> Result<RenderedThumbnail, FilesError> {
    let decoder = GifDecoder::new(Cursor::new(source))
        .map_err(|e| FilesError::RenderFailure(format!("Failed to decode GIF: {e}")))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| FilesError::RenderFailure(format!("Failed to decode GIF frames: {e}")))?;

    if frames.is_empty() {
        return Err(FilesError::RenderFailure("GIF has no frames".into()));
    }

    let stride = u32::try_from(ANIMATION_FRAME_STRIDE).unwrap_or(1);
    let sampled: Vec<Frame> = frames
        .into_iter()
        .step_by(ANIMATION_FRAME_STRIDE)
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Delay::from_numer_denom_ms(numer.saturating_mul(stride), denom);
            let buffer = fit_within(
                DynamicImage::ImageRgba8(frame.into_buffer()),
                THUMBNAIL_MAX_DIMENSION,
            )
            .into_rgba8();
            Frame::from_parts(buffer, 0, 0, delay)
        })
        .collect();

    let mut data = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut data);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| FilesError::RenderFailure(format!("Failed to encode GIF: {e}")))?;
        encoder
            .encode_frames(sampled)
            .map_err(|e| FilesError::RenderFailure(format!("Failed to encode GIF: {e}")))?;
    }

    Ok(RenderedThumbnail {
        format: FileFormat::Gif,
        data,
    })
}

/// Rasterises the first page of a PDF with the external renderer.
fn render_pdf_page(source: &[u8]) -> Result<RenderedThumbnail, FilesError> {
    let workdir = tempfile::tempdir()?;
    let input = workdir.path().join("source.pdf");
    let prefix = workdir.path().join("page");
    fs::write(&input, source)?;

    let output = Command::new(PDF_RENDERER)
        .args(["-png", "-singlefile", "-f", "1", "-l", "1", "-scale-to"])
        .arg(THUMBNAIL_MAX_DIMENSION.to_string())
        .arg(&input)
        .arg(&prefix)
        .output()
        .map_err(|e| FilesError::RenderFailure(format!("Failed to run {PDF_RENDERER}: {e}")))?;

    if !output.status.success() {
        return Err(FilesError::RenderFailure(format!(
            "{PDF_RENDERER} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let data = fs::read(prefix.with_extension("png")).map_err(|e| {
        FilesError::RenderFailure(format!("{PDF_RENDERER} produced no image: {e}"))
    })?;

    Ok(RenderedThumbnail {
        format: FileFormat::Png,
        data,
    })
}

/// Scales `image` down to fit in a `max`×`max` box. Smaller images are left alone.
fn fit_within(image: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max && height <= max {
        image
    } else {
        image.thumbnail(max, max)
    }
}
