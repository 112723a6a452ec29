//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image::ImageReader` with content sniffing |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` (box is filled, aspect not kept) |
//! | Encode | chosen from the output extension: JPEG (quality), PNG, GIF |
//!
//! Output is written to a hidden temporary sibling and renamed into place, so
//! a failed encode never leaves a truncated file that would later pass as a
//! cached thumbnail.

use super::backend::{BackendError, ImageBackend};
use super::params::ThumbnailParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extensions the gallery recognises as images, with the decoder each needs.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackendError + '_ {
    move |source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Load and decode an image from disk. The format is sniffed from the content,
/// falling back to the extension.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(io_error(path))?
        .decode()
        .map_err(|source| BackendError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Encode `img` in the format named by `path`'s extension and move it into place.
fn save_image(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path)
        .ok()
        .filter(|f| matches!(f, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif))
        .ok_or_else(|| BackendError::UnsupportedFormat(path.to_path_buf()))?;

    let partial = partial_path(path);
    let result = write_encoded(img, &partial, format, quality);
    match result {
        Ok(()) => std::fs::rename(&partial, path).map_err(io_error(path)),
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn write_encoded(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<(), BackendError> {
    let encode_error = |source| BackendError::Encode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            rgb.write_with_encoder(encoder).map_err(encode_error)?;
        }
        ImageFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut writer, ImageFormat::Gif)
                .map_err(encode_error)?;
        }
        other => {
            img.write_to(&mut writer, other).map_err(encode_error)?;
        }
    }
    writer.flush().map_err(io_error(path))
}

impl ImageBackend for RustBackend {
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let scaled = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_image(&scaled, &params.output, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use image::RgbImage;

    fn create_test_image(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    fn params(source: PathBuf, output: PathBuf) -> ThumbnailParams {
        ThumbnailParams {
            source,
            output,
            width: 150,
            height: 150,
            quality: Quality::new(80),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "gif"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn thumbnail_jpeg_has_exact_box_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("wide.jpg");
        create_test_image(&source, 400, 100);
        let output = tmp.path().join("thumb.jpg");

        RustBackend::new()
            .thumbnail(&params(source, output.clone()))
            .unwrap();

        // Direct scale: non-square sources are distorted into the box
        assert_eq!(image::image_dimensions(&output).unwrap(), (150, 150));
        assert_eq!(
            ImageFormat::from_path(&output).unwrap(),
            image::guess_format(&std::fs::read(&output).unwrap()).unwrap()
        );
    }

    #[test]
    fn thumbnail_keeps_png_encoding_for_png_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("a.png");
        create_test_image(&source, 64, 64);
        let output = tmp.path().join("out.png");

        RustBackend::new()
            .thumbnail(&params(source, output.clone()))
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn thumbnail_gif_roundtrips() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("a.gif");
        create_test_image(&source, 40, 30);
        let output = tmp.path().join("out.gif");

        RustBackend::new()
            .thumbnail(&params(source, output.clone()))
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Gif);
        assert_eq!(image::image_dimensions(&output).unwrap(), (150, 150));
    }

    #[test]
    fn thumbnail_decodes_by_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let real_png = tmp.path().join("real.png");
        create_test_image(&real_png, 32, 32);
        let misnamed = tmp.path().join("misnamed.jpg");
        std::fs::rename(&real_png, &misnamed).unwrap();
        let output = tmp.path().join("misnamed-thumb.jpg");

        RustBackend::new()
            .thumbnail(&params(misnamed, output.clone()))
            .unwrap();
        assert!(output.exists());
    }

    #[test]
    fn thumbnail_of_garbage_is_decode_error_and_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();
        let output = tmp.path().join("thumb.jpg");

        let result = RustBackend::new().thumbnail(&params(source, output.clone()));
        assert!(matches!(result, Err(BackendError::Decode { .. })));
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn thumbnail_missing_source_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = RustBackend::new().thumbnail(&params(
            tmp.path().join("nope.jpg"),
            tmp.path().join("thumb.jpg"),
        ));
        assert!(matches!(result, Err(BackendError::Io { .. })));
    }

    #[test]
    fn thumbnail_unsupported_output_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("a.jpg");
        create_test_image(&source, 20, 20);

        let result = RustBackend::new().thumbnail(&params(source, tmp.path().join("a.bmp")));
        assert!(matches!(result, Err(BackendError::UnsupportedFormat(_))));
    }
}
