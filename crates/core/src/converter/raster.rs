//! Local raster image operations.

use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::debug;

use super::error::ConverterError;
use super::traits::Converter;
use crate::artifact::Artifact;
use crate::fileset::RawFile;

/// Quality used when re-encoding resized images.
const RESIZE_QUALITY: f32 = 0.92;

/// Quality steps tried when shrinking an image under an upload limit.
const SHRINK_QUALITIES: [f32; 5] = [0.85, 0.75, 0.65, 0.5, 0.4];

/// Dimension scale applied after every quality step fails.
const SHRINK_SCALE: f32 = 0.75;

const MAX_SHRINK_ROUNDS: usize = 6;

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// Parses a target value such as `jpeg`, `jpg`, or `png`.
    pub fn from_target(target: &str) -> Option<Self> {
        match target.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        mime.strip_prefix("image/").and_then(Self::from_target)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
        }
    }
}

/// What an [`ImageConverter`] does with each file.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOperation {
    /// Re-encode into the target format.
    Convert { quality: f32 },
    /// Re-encode lossy at `quality`, keeping WebP as WebP and everything else as JPEG.
    Compress { quality: f32 },
    /// Scale to the given bounds, keeping the source format.
    Resize {
        width: u32,
        height: u32,
        keep_aspect: bool,
    },
}

/// In-process image converter.
pub struct ImageConverter {
    operation: ImageOperation,
}

impl ImageConverter {
    pub fn new(operation: ImageOperation) -> Self {
        Self { operation }
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn name(&self) -> &str {
        match self.operation {
            ImageOperation::Convert { .. } => "image-convert",
            ImageOperation::Compress { .. } => "image-compress",
            ImageOperation::Resize { .. } => "image-resize",
        }
    }

    fn is_local(&self, _target: &str) -> bool {
        true
    }

    async fn convert(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError> {
        let file = file.clone();
        let target = target.to_string();
        let operation = self.operation.clone();

        let artifact = tokio::task::spawn_blocking(move || match operation {
            ImageOperation::Convert { quality } => {
                let format = OutputFormat::from_target(&target)
                    .ok_or(ConverterError::UnsupportedTarget { target })?;
                convert_image(&file, format, quality)
            }
            ImageOperation::Compress { quality } => compress_image(&file, quality),
            ImageOperation::Resize {
                width,
                height,
                keep_aspect,
            } => resize_image(&file, width, height, keep_aspect),
        })
        .await??;

        Ok(vec![artifact])
    }
}

/// Converts an image to `format`. Formats without alpha are flattened onto white.
pub fn convert_image(
    file: &RawFile,
    format: OutputFormat,
    quality: f32,
) -> Result<Artifact, ConverterError> {
    let image = decode(file)?;
    let data = encode(&image, format, quality)?;
    let name = format!("{}.{}", file.stem(), format.extension());
    debug!("Converted {} -> {} ({} bytes)", file.name, name, data.len());
    Ok(Artifact::local(name, format.mime_type(), data))
}

/// Lossy re-encode at `quality`.
pub fn compress_image(file: &RawFile, quality: f32) -> Result<Artifact, ConverterError> {
    let format = match OutputFormat::from_mime(&file.mime_type) {
        Some(OutputFormat::Webp) => OutputFormat::Webp,
        _ => OutputFormat::Jpeg,
    };
    let image = decode(file)?;
    let data = encode(&image, format, quality)?;
    let name = format!("{}_compressed.{}", file.stem(), format.extension());
    debug!(
        "Compressed {} from {} to {} bytes",
        file.name,
        file.size(),
        data.len()
    );
    Ok(Artifact::local(name, format.mime_type(), data))
}

/// Scales an image. With `keep_aspect` the result fits within `width`x`height`.
pub fn resize_image(
    file: &RawFile,
    width: u32,
    height: u32,
    keep_aspect: bool,
) -> Result<Artifact, ConverterError> {
    if width == 0 || height == 0 {
        return Err(ConverterError::encode("target dimensions must be non-zero"));
    }

    let image = decode(file)?;
    let (target_width, target_height) = if keep_aspect {
        fit_within(image.width(), image.height(), width, height)
    } else {
        (width, height)
    };

    let resized = image.resize_exact(target_width, target_height, FilterType::Lanczos3);
    let format = OutputFormat::from_mime(&file.mime_type)
        .or_else(|| file.extension().as_deref().and_then(OutputFormat::from_target))
        .unwrap_or(OutputFormat::Jpeg);
    let data = encode(&resized, format, RESIZE_QUALITY)?;

    let extension = file
        .extension()
        .unwrap_or_else(|| format.extension().to_string());
    let name = format!(
        "{}_{}x{}.{}",
        file.stem(),
        target_width,
        target_height,
        extension
    );
    Ok(Artifact::local(name, format.mime_type(), data))
}

/// Re-encodes an image as JPEG until it fits in `max_bytes`, lowering
/// quality first and then dimensions. Small files are returned unchanged;
/// if nothing fits, the smallest attempt is returned.
pub fn shrink_to_limit(file: &RawFile, max_bytes: u64) -> Result<RawFile, ConverterError> {
    if file.size() <= max_bytes {
        return Ok(file.clone());
    }

    let mut image = decode(file)?;
    let mut smallest: Option<Vec<u8>> = None;

    for _ in 0..MAX_SHRINK_ROUNDS {
        for quality in SHRINK_QUALITIES {
            let data = encode(&image, OutputFormat::Jpeg, quality)?;
            if data.len() as u64 <= max_bytes {
                debug!(
                    "Shrunk {} from {} to {} bytes",
                    file.name,
                    file.size(),
                    data.len()
                );
                return Ok(RawFile::new(file.name.clone(), "image/jpeg", data));
            }
            if smallest.as_ref().map_or(true, |s| data.len() < s.len()) {
                smallest = Some(data);
            }
        }

        let width = ((image.width() as f32) * SHRINK_SCALE).round().max(1.0) as u32;
        let height = ((image.height() as f32) * SHRINK_SCALE).round().max(1.0) as u32;
        image = image.resize_exact(width, height, FilterType::Triangle);
    }

    let data = smallest.unwrap_or_else(|| file.data.to_vec());
    Ok(RawFile::new(file.name.clone(), "image/jpeg", data))
}

/// Largest size with the source aspect ratio that fits within the bounds.
pub fn fit_within(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (max_width, max_height);
    }
    let scale_x = max_width as f64 / src_width as f64;
    let scale_y = max_height as f64 / src_height as f64;
    let scale = scale_x.min(scale_y);
    (
        ((src_width as f64 * scale).round() as u32).max(1),
        ((src_height as f64 * scale).round() as u32).max(1),
    )
}

fn decode(file: &RawFile) -> Result<DynamicImage, ConverterError> {
    image::load_from_memory(&file.data).map_err(|e| ConverterError::decode(&file.name, e))
}

fn encode(image: &DynamicImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>, ConverterError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Png => image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
        OutputFormat::Jpeg => {
            let flat = DynamicImage::ImageRgb8(flatten_on_white(image));
            flat.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality_percent(quality)))
        }
        OutputFormat::Webp => {
            // The image crate only encodes lossless WebP
            let flat = flatten_on_white(image);
            let encoded = webp::Encoder::from_rgb(flat.as_raw(), flat.width(), flat.height())
                .encode(quality_percent(quality) as f32);
            buf.extend_from_slice(&encoded);
            Ok(())
        }
        OutputFormat::Bmp => DynamicImage::ImageRgb8(flatten_on_white(image))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp),
        OutputFormat::Gif => {
            let flat = DynamicImage::ImageRgb8(flatten_on_white(image));
            DynamicImage::ImageRgba8(flat.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
        }
    };
    result.map_err(ConverterError::encode)?;
    Ok(buf)
}

/// Composites the image over an opaque white background.
fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.01, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn png(name: &str, width: u32, height: u32) -> RawFile {
        RawFile::new(name, "image/png", fixtures::png_image(width, height))
    }

    fn decode_artifact(artifact: &Artifact) -> DynamicImage {
        image::load_from_memory(artifact.bytes_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(400, 200, 100, 100), (100, 50));
        assert_eq!(fit_within(200, 400, 100, 100), (50, 100));
        assert_eq!(fit_within(100, 100, 300, 200), (200, 200));
    }

    #[test]
    fn test_convert_png_to_jpeg() {
        let artifact = convert_image(&png("photo.png", 8, 6), OutputFormat::Jpeg, 0.9).unwrap();
        assert_eq!(artifact.suggested_filename(), "photo.jpg");
        assert_eq!(
            image::guess_format(artifact.bytes_in_memory().unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = decode_artifact(&artifact);
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_convert_to_each_format() {
        let file = png("a.png", 4, 4);
        for (target, expected) in [
            ("png", ImageFormat::Png),
            ("webp", ImageFormat::WebP),
            ("bmp", ImageFormat::Bmp),
            ("gif", ImageFormat::Gif),
        ] {
            let format = OutputFormat::from_target(target).unwrap();
            let artifact = convert_image(&file, format, 0.9).unwrap();
            assert_eq!(
                image::guess_format(artifact.bytes_in_memory().unwrap()).unwrap(),
                expected,
                "target {}",
                target
            );
        }
    }

    #[test]
    fn test_flatten_transparent_pixel_is_white() {
        let transparent = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 0, 0, 0]),
        ));
        let flat = flatten_on_white(&transparent);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_compress_names_and_format() {
        let artifact = compress_image(&png("shot.png", 16, 16), 0.5).unwrap();
        assert_eq!(artifact.suggested_filename(), "shot_compressed.jpg");
    }

    fn noisy_webp(name: &str) -> RawFile {
        let noisy = image::load_from_memory(&fixtures::noisy_png(128, 128)).unwrap();
        let mut data = Vec::new();
        noisy
            .write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(&mut data))
            .unwrap();
        RawFile::new(name, "image/webp", data)
    }

    #[test]
    fn test_compress_webp_stays_webp_and_shrinks() {
        let file = noisy_webp("noisy.webp");

        let high = compress_image(&file, 0.9).unwrap();
        let low = compress_image(&file, 0.1).unwrap();
        let high_size = high.bytes_in_memory().unwrap().len();
        let low_size = low.bytes_in_memory().unwrap().len();

        assert_eq!(low.suggested_filename(), "noisy_compressed.webp");
        assert_eq!(
            image::guess_format(low.bytes_in_memory().unwrap()).unwrap(),
            ImageFormat::WebP
        );
        assert!(low_size < file.data.len());
        assert!(low_size < high_size);
        assert_eq!(decode_artifact(&low).width(), 128);
    }

    #[test]
    fn test_resize_keeps_aspect_and_format() {
        let artifact = resize_image(&png("wide.png", 40, 20), 10, 10, true).unwrap();
        assert_eq!(artifact.suggested_filename(), "wide_10x5.png");
        let decoded = decode_artifact(&artifact);
        assert_eq!((decoded.width(), decoded.height()), (10, 5));
    }

    #[test]
    fn test_resize_exact() {
        let artifact = resize_image(&png("wide.png", 40, 20), 7, 9, false).unwrap();
        let decoded = decode_artifact(&artifact);
        assert_eq!((decoded.width(), decoded.height()), (7, 9));
    }

    #[test]
    fn test_decode_failure_names_file() {
        let broken = RawFile::new("broken.png", "image/png", b"nope".to_vec());
        let err = convert_image(&broken, OutputFormat::Png, 0.9).unwrap_err();
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_shrink_small_file_untouched() {
        let file = png("tiny.png", 2, 2);
        let shrunk = shrink_to_limit(&file, 1024 * 1024).unwrap();
        assert_eq!(shrunk.data, file.data);
        assert_eq!(shrunk.mime_type, "image/png");
    }

    #[test]
    fn test_shrink_large_file_under_limit() {
        let file = RawFile::new("noisy.png", "image/png", fixtures::noisy_png(256, 256));
        let limit = file.size() / 4;
        let shrunk = shrink_to_limit(&file, limit).unwrap();
        assert!(shrunk.size() <= limit);
        assert_eq!(shrunk.mime_type, "image/jpeg");
        assert_eq!(shrunk.name, "noisy.png");
    }

    #[tokio::test]
    async fn test_converter_rejects_unknown_target() {
        let converter = ImageConverter::new(ImageOperation::Convert { quality: 0.9 });
        let err = converter.convert(&png("a.png", 2, 2), "svg").await.unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedTarget { .. }));
    }
}
