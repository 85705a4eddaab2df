//! Built-in routes: the smart-convert registry and one route per tool.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::registry::RouteRegistry;
use super::types::ConversionRoute;
use super::RouteError;
use crate::config::ImageConfig;
use crate::converter::{
    Converter, ImageConverter, ImageOperation, PdfConverter, PdfOperation, RemoteConverter,
    RemoteEndpoint, TargetDispatch,
};
use crate::gateway::RemoteGateway;

const ACCEPT_PDF: &str = ".pdf,application/pdf";
const ACCEPT_WORD: &str = ".doc,.docx,application/msword,application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const ACCEPT_PPT: &str = ".ppt,.pptx,application/vnd.ms-powerpoint,application/vnd.openxmlformats-officedocument.presentationml.presentation";
const ACCEPT_EXCEL: &str = ".xls,.xlsx,application/vnd.ms-excel,application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ACCEPT_IMAGE: &str = "image/*,.jpg,.jpeg,.png,.webp,.bmp,.gif";
const ACCEPT_VIDEO: &str = "video/*,.mp4,.avi,.mkv,.mov,.webm";
const ACCEPT_AUDIO: &str = "audio/*,.mp3,.wav,.aac,.flac,.ogg,.m4a";

/// Server-side PDF compression presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Screen,
    #[default]
    Ebook,
    Printer,
    Prepress,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Ebook => "ebook",
            Self::Printer => "printer",
            Self::Prepress => "prepress",
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "screen" => Ok(Self::Screen),
            "ebook" => Ok(Self::Ebook),
            "printer" => Ok(Self::Printer),
            "prepress" => Ok(Self::Prepress),
            other => Err(format!(
                "unknown compression level '{}' (expected screen, ebook, printer or prepress)",
                other
            )),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-purpose conversion tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    ImageConvert,
    ImageCompress,
    ImageResize,
    RemoveBackground,
    ImageToSvg,
    PdfSplit,
    PdfExtractPages,
    PdfCompress,
    PdfExtractImages,
    PdfExtractText,
    PdfToWord,
    WordToPdf,
    PptToPdf,
    ExcelToPdf,
    PptToImages,
    PptToWord,
    ExcelToWord,
    WordToTxt,
    PptExtractImages,
    VideoConvert,
    AudioExtract,
    AudioConvert,
}

impl Tool {
    pub const ALL: [Tool; 22] = [
        Tool::ImageConvert,
        Tool::ImageCompress,
        Tool::ImageResize,
        Tool::RemoveBackground,
        Tool::ImageToSvg,
        Tool::PdfSplit,
        Tool::PdfExtractPages,
        Tool::PdfCompress,
        Tool::PdfExtractImages,
        Tool::PdfExtractText,
        Tool::PdfToWord,
        Tool::WordToPdf,
        Tool::PptToPdf,
        Tool::ExcelToPdf,
        Tool::PptToImages,
        Tool::PptToWord,
        Tool::ExcelToWord,
        Tool::WordToTxt,
        Tool::PptExtractImages,
        Tool::VideoConvert,
        Tool::AudioExtract,
        Tool::AudioConvert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageConvert => "image-convert",
            Self::ImageCompress => "image-compress",
            Self::ImageResize => "image-resize",
            Self::RemoveBackground => "remove-background",
            Self::ImageToSvg => "image-to-svg",
            Self::PdfSplit => "pdf-split",
            Self::PdfExtractPages => "pdf-extract-pages",
            Self::PdfCompress => "pdf-compress",
            Self::PdfExtractImages => "pdf-extract-images",
            Self::PdfExtractText => "pdf-extract-text",
            Self::PdfToWord => "pdf-to-word",
            Self::WordToPdf => "word-to-pdf",
            Self::PptToPdf => "ppt-to-pdf",
            Self::ExcelToPdf => "excel-to-pdf",
            Self::PptToImages => "ppt-to-images",
            Self::PptToWord => "ppt-to-word",
            Self::ExcelToWord => "excel-to-word",
            Self::WordToTxt => "word-to-txt",
            Self::PptExtractImages => "ppt-extract-images",
            Self::VideoConvert => "video-convert",
            Self::AudioExtract => "audio-extract",
            Self::AudioConvert => "audio-convert",
        }
    }

    /// Human-readable title.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ImageConvert => "Image Converter",
            Self::ImageCompress => "Image Compressor",
            Self::ImageResize => "Image Resizer",
            Self::RemoveBackground => "Background Remover",
            Self::ImageToSvg => "Image to SVG",
            Self::PdfSplit => "Split PDF",
            Self::PdfExtractPages => "Extract PDF Pages",
            Self::PdfCompress => "Compress PDF",
            Self::PdfExtractImages => "Extract Images from PDF",
            Self::PdfExtractText => "Extract Text from PDF",
            Self::PdfToWord => "PDF to Word",
            Self::WordToPdf => "Word to PDF",
            Self::PptToPdf => "PowerPoint to PDF",
            Self::ExcelToPdf => "Excel to PDF",
            Self::PptToImages => "PPT to Images",
            Self::PptToWord => "PowerPoint to Word",
            Self::ExcelToWord => "Excel to Word",
            Self::WordToTxt => "Word to Text",
            Self::PptExtractImages => "Extract Images from PowerPoint",
            Self::VideoConvert => "Video Converter",
            Self::AudioExtract => "Extract Audio from Video",
            Self::AudioConvert => "Audio Converter",
        }
    }
}

impl FromStr for Tool {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "bg-remove" {
            return Ok(Self::RemoveBackground);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| RouteError::UnknownTool(s.to_string()))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tool parameters. Fields a tool does not use are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOptions {
    /// Encoder quality in (0, 1].
    pub quality: f32,
    pub width: u32,
    pub height: u32,
    pub keep_aspect: bool,
    pub start_page: u32,
    pub end_page: u32,
    pub pages: Vec<u32>,
    pub level: CompressionLevel,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            quality: 0.85,
            width: 800,
            height: 600,
            keep_aspect: true,
            start_page: 1,
            end_page: 1,
            pages: Vec::new(),
            level: CompressionLevel::default(),
        }
    }
}

/// Builds the route for one tool.
pub fn tool_route(
    tool: Tool,
    options: &ToolOptions,
    gateway: Arc<dyn RemoteGateway>,
    image: &ImageConfig,
) -> ConversionRoute {
    let id = tool.as_str();
    let label = tool.label();
    let remote = |path: &str| -> Arc<dyn Converter> {
        Arc::new(RemoteConverter::new(id, gateway.clone(), RemoteEndpoint::new(path)))
    };
    let remote_with_format = |path: &str| -> Arc<dyn Converter> {
        Arc::new(RemoteConverter::new(
            id,
            gateway.clone(),
            RemoteEndpoint::new(path).with_target_field("format"),
        ))
    };

    match tool {
        Tool::ImageConvert => ConversionRoute::new(
            id,
            label,
            "image/*",
            Arc::new(ImageConverter::new(ImageOperation::Convert {
                quality: options.quality,
            })),
        )
        .target("jpeg", "JPG")
        .target("png", "PNG")
        .target("webp", "WebP")
        .target("bmp", "BMP"),

        Tool::ImageCompress => ConversionRoute::new(
            id,
            label,
            "image/jpeg,image/png,image/webp",
            Arc::new(ImageConverter::new(ImageOperation::Compress {
                quality: options.quality,
            })),
        )
        .target("compressed", "Compressed image"),

        Tool::ImageResize => ConversionRoute::new(
            id,
            label,
            "image/*",
            Arc::new(ImageConverter::new(ImageOperation::Resize {
                width: options.width,
                height: options.height,
                keep_aspect: options.keep_aspect,
            })),
        )
        .target("resized", "Resized image"),

        Tool::RemoveBackground => ConversionRoute::new(
            id,
            label,
            "image/*",
            Arc::new(
                RemoteConverter::new(
                    id,
                    gateway.clone(),
                    RemoteEndpoint::new("/api/remove-background"),
                )
                .with_upload_limit(image.upload_limit_bytes()),
            ),
        )
        .target("png", "Transparent PNG"),

        Tool::ImageToSvg => ConversionRoute::new(
            id,
            label,
            "image/*",
            remote("/api/convert/image-to-svg"),
        )
        .target("svg", "SVG (Vector)"),

        Tool::PdfSplit => ConversionRoute::new(
            id,
            label,
            "application/pdf",
            Arc::new(PdfConverter::new(PdfOperation::Split {
                start: options.start_page,
                end: options.end_page,
            })),
        )
        .target("pdf", "PDF"),

        Tool::PdfExtractPages => ConversionRoute::new(
            id,
            label,
            "application/pdf",
            Arc::new(PdfConverter::new(PdfOperation::ExtractPages {
                pages: options.pages.clone(),
            })),
        )
        .target("pdf", "PDF (one per page)"),

        Tool::PdfCompress => ConversionRoute::new(
            id,
            label,
            "application/pdf",
            Arc::new(
                RemoteConverter::new(id, gateway.clone(), RemoteEndpoint::new("/api/compress/pdf"))
                    .with_field("level", options.level.as_str()),
            ),
        )
        .target("pdf", "PDF"),

        Tool::PdfExtractImages => {
            ConversionRoute::new(id, label, ACCEPT_PDF, remote("/api/extract/pdf-images"))
                .target("images", "Images")
        }

        Tool::PdfExtractText => {
            ConversionRoute::new(id, label, ACCEPT_PDF, remote("/api/convert/pdf-to-txt"))
                .target("txt", "Text")
        }

        Tool::PdfToWord => {
            ConversionRoute::new(id, label, ACCEPT_PDF, remote("/api/convert/pdf-to-word"))
                .target("docx", "Word (DOCX)")
        }

        Tool::WordToPdf => {
            ConversionRoute::new(id, label, ACCEPT_WORD, remote("/api/convert/word-to-pdf"))
                .target("pdf", "PDF")
        }

        Tool::PptToPdf => {
            ConversionRoute::new(id, label, ACCEPT_PPT, remote("/api/convert/ppt-to-pdf"))
                .target("pdf", "PDF")
        }

        Tool::ExcelToPdf => {
            ConversionRoute::new(id, label, ACCEPT_EXCEL, remote("/api/convert/excel-to-pdf"))
                .target("pdf", "PDF")
        }

        Tool::PptToImages => ConversionRoute::new(
            id,
            label,
            ACCEPT_PPT,
            remote_with_format("/api/export/ppt-slides"),
        )
        .target("png", "Images (PNG)")
        .target("jpg", "Images (JPG)"),

        Tool::PptToWord => {
            ConversionRoute::new(id, label, ACCEPT_PPT, remote("/api/convert/ppt-to-word"))
                .target("docx", "Word (DOCX)")
        }

        Tool::ExcelToWord => {
            ConversionRoute::new(id, label, ACCEPT_EXCEL, remote("/api/convert/excel-to-word"))
                .target("docx", "Word (DOCX)")
        }

        Tool::WordToTxt => {
            ConversionRoute::new(id, label, ACCEPT_WORD, remote("/api/convert/word-to-txt"))
                .target("txt", "Text")
        }

        Tool::PptExtractImages => {
            ConversionRoute::new(id, label, ACCEPT_PPT, remote("/api/extract/ppt-images"))
                .target("images", "Images")
        }

        Tool::VideoConvert => ConversionRoute::new(
            id,
            label,
            ACCEPT_VIDEO,
            remote_with_format("/api/convert/video"),
        )
        .target("mp4", "MP4")
        .target("avi", "AVI")
        .target("mkv", "MKV")
        .target("mov", "MOV")
        .target("webm", "WEBM"),

        Tool::AudioExtract => ConversionRoute::new(
            id,
            label,
            ACCEPT_VIDEO,
            remote_with_format("/api/extract/audio"),
        )
        .target("mp3", "MP3")
        .target("wav", "WAV")
        .target("aac", "AAC")
        .target("flac", "FLAC"),

        Tool::AudioConvert => ConversionRoute::new(
            id,
            label,
            ACCEPT_AUDIO,
            remote_with_format("/api/convert/audio"),
        )
        .target("mp3", "MP3")
        .target("wav", "WAV")
        .target("aac", "AAC")
        .target("flac", "FLAC")
        .target("ogg", "OGG"),
    }
}

/// A registry holding just the given tool, keyed by its id.
pub fn tool_registry(
    tool: Tool,
    options: &ToolOptions,
    gateway: Arc<dyn RemoteGateway>,
    image: &ImageConfig,
) -> Result<RouteRegistry, RouteError> {
    RouteRegistry::single(tool.as_str(), tool_route(tool, options, gateway, image))
}

/// The smart-convert registry: one route per source format.
pub fn smart_convert_registry(
    gateway: Arc<dyn RemoteGateway>,
    image: &ImageConfig,
) -> Result<RouteRegistry, RouteError> {
    let remote = |name: &str, path: &str| -> RemoteConverter {
        RemoteConverter::new(name, gateway.clone(), RemoteEndpoint::new(path))
    };

    let slides = remote("ppt-to-pdf", "/api/convert/ppt-to-pdf");
    let slides = slides
        .for_target(
            "png",
            RemoteEndpoint::new("/api/export/ppt-slides").with_target_field("format"),
        )
        .for_target(
            "jpg",
            RemoteEndpoint::new("/api/export/ppt-slides").with_target_field("format"),
        );

    let raster: Arc<dyn Converter> = Arc::new(ImageConverter::new(ImageOperation::Convert {
        quality: image.quality,
    }));
    let images = TargetDispatch::new("image-convert", raster).on(
        "svg",
        Arc::new(remote("image-to-svg", "/api/convert/image-to-svg")),
    );

    let video = RemoteConverter::new(
        "video-convert",
        gateway.clone(),
        RemoteEndpoint::new("/api/convert/video").with_target_field("format"),
    );
    let audio = RemoteConverter::new(
        "audio-convert",
        gateway.clone(),
        RemoteEndpoint::new("/api/convert/audio").with_target_field("format"),
    );

    Ok(RouteRegistry::builder()
        .register(
            "pdf",
            ConversionRoute::new(
                "pdf-to-word",
                "PDF",
                ACCEPT_PDF,
                Arc::new(remote("pdf-to-word", "/api/convert/pdf-to-word")),
            )
            .target("docx", "Word (DOCX)"),
        )?
        .register(
            "docx",
            ConversionRoute::new(
                "word-to-pdf",
                "Word (DOCX)",
                ACCEPT_WORD,
                Arc::new(remote("word-to-pdf", "/api/convert/word-to-pdf")),
            )
            .target("pdf", "PDF"),
        )?
        .register(
            "pptx",
            ConversionRoute::new("ppt-to-pdf", "PowerPoint (PPTX)", ACCEPT_PPT, Arc::new(slides))
                .target("pdf", "PDF")
                .target("png", "Images (PNG)")
                .target("jpg", "Images (JPG)"),
        )?
        .register(
            "xlsx",
            ConversionRoute::new(
                "excel-to-pdf",
                "Excel (XLSX)",
                ACCEPT_EXCEL,
                Arc::new(remote("excel-to-pdf", "/api/convert/excel-to-pdf")),
            )
            .target("pdf", "PDF"),
        )?
        .register(
            "image",
            ConversionRoute::new(
                "image-convert",
                "Image (JPG, PNG, WEBP, SVG)",
                ACCEPT_IMAGE,
                Arc::new(images),
            )
            .target("jpeg", "JPG")
            .target("png", "PNG")
            .target("webp", "WebP")
            .target("svg", "SVG (Vector)"),
        )?
        .register(
            "video",
            ConversionRoute::new("video-convert", "Video (MP4, AVI, MKV)", ACCEPT_VIDEO, Arc::new(video))
                .target("mp4", "MP4")
                .target("avi", "AVI")
                .target("mkv", "MKV")
                .target("webm", "WebM"),
        )?
        .register(
            "audio",
            ConversionRoute::new("audio-convert", "Audio (MP3, WAV)", ACCEPT_AUDIO, Arc::new(audio))
                .target("mp3", "MP3")
                .target("wav", "WAV")
                .target("aac", "AAC"),
        )?
        .build())
}
