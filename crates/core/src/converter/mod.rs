//! Converters: the units of work a route invokes per file.
//!
//! Two execution strategies exist:
//!
//! - **Local**: image and PDF operations run in-process on a blocking
//!   worker thread (`image` and `lopdf`), producing in-memory artifacts.
//! - **Remote**: the file is uploaded to the conversion service and the
//!   result is one or more download references.
//!
//! [`TargetDispatch`] mixes the two when a route's targets differ in
//! strategy (e.g. raster formats locally, SVG tracing remotely).
//!
//! # Example
//!
//! ```ignore
//! use convertino_core::converter::{Converter, ImageConverter, ImageOperation};
//!
//! let converter = ImageConverter::new(ImageOperation::Convert { quality: 0.92 });
//! let artifacts = converter.convert(&file, "webp").await?;
//! assert_eq!(artifacts[0].suggested_filename(), "photo.webp");
//! ```

mod dispatch;
mod error;
mod raster;
mod pdf;
mod remote;
mod traits;

pub use dispatch::TargetDispatch;
pub use error::ConverterError;
pub use raster::{
    compress_image, convert_image, fit_within, resize_image, shrink_to_limit, ImageConverter,
    ImageOperation, OutputFormat,
};
pub use pdf::{
    compress_pdf, extract_pages, merge_pdfs, page_count, split_pdf, PdfConverter, PdfOperation,
};
pub use remote::{RemoteConverter, RemoteEndpoint};
pub use traits::Converter;
