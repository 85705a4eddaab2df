//! Testing utilities and mock implementations.
//!
//! Mocks for the converter, remote gateway and artifact sink seams, so
//! batches and downloads can be exercised without the conversion service.
//!
//! # Example
//!
//! ```rust,ignore
//! use convertino_core::testing::{MockConverter, MockGateway, MemorySink};
//!
//! let converter = MockConverter::new().local();
//! converter.fail_on("broken.pdf", "bad format").await;
//!
//! let gateway = MockGateway::new();
//! gateway.respond("/api/export/ppt-slides", DownloadRef::Multi(urls)).await;
//! ```

mod memory_sink;
mod mock_converter;
mod mock_gateway;

pub use memory_sink::MemorySink;
pub use mock_converter::{MockConverter, RecordedCall};
pub use mock_gateway::MockGateway;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::{dictionary, Document, Object};

    use crate::fileset::RawFile;

    /// A PNG with a smooth gradient.
    pub fn png_image(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                255,
            ])
        });
        encode_png(DynamicImage::ImageRgba8(image))
    }

    /// A PNG of pseudo-random pixels, which compresses badly in any format.
    pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x1234_5678;
        let mut next = move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([next(), next(), next()]);
        }
        encode_png(DynamicImage::ImageRgb8(image))
    }

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .expect("PNG encoding of an in-memory image");
        buffer
    }

    /// A minimal valid PDF with `pages` blank A4 pages.
    pub fn pdf_with_pages(pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .expect("saving an in-memory PDF");
        buffer
    }

    /// A file of `size` zero bytes.
    pub fn file_of_size(name: &str, mime_type: &str, size: usize) -> RawFile {
        RawFile::new(name, mime_type, vec![0u8; size])
    }

    pub fn image_file(name: &str) -> RawFile {
        RawFile::new(name, "image/png", png_image(4, 4))
    }

    pub fn pdf_file(name: &str, pages: u32) -> RawFile {
        RawFile::new(name, "application/pdf", pdf_with_pages(pages))
    }
}
