//! ZIP archive construction.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::DownloadError;

/// `name (n).ext` for the n-th duplicate of `name.ext`.
pub fn numbered_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({}){}", &name[..idx], n, &name[idx..]),
        _ => format!("{} ({})", name, n),
    }
}

/// Writes every entry into one deflated ZIP archive, in order.
/// Repeated names get a ` (n)` suffix so no entry shadows another.
pub fn build_zip(entries: &[(String, Bytes)]) -> Result<Vec<u8>, DownloadError> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut used = HashSet::new();
        for (name, data) in entries {
            let mut entry_name = name.clone();
            let mut n = 1;
            while !used.insert(entry_name.clone()) {
                entry_name = numbered_name(name, n);
                n += 1;
            }

            zip.start_file(entry_name, options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("slide.png", 1), "slide (1).png");
        assert_eq!(numbered_name("README", 2), "README (2)");
        assert_eq!(numbered_name(".env", 1), ".env (1)");
    }

    #[test]
    fn test_duplicate_names_kept_apart() {
        let entries = vec![
            ("a.txt".to_string(), Bytes::from_static(b"first")),
            ("a.txt".to_string(), Bytes::from_static(b"second")),
        ];
        let data = build_zip(&entries).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut second = String::new();
        archive
            .by_name("a (1).txt")
            .unwrap()
            .read_to_string(&mut second)
            .unwrap();
        assert_eq!(second, "second");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let data = build_zip(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
