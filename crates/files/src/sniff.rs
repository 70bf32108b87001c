//! Content-type sniffing
//!
//! Maps the leading bytes of a buffer to one of a small, fixed set of formats the
//! store knows how to name (and, for images and PDFs, how to thumbnail). Anything
//! outside the table is reported as unknown rather than guessed at, so an EPUB or a
//! plain-text upload keeps whatever extension its original filename carried.

/// A file format recognised from its magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Ico,
    Pdf,
}

type Matcher = fn(&[u8]) -> bool;

/// Signature table, checked in order. The first matching entry wins.
const SIGNATURES: &[(Matcher, FileFormat)] = &[
    (infer::image::is_jpeg, FileFormat::Jpeg),
    (infer::image::is_png, FileFormat::Png),
    (infer::image::is_gif, FileFormat::Gif),
    (infer::image::is_webp, FileFormat::Webp),
    (infer::image::is_bmp, FileFormat::Bmp),
    (infer::image::is_tiff, FileFormat::Tiff),
    (infer::image::is_ico, FileFormat::Ico),
    (infer::archive::is_pdf, FileFormat::Pdf),
];

impl FileFormat {
    /// Identifies the format of `buffer`, or `None` if it is not in the table.
    pub fn sniff(buffer: &[u8]) -> Option<Self> {
        SIGNATURES
            .iter()
            .find(|(matches, _)| matches(buffer))
            .map(|(_, format)| *format)
    }

    /// File extension (without the leading dot) used when storing this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tif",
            Self::Ico => "ico",
            Self::Pdf => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_sniffs_known_signatures() {
        let cases: Vec<(Vec<u8>, FileFormat)> = vec![
            (PNG_HEADER.to_vec(), FileFormat::Png),
            (vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], FileFormat::Jpeg),
            (b"GIF89a\x01\x00\x01\x00".to_vec(), FileFormat::Gif),
            (b"%PDF-1.7\n%\xE2\xE3\xCF\xD3".to_vec(), FileFormat::Pdf),
            (b"BM\x3a\x00\x00\x00\x00\x00\x00\x00\x36\x00".to_vec(), FileFormat::Bmp),
        ];

        for (buffer, expected) in cases {
            assert_eq!(FileFormat::sniff(&buffer), Some(expected), "{expected:?}");
        }
    }

    #[test]
    fn test_unknown_content_is_not_guessed() {
        assert_eq!(FileFormat::sniff(b"hello world"), None);
        assert_eq!(FileFormat::sniff(b""), None);

        // EPUBs are zip archives; the table deliberately has no entry for them.
        let epub_prefix = b"PK\x03\x04\x14\x00\x00\x00\x00\x00mimetypeapplication/epub+zip";
        assert_eq!(FileFormat::sniff(epub_prefix), None);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(FileFormat::Jpeg.extension(), "jpg");
        assert_eq!(FileFormat::Tiff.extension(), "tif");
        assert_eq!(FileFormat::Pdf.extension(), "pdf");
    }
}
