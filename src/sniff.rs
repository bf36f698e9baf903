//! Image format detection from leading bytes.
//!
//! Pure, no I/O. This is the ground-truth fallback for URL validation: hosts
//! that omit or mislabel `Content-Type` still serve correct bytes, and the
//! first handful of bytes is enough to recognize every format we accept.

/// Image formats recognizable from their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
        }
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Inspect leading bytes and return the recognized format, if any.
///
/// Returns `None` when fewer bytes than a signature needs are available or
/// no signature matches. Signatures are mutually exclusive, so check order
/// only affects how quickly the common formats short-circuit.
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    // Container formats first: they need bytes past offset 8.
    if is_webp(bytes) {
        return Some(ImageFormat::Webp);
    }
    if is_avif(bytes) {
        return Some(ImageFormat::Avif);
    }
    if bytes.len() >= 8 && bytes[..8] == PNG_SIGNATURE {
        return Some(ImageFormat::Png);
    }
    if bytes.len() >= 4 && &bytes[..4] == b"GIF8" {
        return Some(ImageFormat::Gif);
    }
    if bytes.len() >= 3 && bytes[..3] == [0xFF, 0xD8, 0xFF] {
        return Some(ImageFormat::Jpeg);
    }
    if bytes.len() >= 4 && (&bytes[..4] == b"II*\0" || &bytes[..4] == b"MM\0*") {
        return Some(ImageFormat::Tiff);
    }
    if bytes.len() >= 2 && &bytes[..2] == b"BM" {
        return Some(ImageFormat::Bmp);
    }
    None
}

/// RIFF container with a `WEBP` chunk identifier at offset 8.
fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

/// ISO-BMFF `ftyp` box whose major brand is `avif` or `avis`.
fn is_avif(bytes: &[u8]) -> bool {
    bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && (&bytes[8..12] == b"avif" || &bytes[8..12] == b"avis")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_jpeg() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn recognizes_png() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 13]);
        assert_eq!(sniff(&bytes), Some(ImageFormat::Png));
    }

    #[test]
    fn recognizes_gif() {
        assert_eq!(sniff(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(sniff(b"GIF87a"), Some(ImageFormat::Gif));
    }

    #[test]
    fn recognizes_webp() {
        assert_eq!(sniff(b"RIFF\x24\x00\x00\x00WEBPVP8 "), Some(ImageFormat::Webp));
    }

    #[test]
    fn recognizes_avif_brands() {
        assert_eq!(
            sniff(b"\x00\x00\x00\x20ftypavif\x00\x00\x00\x00"),
            Some(ImageFormat::Avif)
        );
        assert_eq!(
            sniff(b"\x00\x00\x00\x20ftypavis\x00\x00\x00\x00"),
            Some(ImageFormat::Avif)
        );
    }

    #[test]
    fn recognizes_bmp() {
        assert_eq!(sniff(b"BM\x36\x00\x0C\x00"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn recognizes_tiff_both_endians() {
        assert_eq!(sniff(b"II*\0\x08\x00\x00\x00"), Some(ImageFormat::Tiff));
        assert_eq!(sniff(b"MM\0*\x00\x00\x00\x08"), Some(ImageFormat::Tiff));
    }

    #[test]
    fn rejects_non_matching_bytes() {
        let junk = [0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        assert_eq!(sniff(&junk), None);
        assert_eq!(sniff(b"<html><head></head>"), None);
    }

    #[test]
    fn rejects_truncated_signatures() {
        assert_eq!(sniff(&[]), None);
        assert_eq!(sniff(&[0xFF, 0xD8]), None);
        assert_eq!(sniff(&PNG_SIGNATURE[..7]), None);
        // RIFF header without enough bytes to see the WEBP tag
        assert_eq!(sniff(b"RIFF\x24\x00\x00\x00WEB"), None);
        // ftyp box with a brand we do not accept
        assert_eq!(sniff(b"\x00\x00\x00\x20ftypmp42\x00\x00\x00\x00"), None);
    }
}
