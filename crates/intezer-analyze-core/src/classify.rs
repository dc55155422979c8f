//! Magic-byte sniffing for the formats the service accepts.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use tracing::{debug, info};

const HEADER_LENGTH: usize = 6;

const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const APK_MANIFEST: &str = "AndroidManifest.xml";
const APK_COMPANIONS: [&str; 2] = ["classes.dex", "resources.arsc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pe,
    Elf,
    Dex,
    Gzip,
    SevenZip,
    Apk,
}

impl FileFormat {
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Pe => "PE",
            FileFormat::Elf => "ELF",
            FileFormat::Dex => "DEX",
            FileFormat::Gzip => "GZIP",
            FileFormat::SevenZip => "7-Zip",
            FileFormat::Apk => "APK",
        }
    }
}

struct Signature {
    bytes: &'static [u8],
    format: FileFormat,
}

static SIGNATURES: &[Signature] = &[
    Signature {
        bytes: b"MZ",
        format: FileFormat::Pe,
    },
    Signature {
        bytes: &[0x7F, b'E', b'L', b'F'],
        format: FileFormat::Elf,
    },
    Signature {
        bytes: &[b'd', b'e', b'x', 0x0A],
        format: FileFormat::Dex,
    },
    Signature {
        bytes: &[0x1F, 0x8B, 0x08],
        format: FileFormat::Gzip,
    },
    Signature {
        bytes: &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C],
        format: FileFormat::SevenZip,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    Empty,
    UnknownFormat,
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Supported(FileFormat),
    Unsupported(UnsupportedReason),
}

impl Classification {
    pub fn is_supported(&self) -> bool {
        matches!(self, Classification::Supported(_))
    }
}

/// Which files a walk hands to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    /// Only formats recognised by [`classify_file`].
    SupportedFormats,
    /// Any readable file with content.
    NonEmpty,
}

impl FileFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            FileFilter::SupportedFormats => classify_file(path).is_supported(),
            FileFilter::NonEmpty => is_non_empty_file(path),
        }
    }
}

/// Match a file header against the direct signatures.
pub fn classify_header(header: &[u8]) -> Option<FileFormat> {
    SIGNATURES
        .iter()
        .find(|sig| header.starts_with(sig.bytes))
        .map(|sig| sig.format)
}

/// Classify a byte stream. ZIP containers are only accepted when they look like an APK.
pub fn classify_reader<R: Read + Seek>(mut reader: R) -> io::Result<Classification> {
    let mut header = [0u8; HEADER_LENGTH];
    let read = read_header(&mut reader, &mut header)?;
    if read == 0 {
        return Ok(Classification::Unsupported(UnsupportedReason::Empty));
    }

    if let Some(format) = classify_header(&header[..read]) {
        return Ok(Classification::Supported(format));
    }

    reader.rewind()?;
    if header[..read].starts_with(ZIP_MAGIC) || zip::ZipArchive::new(&mut reader).is_ok() {
        reader.rewind()?;
        if is_apk(reader) {
            return Ok(Classification::Supported(FileFormat::Apk));
        }
    }

    Ok(Classification::Unsupported(UnsupportedReason::UnknownFormat))
}

pub fn classify_file(path: &Path) -> Classification {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            info!("No read permissions for file {}: {}", path.display(), e);
            return Classification::Unsupported(UnsupportedReason::Unreadable);
        }
    };

    match classify_reader(file) {
        Ok(Classification::Supported(format)) => {
            debug!("{} is a {} file", path.display(), format.name());
            Classification::Supported(format)
        }
        Ok(classification) => classification,
        Err(e) => {
            info!("Failed reading {}: {}", path.display(), e);
            Classification::Unsupported(UnsupportedReason::Unreadable)
        }
    }
}

pub fn is_supported_file(path: &Path) -> bool {
    classify_file(path).is_supported()
}

fn is_non_empty_file(path: &Path) -> bool {
    match File::open(path).and_then(|f| f.metadata()) {
        Ok(metadata) => metadata.len() > 0,
        Err(e) => {
            info!("No read permissions for file {}: {}", path.display(), e);
            false
        }
    }
}

fn read_header<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn is_apk<R: Read + Seek>(reader: R) -> bool {
    let archive = match zip::ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            debug!("Bad zip file: {}", e);
            return false;
        }
    };

    let mut has_manifest = false;
    let mut has_companion = false;
    for name in archive.file_names() {
        if name == APK_MANIFEST {
            has_manifest = true;
        } else if APK_COMPANIONS.contains(&name) {
            has_companion = true;
        }
    }
    has_manifest && has_companion
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn zip_with(entries: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for name in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"content").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_pe_header_is_supported() {
        let data = [0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00];
        assert_eq!(
            classify_reader(Cursor::new(data)).unwrap(),
            Classification::Supported(FileFormat::Pe)
        );
    }

    #[test]
    fn test_null_header_is_unsupported() {
        let data = [0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            classify_reader(Cursor::new(data)).unwrap(),
            Classification::Unsupported(UnsupportedReason::UnknownFormat)
        );
    }

    #[test]
    fn test_direct_signatures() {
        assert_eq!(classify_header(b"\x7fELF\x02\x01"), Some(FileFormat::Elf));
        assert_eq!(classify_header(b"dex\n035"), Some(FileFormat::Dex));
        assert_eq!(classify_header(&[0x1F, 0x8B, 0x08, 0x00]), Some(FileFormat::Gzip));
        assert_eq!(
            classify_header(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]),
            Some(FileFormat::SevenZip)
        );
        // gzip without the deflate method byte is not accepted
        assert_eq!(classify_header(&[0x1F, 0x8B]), None);
        // truncated 7z signature
        assert_eq!(classify_header(&[0x37, 0x7A, 0xBC, 0xAF]), None);
    }

    #[test]
    fn test_empty_stream_is_unsupported() {
        assert_eq!(
            classify_reader(Cursor::new(Vec::<u8>::new())).unwrap(),
            Classification::Unsupported(UnsupportedReason::Empty)
        );
    }

    #[test]
    fn test_zip_with_only_manifest_is_unsupported() {
        let data = zip_with(&["AndroidManifest.xml"]);
        assert_eq!(
            classify_reader(Cursor::new(data)).unwrap(),
            Classification::Unsupported(UnsupportedReason::UnknownFormat)
        );
    }

    #[test]
    fn test_zip_with_manifest_and_dex_is_apk() {
        let data = zip_with(&["AndroidManifest.xml", "classes.dex"]);
        assert_eq!(
            classify_reader(Cursor::new(data)).unwrap(),
            Classification::Supported(FileFormat::Apk)
        );
    }

    #[test]
    fn test_zip_with_manifest_and_resources_is_apk() {
        let data = zip_with(&["res/layout/main.xml", "AndroidManifest.xml", "resources.arsc"]);
        assert!(classify_reader(Cursor::new(data)).unwrap().is_supported());
    }

    #[test]
    fn test_corrupt_zip_is_unsupported() {
        let mut data = ZIP_MAGIC.to_vec();
        data.extend_from_slice(&[0xFF; 32]);
        assert!(!classify_reader(Cursor::new(data)).unwrap().is_supported());
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            classify_file(&tmp.path().join("missing.bin")),
            Classification::Unsupported(UnsupportedReason::Unreadable)
        );
    }

    #[test]
    fn test_file_filter_non_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty.eml");
        let email = tmp.path().join("message.eml");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&email, b"From: someone@example.com\r\n").unwrap();

        assert!(!FileFilter::NonEmpty.accepts(&empty));
        assert!(FileFilter::NonEmpty.accepts(&email));
        assert!(!FileFilter::SupportedFormats.accepts(&email));
    }
}
