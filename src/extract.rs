//! Unpacks downloaded archives into a destination directory.
use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use xz2::read::XzDecoder;
use xz2::stream::Stream;

const TAR_EXTENSIONS: [&str; 14] = [
    "tar", "bz2", "tb2", "tbz", "tbz2", "gz", "tgz", "lz", "lzma", "tlz", "xz", "txz", "Z", "tZ",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    /// Any tarball; the extension is kept for logging only, the compression is
    /// detected from the payload.
    Tar(String),
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "zip" {
            Ok(Self::Zip)
        } else if TAR_EXTENSIONS.contains(&s) {
            Ok(Self::Tar(s.to_string()))
        } else {
            Err(Error::UnsupportedFormat(s.to_string()))
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => f.write_str("zip"),
            Self::Tar(ext) => f.write_str(ext),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Compression {
    Gzip,
    Bzip2,
    Xz,
    None,
}

impl Compression {
    fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0x1f, 0x8b, ..] => Self::Gzip,
            [b'B', b'Z', b'h', ..] => Self::Bzip2,
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Self::Xz,
            // Legacy .lzma header: properties byte 0x5d followed by the dictionary size
            [0x5d, 0x00, 0x00, ..] => Self::Xz,
            _ => Self::None,
        }
    }
}

pub fn extract(bytes: &[u8], format: &ArchiveFormat, destination: &Path) -> Result<()> {
    debug!(%format, size = bytes.len(), destination = %destination.display(), "Extracting archive");
    match format {
        ArchiveFormat::Zip => extract_zip(bytes, destination),
        ArchiveFormat::Tar(_) => extract_tar(bytes, destination),
    }
}

/// Parses `format` first, so an unknown extension fails before touching the disk.
pub fn extract_as(bytes: &[u8], format: &str, destination: &Path) -> Result<()> {
    extract(bytes, &format.parse()?, destination)
}

fn extract_zip(bytes: &[u8], destination: &Path) -> Result<()> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::Extraction(e.to_string()))?;
    archive
        .extract(destination)
        .map_err(|e| Error::Extraction(e.to_string()))
}

fn extract_tar(bytes: &[u8], destination: &Path) -> Result<()> {
    let reader: Box<dyn Read + '_> = match Compression::detect(bytes) {
        Compression::Gzip => Box::new(GzDecoder::new(bytes)),
        Compression::Bzip2 => Box::new(BzDecoder::new(bytes)),
        Compression::Xz => {
            let stream = Stream::new_auto_decoder(u64::MAX, 0)
                .map_err(|e| Error::Extraction(e.to_string()))?;
            Box::new(XzDecoder::new_stream(bytes, stream))
        }
        Compression::None => Box::new(bytes),
    };

    fs::create_dir_all(destination)?;
    tar::Archive::new(reader)
        .unpack(destination)
        .map_err(|e| Error::Extraction(e.to_string()))
}
