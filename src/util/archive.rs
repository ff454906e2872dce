//! Source archive detection and extraction.
//!
//! The format is decided from file content: a valid tar header (plain or
//! inside gzip), a zip signature, then the xz and bzip2 magic numbers for
//! compressed tarballs. The file name only matters for naming the
//! intermediate tar of a compressed tarball.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use xz2::read::XzDecoder;

use crate::core::{port_error, PortError};
use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;

const TAR_BLOCK: usize = 512;
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZIP_MAGICS: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06"];

/// A recognized archive container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    GzipTar,
    Zip,
    XzTar,
    Bzip2Tar,
}

/// Check a 512-byte block for a valid tar header checksum.
fn is_tar_header(block: &[u8]) -> bool {
    if block.len() < TAR_BLOCK || block.iter().all(|b| *b == 0) {
        return false;
    }

    let field = &block[148..156];
    let digits: String = field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| **b != 0 && **b != b' ')
        .map(|b| *b as char)
        .collect();
    let digits = digits.trim();
    let Ok(recorded) = u32::from_str_radix(digits, 8) else {
        return false;
    };

    let computed: u32 = block[..TAR_BLOCK]
        .iter()
        .enumerate()
        .map(|(i, b)| if (148..156).contains(&i) { b' ' as u32 } else { *b as u32 })
        .sum();
    recorded == computed
}

/// Read up to `buf.len()` bytes, stopping early only at end of input.
fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Detect the container format of an archive. `None` when unrecognized.
pub fn detect_format(path: &Path) -> Result<Option<ArchiveFormat>> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open archive: {}", path.display()))?;
    let mut head = [0u8; TAR_BLOCK];
    let len = read_prefix(&mut file, &mut head)
        .with_context(|| format!("failed to read archive: {}", path.display()))?;
    let head = &head[..len];

    if is_tar_header(head) {
        return Ok(Some(ArchiveFormat::Tar));
    }

    if head.starts_with(GZIP_MAGIC) {
        let file = File::open(path)
            .with_context(|| format!("failed to open archive: {}", path.display()))?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut block = [0u8; TAR_BLOCK];
        if let Ok(n) = read_prefix(&mut decoder, &mut block) {
            if is_tar_header(&block[..n]) {
                return Ok(Some(ArchiveFormat::GzipTar));
            }
        }
        return Ok(None);
    }

    if ZIP_MAGICS.iter().any(|magic| head.starts_with(magic)) {
        return Ok(Some(ArchiveFormat::Zip));
    }

    if head.starts_with(XZ_MAGIC) {
        let file = File::open(path)
            .with_context(|| format!("failed to open archive: {}", path.display()))?;
        let mut decoder = XzDecoder::new(BufReader::new(file));
        let mut block = [0u8; TAR_BLOCK];
        if let Ok(n) = read_prefix(&mut decoder, &mut block) {
            if is_tar_header(&block[..n]) {
                return Ok(Some(ArchiveFormat::XzTar));
            }
        }
        return Ok(None);
    }

    if head.starts_with(BZIP2_MAGIC) {
        return Ok(Some(ArchiveFormat::Bzip2Tar));
    }

    Ok(None)
}

/// Reject entry paths that would land outside the destination.
fn check_entry_path(entry_path: &Path) -> Result<()> {
    for component in entry_path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!(
                    "archive entry escapes destination directory: {}",
                    entry_path.display()
                );
            }
            _ => {}
        }
    }
    Ok(())
}

/// Extract a tar stream into `dest`.
pub fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);

    ensure_dir(dest)?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();
        check_entry_path(&entry_path)?;

        entry
            .unpack_in(dest)
            .with_context(|| format!("failed to extract {}", entry_path.display()))?;
    }

    Ok(())
}

/// Extract a zip archive into `dest`, keeping unix modes where recorded.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("failed to read zip archive: {}", archive_path.display()))?;

    ensure_dir(dest)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).context("failed to read zip entry")?;

        let Some(relative) = file.enclosed_name() else {
            bail!("archive entry escapes destination directory: {}", file.name());
        };
        let outpath = dest.join(relative);

        if file.is_dir() {
            ensure_dir(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            ensure_dir(parent)?;
        }
        let mut outfile = File::create(&outpath)
            .with_context(|| format!("failed to create file: {}", outpath.display()))?;
        std::io::copy(&mut file, &mut outfile)
            .with_context(|| format!("failed to extract {}", file.name()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .with_context(|| format!("failed to set mode on {}", outpath.display()))?;
            }
        }
    }

    Ok(())
}

/// Name of the intermediate tar for a compressed tarball.
fn inner_tar_name(archive_path: &Path) -> String {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());

    for (suffix, replacement) in [
        (".tar.xz", ".tar"),
        (".tar.bz2", ".tar"),
        (".txz", ".tar"),
        (".tbz2", ".tar"),
        (".tbz", ".tar"),
        (".xz", ""),
        (".bz2", ""),
    ] {
        if let Some(stem) = name.strip_suffix(suffix) {
            let inner = format!("{}{}", stem, replacement);
            return if inner.ends_with(".tar") {
                inner
            } else {
                format!("{}.tar", inner)
            };
        }
    }
    format!("{}.tar", name)
}

/// Decompress into an inner tar beside the extracted tree, extract it, then remove it.
///
/// A payload that is not a tar leaves `dest` as it was found and fails with
/// `UnrecognizedArchiveFormat`.
fn extract_via_inner_tar(
    archive_path: &Path,
    dest: &Path,
    decompress: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    let created = !dest.exists();
    ensure_dir(dest)?;
    let inner = dest.join(inner_tar_name(archive_path));

    let result = decompress(&inner).and_then(|()| {
        let mut file = File::open(&inner)
            .with_context(|| format!("failed to open {}", inner.display()))?;
        let mut block = [0u8; TAR_BLOCK];
        let n = read_prefix(&mut file, &mut block)
            .with_context(|| format!("failed to read {}", inner.display()))?;
        if !is_tar_header(&block[..n]) {
            return Err(PortError::UnrecognizedArchiveFormat {
                archive: archive_path.display().to_string(),
            }
            .into());
        }

        let file = File::open(&inner)
            .with_context(|| format!("failed to open {}", inner.display()))?;
        extract_tar(BufReader::new(file), dest)
    });

    if inner.exists() {
        std::fs::remove_file(&inner)
            .with_context(|| format!("failed to remove {}", inner.display()))?;
    }
    if created && result.as_ref().is_err_and(is_unrecognized) {
        std::fs::remove_dir(dest)
            .with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    result
}

fn is_unrecognized(err: &anyhow::Error) -> bool {
    matches!(
        port_error(err),
        Some(PortError::UnrecognizedArchiveFormat { .. })
    )
}

/// Extract `archive_path` into `dest` according to `format`.
///
/// `tool` resolves external programs (currently only `bzip2`) to a path
/// and is only called when the format needs one.
pub fn extract(
    archive_path: &Path,
    format: ArchiveFormat,
    dest: &Path,
    tool: impl FnOnce(&str) -> Result<PathBuf>,
) -> Result<()> {
    tracing::debug!(
        "extracting {} ({:?}) into {}",
        archive_path.display(),
        format,
        dest.display()
    );

    let open = || {
        File::open(archive_path)
            .map(BufReader::new)
            .with_context(|| format!("failed to open archive: {}", archive_path.display()))
    };

    match format {
        ArchiveFormat::Tar => extract_tar(open()?, dest),
        ArchiveFormat::GzipTar => extract_tar(GzDecoder::new(open()?), dest),
        ArchiveFormat::Zip => extract_zip(archive_path, dest),
        ArchiveFormat::XzTar => extract_via_inner_tar(archive_path, dest, |inner| {
            let mut decoder = XzDecoder::new(open()?);
            let mut out = File::create(inner)
                .with_context(|| format!("failed to create {}", inner.display()))?;
            std::io::copy(&mut decoder, &mut out)
                .with_context(|| format!("failed to decompress {}", archive_path.display()))?;
            Ok(())
        }),
        ArchiveFormat::Bzip2Tar => {
            let bzip2 = tool("bzip2")?;
            extract_via_inner_tar(archive_path, dest, |inner| {
                let status = ProcessBuilder::new(&bzip2)
                    .args(["-d", "-c"])
                    .arg(archive_path)
                    .exec_to_file(inner)?;
                if !status.success() {
                    bail!(
                        "bzip2 failed to decompress {} (exit code {:?})",
                        archive_path.display(),
                        status.code()
                    );
                }
                Ok(())
            })
        }
    }
}

/// Detect and extract in one step; unrecognized formats fail before `dest` is touched.
pub fn unpack(
    archive_path: &Path,
    dest: &Path,
    tool: impl FnOnce(&str) -> Result<PathBuf>,
) -> Result<ArchiveFormat> {
    let format = detect_format(archive_path)?.ok_or_else(|| PortError::UnrecognizedArchiveFormat {
        archive: archive_path.display().to_string(),
    })?;
    extract(archive_path, format, dest, tool)?;
    Ok(format)
}
