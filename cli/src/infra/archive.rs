//! Archive codecs and scratch space: implements the `ArtifactStore` port.
//!
//! Zip for package bits, tar (optionally gzip) for image layers. The codecs
//! are blocking and run under `spawn_blocking` from the async port methods.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::application::ports::ArtifactStore;

/// Directory image layouts put application sources under.
const IMAGE_APP_DIR: &str = "app";

/// Production `ArtifactStore` on the local filesystem.
pub struct LocalArtifacts;

impl ArtifactStore for LocalArtifacts {
    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix("cf-prompt-")
            .tempdir()
            .context("creating scratch directory")
    }

    async fn unpack_zip(&self, archive: &Path, dest: &Path) -> Result<()> {
        let (archive, dest) = (archive.to_path_buf(), dest.to_path_buf());
        tokio::task::spawn_blocking(move || unpack_zip(&archive, &dest))
            .await
            .context("spawn_blocking for unpack_zip")?
    }

    async fn pack_zip(&self, src: &Path, archive: &Path) -> Result<()> {
        let (src, archive) = (src.to_path_buf(), archive.to_path_buf());
        tokio::task::spawn_blocking(move || pack_zip(&src, &archive))
            .await
            .context("spawn_blocking for pack_zip")?
    }

    fn workspace_root(&self, dest: &Path) -> PathBuf {
        let app = dest.join(IMAGE_APP_DIR);
        if app.is_dir() { app } else { dest.to_path_buf() }
    }
}

// ── Zip ───────────────────────────────────────────────────────────────────────

/// Expand every entry of `archive` into `dest`, keeping unix permissions.
///
/// # Errors
///
/// Returns an error if an entry would escape `dest` or any I/O fails.
pub fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("reading zip {}", archive.display()))?;
    fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            bail!("zip entry '{}' escapes the destination", entry.name());
        };
        let out = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut target =
            File::create(&out).with_context(|| format!("creating {}", out.display()))?;
        io::copy(&mut entry, &mut target).with_context(|| format!("writing {}", out.display()))?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }
    Ok(())
}

/// Compress the tree under `src` into `archive`, deflating every file.
///
/// Entry names are `/`-separated paths relative to `src`. Symlinks are not
/// followed and not stored.
///
/// # Errors
///
/// Returns an error if walking `src` or writing `archive` fails.
pub fn pack_zip(src: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive).with_context(|| format!("creating {}", archive.display()))?;
    let mut zip = ZipWriter::new(file);
    let base = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let options = base.unix_permissions(entry_mode(&entry)?);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut f = File::open(entry.path())
                .with_context(|| format!("opening {}", entry.path().display()))?;
            io::copy(&mut f, &mut zip)?;
        }
    }
    zip.finish().context("finalizing zip")?;
    Ok(())
}

#[cfg(unix)]
fn entry_mode(entry: &walkdir::DirEntry) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(entry.metadata()?.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn entry_mode(entry: &walkdir::DirEntry) -> Result<u32> {
    Ok(if entry.file_type().is_dir() { 0o755 } else { 0o644 })
}

// ── Tar layers ────────────────────────────────────────────────────────────────

/// Layer compression, decided from the media type or the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerCompression {
    None,
    Gzip,
}

impl LayerCompression {
    /// Compression declared by an OCI/docker layer media type.
    ///
    /// # Errors
    ///
    /// Returns an error for zstd layers, which are not supported.
    pub fn from_media_type(media_type: &str) -> Result<Option<Self>> {
        if media_type.contains("zstd") {
            bail!("unsupported layer compression: {media_type}");
        }
        if media_type.contains("gzip") || media_type.ends_with(".tar.gz") {
            return Ok(Some(Self::Gzip));
        }
        if media_type.ends_with(".tar") {
            return Ok(Some(Self::None));
        }
        Ok(None)
    }

    /// Sniff the gzip magic number.
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else {
            Self::None
        }
    }
}

/// Clean a tar entry path relative to the image root.
///
/// Absolute names are re-rooted; `..` is rejected.
fn sanitize(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Normal(part) => clean.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

/// Extract the regular files of one layer into `dest`.
///
/// Parent directories are created, modes preserved, and existing files
/// overwritten. Directories, links, devices and whiteouts are skipped.
///
/// # Errors
///
/// Returns an error on a path escaping `dest`, or on any read, decompress,
/// or write failure.
pub fn unpack_layer(layer: &Path, compression: Option<LayerCompression>, dest: &Path) -> Result<()> {
    let mut file = File::open(layer).with_context(|| format!("opening {}", layer.display()))?;
    let compression = match compression {
        Some(c) => c,
        None => {
            let mut head = [0u8; 2];
            let n = file.read(&mut head)?;
            file = File::open(layer)?;
            LayerCompression::sniff(&head[..n])
        }
    };
    let reader: Box<dyn Read> = match compression {
        LayerCompression::Gzip => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        LayerCompression::None => Box::new(BufReader::new(file)),
    };
    unpack_tar(reader, dest)
}

fn unpack_tar(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().context("reading layer")? {
        let mut entry = entry.context("reading layer entry")?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let raw = entry.path()?.into_owned();
        let Some(rel) = sanitize(&raw) else {
            bail!("layer entry '{}' escapes the destination", raw.display());
        };
        let out = dest.join(rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        if out.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
            fs::remove_file(&out).with_context(|| format!("replacing {}", out.display()))?;
        }
        entry
            .unpack(&out)
            .with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(())
}
