// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Extracting source distribution archives. */

use {
    anyhow::{anyhow, Context, Result},
    log::{debug, info},
    std::{
        collections::BTreeSet,
        io::{BufReader, Read},
        path::{Component, Path, PathBuf},
    },
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionFormat {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

/// The container format of a source distribution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArchiveFormat {
    Tar(CompressionFormat),
    Zip,
}

impl ArchiveFormat {
    /// Resolve the format from a filename suffix like `tar.gz`.
    pub fn from_suffix(suffix: &str) -> Result<Self> {
        match suffix.trim_start_matches('.') {
            "tar" => Ok(Self::Tar(CompressionFormat::None)),
            "tar.gz" | "tgz" => Ok(Self::Tar(CompressionFormat::Gzip)),
            "tar.bz2" | "tbz2" | "tbz" => Ok(Self::Tar(CompressionFormat::Bzip2)),
            "tar.xz" | "txz" => Ok(Self::Tar(CompressionFormat::Xz)),
            "tar.zst" | "tzst" => Ok(Self::Tar(CompressionFormat::Zstd)),
            "zip" => Ok(Self::Zip),
            _ => Err(anyhow!("unsupported source archive suffix: {}", suffix)),
        }
    }
}

fn get_decompression_stream(
    format: CompressionFormat,
    reader: impl Read + 'static,
) -> Result<Box<dyn Read>> {
    let reader = BufReader::new(reader);

    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        CompressionFormat::Bzip2 => Ok(Box::new(bzip2::read::BzDecoder::new(reader))),
        CompressionFormat::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        CompressionFormat::Zstd => Ok(Box::new(zstd::stream::read::Decoder::new(reader)?)),
    }
}

/// Extract an archive into a directory.
pub fn extract_archive(archive_path: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<()> {
    info!(
        "extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    let fh = std::fs::File::open(archive_path)
        .with_context(|| format!("opening {}", archive_path.display()))?;

    match format {
        ArchiveFormat::Tar(compression) => {
            let mut archive = tar::Archive::new(
                get_decompression_stream(compression, fh)
                    .context("obtaining decompression stream")?,
            );
            archive.set_preserve_permissions(true);

            archive
                .unpack(dest_dir)
                .with_context(|| format!("extracting {}", archive_path.display()))?;
        }
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(fh).context("reading zip archive")?;

            archive
                .extract(dest_dir)
                .with_context(|| format!("extracting {}", archive_path.display()))?;
        }
    }

    Ok(())
}

fn first_component(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().to_string()),
        _ => None,
    })
}

/// Names of the top-level entries of an archive.
pub fn archive_top_level_names(
    archive_path: &Path,
    format: ArchiveFormat,
) -> Result<BTreeSet<String>> {
    let fh = std::fs::File::open(archive_path)
        .with_context(|| format!("opening {}", archive_path.display()))?;

    let mut names = BTreeSet::new();

    match format {
        ArchiveFormat::Tar(compression) => {
            let mut archive = tar::Archive::new(
                get_decompression_stream(compression, fh)
                    .context("obtaining decompression stream")?,
            );

            for entry in archive
                .entries()
                .with_context(|| format!("reading {}", archive_path.display()))?
            {
                let entry = entry.with_context(|| format!("reading {}", archive_path.display()))?;

                if matches!(
                    entry.header().entry_type(),
                    tar::EntryType::XGlobalHeader | tar::EntryType::XHeader
                ) {
                    continue;
                }

                if let Some(name) = first_component(&entry.path()?) {
                    names.insert(name);
                }
            }
        }
        ArchiveFormat::Zip => {
            let archive = zip::ZipArchive::new(fh).context("reading zip archive")?;

            names.extend(archive.file_names().filter_map(|name| {
                name.split('/')
                    .find(|part| !part.is_empty() && *part != ".")
                    .map(|part| part.to_string())
            }));
        }
    }

    Ok(names)
}

fn remove_tree(path: &Path) -> Result<()> {
    if path.exists() {
        debug!("removing {}", path.display());
        std::fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))?;
    }

    Ok(())
}

/// Unpack a source distribution into a build directory.
///
/// Returns the path of the unpacked source tree. This is normally
/// `build_dir/root_name`. If the archive holds a single top-level directory
/// with a different name, that directory is used instead. Whichever
/// directory the archive unpacks to is removed before extraction.
pub fn unpack_sdist(
    archive_path: &Path,
    format: ArchiveFormat,
    build_dir: &Path,
    root_name: &str,
) -> Result<PathBuf> {
    let root = build_dir.join(root_name);
    let names = archive_top_level_names(archive_path, format)?;

    let source_root = if names.contains(root_name) {
        root.clone()
    } else {
        match names.iter().collect::<Vec<_>>().as_slice() {
            [single] => {
                debug!(
                    "{} unpacks to {} instead of {}",
                    archive_path.display(),
                    single,
                    root_name
                );
                build_dir.join(single)
            }
            _ => {
                return Err(anyhow!(
                    "{} does not contain a {} directory",
                    archive_path.display(),
                    root_name
                ))
            }
        }
    };

    remove_tree(&root)?;
    remove_tree(&source_root)?;

    std::fs::create_dir_all(build_dir)
        .with_context(|| format!("creating {}", build_dir.display()))?;

    extract_archive(archive_path, format, build_dir)?;

    if !source_root.is_dir() {
        return Err(anyhow!(
            "{} did not unpack to a directory at {}",
            archive_path.display(),
            source_root.display()
        ));
    }

    Ok(source_root)
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    fn write_tar_gz(path: &Path, root: &str) -> Result<()> {
        let fh = std::fs::File::create(path)?;
        let encoder = flate2::write::GzEncoder::new(fh, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let files: [(&str, &[u8]); 2] = [
            ("setup.py", b"from setuptools import setup\n"),
            ("README", b"hi\n"),
        ];

        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, format!("{}/{}", root, name), data)?;
        }

        builder.into_inner()?.finish()?;

        Ok(())
    }

    #[test]
    fn suffixes() -> Result<()> {
        assert_eq!(
            ArchiveFormat::from_suffix("tar.gz")?,
            ArchiveFormat::Tar(CompressionFormat::Gzip)
        );
        assert_eq!(
            ArchiveFormat::from_suffix(".tar.bz2")?,
            ArchiveFormat::Tar(CompressionFormat::Bzip2)
        );
        assert_eq!(
            ArchiveFormat::from_suffix("tar.xz")?,
            ArchiveFormat::Tar(CompressionFormat::Xz)
        );
        assert_eq!(ArchiveFormat::from_suffix("zip")?, ArchiveFormat::Zip);
        assert!(ArchiveFormat::from_suffix("rar").is_err());

        Ok(())
    }

    #[test]
    fn unpack_tar_gz() -> Result<()> {
        let td = tempfile::tempdir()?;
        let archive = td.path().join("demo-1.0.tar.gz");
        write_tar_gz(&archive, "demo-1.0")?;

        let build_dir = td.path().join("BUILD");
        std::fs::create_dir_all(build_dir.join("demo-1.0"))?;
        std::fs::write(build_dir.join("demo-1.0").join("stale"), b"")?;

        let root = unpack_sdist(
            &archive,
            ArchiveFormat::from_suffix("tar.gz")?,
            &build_dir,
            "demo-1.0",
        )?;

        assert_eq!(root, build_dir.join("demo-1.0"));
        assert!(root.join("setup.py").exists());
        assert_eq!(std::fs::read(root.join("README"))?, b"hi\n");
        assert!(!root.join("stale").exists());

        Ok(())
    }

    #[test]
    fn unpack_renamed_root() -> Result<()> {
        let td = tempfile::tempdir()?;
        let archive = td.path().join("Demo-Pkg-1.0.tar.gz");
        write_tar_gz(&archive, "demo_pkg-1.0")?;

        let build_dir = td.path().join("BUILD");
        std::fs::create_dir_all(build_dir.join("unrelated"))?;

        let root = unpack_sdist(
            &archive,
            ArchiveFormat::Tar(CompressionFormat::Gzip),
            &build_dir,
            "Demo-Pkg-1.0",
        )?;

        assert_eq!(root, build_dir.join("demo_pkg-1.0"));
        assert!(build_dir.join("unrelated").is_dir());

        Ok(())
    }

    #[test]
    fn unpack_renamed_root_again() -> Result<()> {
        let td = tempfile::tempdir()?;
        let archive = td.path().join("Demo-Pkg-1.0.tar.gz");
        write_tar_gz(&archive, "demo_pkg-1.0")?;

        let build_dir = td.path().join("BUILD");
        let format = ArchiveFormat::Tar(CompressionFormat::Gzip);

        let first = unpack_sdist(&archive, format, &build_dir, "Demo-Pkg-1.0")?;
        std::fs::write(first.join("stale"), b"")?;

        let second = unpack_sdist(&archive, format, &build_dir, "Demo-Pkg-1.0")?;
        assert_eq!(second, first);
        assert!(second.join("setup.py").exists());
        assert!(!second.join("stale").exists());

        Ok(())
    }

    #[test]
    fn top_level_names() -> Result<()> {
        let td = tempfile::tempdir()?;
        let archive = td.path().join("demo-1.0.tar.gz");
        write_tar_gz(&archive, "demo-1.0")?;

        assert_eq!(
            archive_top_level_names(&archive, ArchiveFormat::Tar(CompressionFormat::Gzip))?,
            ["demo-1.0".to_string()].into_iter().collect()
        );

        Ok(())
    }

    #[test]
    fn unpack_zip() -> Result<()> {
        let td = tempfile::tempdir()?;
        let archive = td.path().join("demo-1.0.zip");

        let mut writer = zip::ZipWriter::new(std::fs::File::create(&archive)?);
        writer.start_file("demo-1.0/setup.py", zip::write::FileOptions::default())?;
        writer.write_all(b"from distutils.core import setup\n")?;
        writer.finish()?;

        let build_dir = td.path().join("BUILD");
        let root = unpack_sdist(&archive, ArchiveFormat::Zip, &build_dir, "demo-1.0")?;

        assert!(root.join("setup.py").exists());

        Ok(())
    }
}
