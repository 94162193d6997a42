// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Locating and downloading source distributions from a Python package index. */

use {
    anyhow::{anyhow, Context, Result},
    log::{debug, info, warn},
    serde::Deserialize,
    sha2::Digest,
    std::{collections::BTreeMap, io::Read, path::Path},
    url::Url,
};

/// Location of source archives not listed in index metadata.
pub const SOURCE_FALLBACK_BASE: &str = "https://files.pythonhosted.org/packages/source";

/// Obtain an HTTP client, taking proxy environment variables into account.
pub fn get_http_client() -> reqwest::Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::ClientBuilder::new();

    for (key, value) in std::env::vars() {
        let key = key.to_lowercase();

        if let Some(scheme) = key.strip_suffix("_proxy") {
            let url = match Url::parse(&value) {
                Ok(url) => url,
                Err(_) => continue,
            };

            let proxy = match scheme {
                "http" => reqwest::Proxy::http(url.as_str()),
                "https" => reqwest::Proxy::https(url.as_str()),
                "all" => reqwest::Proxy::all(url.as_str()),
                _ => continue,
            };

            if let Ok(proxy) = proxy {
                builder = builder.proxy(proxy);
            }
        }
    }

    builder.build()
}

/// Digests of a release file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct FileDigests {
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

/// A file of a release in the index JSON API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ReleaseFile {
    pub packagetype: String,
    pub url: String,
    #[serde(default)]
    pub md5_digest: Option<String>,
    #[serde(default)]
    pub digests: FileDigests,
}

/// The document served by `/pypi/<name>/json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
}

impl ProjectDocument {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("parsing project JSON")
    }

    /// Find the source archive of a release.
    ///
    /// Binary distributions are ignored. The file URL must end with `filename`.
    pub fn find_source_file(&self, version: &str, filename: &str) -> Option<&ReleaseFile> {
        self.releases
            .get(version)?
            .iter()
            .filter(|f| !f.packagetype.contains("bdist"))
            .find(|f| f.url.ends_with(filename))
    }
}

/// A source archive to fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceArchive {
    /// File name of the archive, e.g. `foo-1.0.tar.gz`.
    pub filename: String,
    pub url: String,
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

impl SourceArchive {
    /// Construct an instance pointing at the canonical location of a source archive.
    ///
    /// No digests are known for it.
    pub fn fallback(name: &str, filename: &str) -> Self {
        let first = name.chars().next().map(String::from).unwrap_or_default();

        Self {
            filename: filename.to_string(),
            url: format!("{}/{}/{}/{}", SOURCE_FALLBACK_BASE, first, name, filename),
            md5: None,
            sha256: None,
        }
    }

    /// Value of the `Source0` tag.
    ///
    /// The MD5 digest is attached as a URL fragment when known.
    pub fn source0(&self) -> String {
        match &self.md5 {
            Some(md5) => format!("{}#{}", self.url, md5),
            None => self.url.clone(),
        }
    }
}

/// The file name of a source archive.
pub fn sdist_filename(name: &str, version: &str, suffix: &str) -> String {
    format!("{}-{}.{}", name, version, suffix.trim_start_matches('.'))
}

/// A client of the JSON API of a Python package index.
pub struct PackageIndex {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl PackageIndex {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: get_http_client().context("constructing HTTP client")?,
        })
    }

    fn project_url(&self, name: &str) -> Result<Url> {
        let url = format!("{}/pypi/{}/json", self.base_url, name);

        Url::parse(&url).with_context(|| format!("parsing {}", url))
    }

    /// Fetch the JSON document describing a project.
    pub fn fetch_project(&self, name: &str) -> Result<ProjectDocument> {
        let url = self.project_url(name)?;
        debug!("fetching {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("fetching {}", url))?
            .error_for_status()?;

        let mut data = vec![];
        response.read_to_end(&mut data)?;

        ProjectDocument::from_json(&data)
    }

    /// Resolve the source archive of a release.
    ///
    /// Any failure to obtain or interpret index metadata results in the
    /// fallback location without digests.
    pub fn source_archive(&self, name: &str, version: &str, suffix: &str) -> SourceArchive {
        let filename = sdist_filename(name, version, suffix);

        let found = match self.fetch_project(name) {
            Ok(project) => project.find_source_file(version, &filename).cloned(),
            Err(e) => {
                debug!("package index lookup of {} failed: {:#}", name, e);
                None
            }
        };

        match found {
            Some(file) => SourceArchive {
                filename,
                url: file.url,
                md5: file.md5_digest.or(file.digests.md5),
                sha256: file.digests.sha256,
            },
            None => {
                info!("{} {} not found in package index metadata", name, version);
                SourceArchive::fallback(name, &filename)
            }
        }
    }

    /// Fetch a source archive, verifying its SHA-256 when known.
    pub fn download(&self, archive: &SourceArchive) -> Result<Vec<u8>> {
        warn!("downloading {}", archive.url);

        let url = Url::parse(&archive.url).with_context(|| format!("parsing {}", archive.url))?;

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("fetching {}", archive.url))?
            .error_for_status()?;

        let mut data: Vec<u8> = Vec::new();
        response.read_to_end(&mut data)?;

        if let Some(expected) = &archive.sha256 {
            verify_sha256(&data, expected)
                .with_context(|| format!("verifying {}", archive.filename))?;
        }

        Ok(data)
    }

    /// Ensure a source archive is present in a directory.
    ///
    /// Existing non-empty files are reused.
    pub fn ensure_downloaded(&self, archive: &SourceArchive, dest_dir: &Path) -> Result<()> {
        let path = dest_dir.join(&archive.filename);

        if is_nonempty_file(&path) {
            info!("reusing {}", path.display());
            return Ok(());
        }

        let data = self.download(archive)?;

        std::fs::create_dir_all(dest_dir)
            .with_context(|| format!("creating {}", dest_dir.display()))?;
        std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() != 0)
        .unwrap_or(false)
}

/// Verify the SHA-256 of data against a hex digest.
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<()> {
    let mut hasher = sha2::Sha256::new();
    hasher.update(data);

    let actual = hasher.finalize().to_vec();
    let expected = hex::decode(expected.trim()).context("decoding expected digest")?;

    if actual == expected {
        Ok(())
    } else {
        Err(anyhow!(
            "hash mismatch: expected {}, got {}",
            hex::encode(expected),
            hex::encode(actual)
        ))
    }
}
