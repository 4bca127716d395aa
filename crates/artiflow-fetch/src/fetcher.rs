use std::io::Seek;
use std::path::{Path, PathBuf};

use artiflow_archive::{ArchiveFormat, detect_from_reader};
use artiflow_fs::{MultiFileReader, TransferContext};
use artiflow_verify::{Hasher, Sha1Hasher, VerificationError, VerifiedReader};
use futures_util::StreamExt;
use futures_util::future::try_join_all;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::http::{Body, BoxStream, HttpClient, Method};
use crate::options::FetchOptions;
use crate::segment::{ChunkPlan, plan_chunks};

const COPY_BUFFER: usize = 64 * 1024;

/// One remote file to bring to `dest`.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub url:     String,
    pub dest:    PathBuf,
    pub size:    u64,
    pub sha1:    Option<String>,
    pub explode: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url:     url.into(),
            dest:    dest.into(),
            size:    0,
            sha1:    None,
            explode: false,
        }
    }

    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }

    fn file_name(&self) -> String {
        self.dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string())
    }

    fn dest_dir(&self) -> PathBuf {
        self.dest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn verify(&self, actual: &str) -> Result<()> {
        match &self.sha1 {
            Some(expected) if !expected.eq_ignore_ascii_case(actual) => Err(Error::ChecksumMismatch {
                path:     self.dest.clone(),
                expected: expected.clone(),
                actual:   actual.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadMode {
    Bulk,
    Ranged { chunks: u32 },
}

/// Downloads files either as one stream or as parallel byte ranges merged in
/// order, scratch space coming from the shared [`TransferContext`].
pub struct Fetcher<'a, C> {
    client:  &'a C,
    ctx:     &'a TransferContext,
    options: FetchOptions,
}

impl<'a, C: HttpClient> Fetcher<'a, C> {
    pub fn new(client: &'a C, ctx: &'a TransferContext) -> Self {
        Self {
            client,
            ctx,
            options: FetchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions { &self.options }

    pub async fn fetch(&self, request: &DownloadRequest) -> Result<DownloadMode> {
        if request.size > 0 && self.options.wants_split(request.size) && self.accepts_ranges(&request.url).await? {
            let chunks = self.fetch_ranged(request).await?;
            Ok(DownloadMode::Ranged { chunks })
        } else {
            self.fetch_whole(request).await?;
            Ok(DownloadMode::Bulk)
        }
    }

    pub async fn accepts_ranges(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .send(Method::Head, url, &self.options.headers, Body::Empty)
            .await?
            .expect_status(url, &[200])?;
        Ok(response
            .header("Accept-Ranges")
            .is_some_and(|v| v.eq_ignore_ascii_case("bytes")))
    }

    /// Single-stream download, hashed while it is written.
    pub async fn fetch_whole(&self, request: &DownloadRequest) -> Result<()> {
        let response = self
            .client
            .stream(&request.url, &self.options.headers)
            .await?
            .expect_status(&request.url, &[200])
            .await?;
        prepare_dest(&request.dest)?;

        let mut hasher = Sha1Hasher::new();
        write_stream(response.body, &request.dest, Some(&mut hasher)).await?;
        request.verify(&hasher.finalize_hex())?;

        if request.explode {
            if let Some(format) = ArchiveFormat::from_file_name(&request.file_name()) {
                explode_file(request.dest.clone(), request.dest_dir(), format).await?;
            }
        }
        Ok(())
    }

    /// Ranged download; returns the number of chunks used.
    pub async fn fetch_ranged(&self, request: &DownloadRequest) -> Result<u32> {
        let plan = plan_chunks(request.size, self.options.split_count)?;
        let file_name = request.file_name();
        let scratch = self.ctx.scratch_dir(&file_name)?;

        let downloads = plan.iter().map(|chunk| {
            self.fetch_chunk(&request.url, *chunk, scratch.chunk_path(&file_name, chunk.index))
        });
        let chunk_paths = try_join_all(downloads).await?;
        prepare_dest(&request.dest)?;

        if request.explode
            && explode_chunks(chunk_paths.clone(), request.clone(), file_name).await?
        {
            return Ok(plan.len() as u32);
        }

        let actual = merge_chunks(&chunk_paths, &request.dest).await?;
        request.verify(&actual)?;
        tracing::debug!(url = %request.url, chunks = plan.len(), "merged ranged download");
        Ok(plan.len() as u32)
    }

    async fn fetch_chunk(&self, url: &str, chunk: ChunkPlan, path: PathBuf) -> Result<PathBuf> {
        let mut headers = self.options.headers.clone();
        headers.push(("Range".to_string(), chunk.range_header()));

        let response = self
            .client
            .stream(url, &headers)
            .await?
            .expect_status(url, &[206])
            .await?;
        let written = write_stream(response.body, &path, None).await?;
        if written != chunk.len() {
            return Err(Error::InvalidState(format!(
                "chunk {} of {url}: expected {} bytes, received {written}",
                chunk.index,
                chunk.len()
            )));
        }
        tracing::trace!(url, chunk = chunk.index, bytes = written, "chunk downloaded");
        Ok(path)
    }
}

fn prepare_dest(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        artiflow_fs::create_dir_all(parent)?;
    }
    artiflow_fs::remove_if_symlink(dest)?;
    Ok(())
}

async fn write_stream(
    mut body: BoxStream<'static, Result<bytes::Bytes>>,
    path: &Path,
    mut hasher: Option<&mut Sha1Hasher>,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if let Some(hasher) = hasher.as_deref_mut() {
            hasher.update(&chunk);
        }
        file.write_all(&chunk).await.map_err(|e| Error::io(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| Error::io(path, e))?;
    Ok(written)
}

/// Concatenates chunk files into `dest` in index order; returns the sha1.
async fn merge_chunks(paths: &[PathBuf], dest: &Path) -> Result<String> {
    let mut out = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::io(dest, e))?;
    let mut hasher = Sha1Hasher::new();
    let mut buf = vec![0u8; COPY_BUFFER];

    for path in paths {
        let mut chunk = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        loop {
            let n = chunk.read(&mut buf).await.map_err(|e| Error::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).await.map_err(|e| Error::io(dest, e))?;
        }
    }
    out.flush().await.map_err(|e| Error::io(dest, e))?;
    Ok(hasher.finalize_hex())
}

/// Extracts straight from the chunk files. Returns `false` when the content
/// is not a recognised archive, in which case the caller merges instead.
async fn explode_chunks(paths: Vec<PathBuf>, request: DownloadRequest, file_name: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || -> Result<bool> {
        let mut reader = MultiFileReader::open(&paths)?;
        let format = match ArchiveFormat::from_file_name(&file_name) {
            Some(format) => Some(format),
            None => detect_from_reader(&mut reader).map_err(|e| Error::io(&request.dest, e))?,
        };
        let Some(format) = format else {
            return Ok(false);
        };

        if let Some(expected) = &request.sha1 {
            VerifiedReader::new(&mut reader, Sha1Hasher::new())
                .finish(expected)
                .map_err(|e| verification_error(&request.dest, e))?;
            reader.rewind().map_err(|e| Error::io(&request.dest, e))?;
        }

        let report = artiflow_archive::extract(format, reader, &request.dest_dir())?;
        tracing::debug!(file = %file_name, entries = report.entry_count, "exploded ranged download");
        Ok(true)
    })
    .await
    .map_err(|e| Error::Join(e.to_string()))?
}

async fn explode_file(archive: PathBuf, dest_dir: PathBuf, format: ArchiveFormat) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive).map_err(|e| Error::io(&archive, e))?;
        let report = artiflow_archive::extract(format, file, &dest_dir)?;
        artiflow_fs::remove_file_if_exists(&archive)?;
        tracing::debug!(archive = %archive.display(), entries = report.entry_count, "exploded download");
        Ok(())
    })
    .await
    .map_err(|e| Error::Join(e.to_string()))?
}

fn verification_error(path: &Path, error: VerificationError) -> Error {
    match error {
        VerificationError::Mismatch { expected, actual } => Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        },
        VerificationError::Io(e) => Error::io(path, e),
    }
}
