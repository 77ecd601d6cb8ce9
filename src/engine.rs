use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use std::{
    fs,
    fs::{File, OpenOptions, TryLockError},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

use crate::error::{Result, TickerError};

// GENERALISED FUNCTIONS

pub const LOCK_FILE: &str = ".tickerdb.lock";

// status + body, nothing parsed yet
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Seam between the provider code and the network; tests swap in canned responses.
pub trait HttpTransport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        query: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<RawResponse>>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| TickerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        query: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<RawResponse>> {
        async move {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(transport_error)?;

            // status has to be read before the body consumes the response
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(transport_error)?;
            debug!("GET {url} -> {status} ({} bytes)", body.len());
            Ok(RawResponse { status, body })
        }
        .boxed()
    }
}

// the query string carries the api key, so the url never goes into the message
fn transport_error(e: reqwest::Error) -> TickerError {
    if e.is_builder() {
        return TickerError::Config(e.without_url().to_string());
    }
    let kind = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "transport failure"
    };
    TickerError::TransientNetwork(format!("{kind}: {}", e.without_url()))
}

// ATOMIC FILE OUTPUT

/// A fully written temp file sitting next to its destination, waiting to be renamed.
pub struct StagedFile {
    temp: NamedTempFile,
    dest: PathBuf,
}

impl StagedFile {
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    // rename is atomic within one filesystem, hence staging in the destination dir
    pub fn commit(self) -> Result<PathBuf> {
        self.temp.persist(&self.dest).map_err(|e| e.error)?;
        Ok(self.dest)
    }
}

pub fn stage_file(dest: &Path, contents: &[u8]) -> Result<StagedFile> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;

    // tempfile creates 0600; consumers need to read the artifact
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    Ok(StagedFile {
        temp,
        dest: dest.to_path_buf(),
    })
}

// RUN LOCK

/// OS advisory lock on a marker file in the output directory.
///
/// The kernel drops the lock when the holding process exits, however it exits, so a
/// file left behind by a killed run does not block the next one. The file itself is
/// never removed; only the lock on it matters.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(TickerError::Locked(path)),
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        // pid is informational only; a stale one from a dead run is overwritten here
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
