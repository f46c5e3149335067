//! Out-of-band upload of local sources into the helper container

use crate::volume::bind::SourceShape;
use crate::{HyperError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use suppaftp::types::FileType;
use suppaftp::FtpStream;

/// Port of the helper image's FTP server
const FTP_PORT: u16 = 21;

/// Where and how to reach the helper container's upload server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    pub address: String,
    pub user: String,
    pub password: String,
}

/// Upload channel into a running helper container
#[async_trait]
pub trait TransferChannel: Send + Sync {
    /// Upload `source` to `target` inside the helper. For files `target` is
    /// the full remote file path; for directories it is the directory the
    /// tree's contents land in.
    async fn upload(
        &self,
        session: &TransferSession,
        source: &Path,
        target: &str,
        shape: SourceShape,
    ) -> Result<()>;
}

/// FTP implementation of [`TransferChannel`]
#[derive(Debug, Default, Clone)]
pub struct FtpChannel;

#[async_trait]
impl TransferChannel for FtpChannel {
    async fn upload(
        &self,
        session: &TransferSession,
        source: &Path,
        target: &str,
        shape: SourceShape,
    ) -> Result<()> {
        let session = session.clone();
        let source = source.to_path_buf();
        let target = target.to_string();
        let source_path = source.display().to_string();

        let result =
            tokio::task::spawn_blocking(move || ftp_upload(&session, &source, &target, shape))
                .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(HyperError::Upload {
                source_path,
                message: e.to_string(),
            }),
            Err(e) => Err(HyperError::Upload {
                source_path,
                message: format!("upload task failed: {}", e),
            }),
        }
    }
}

fn server_address(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, FTP_PORT)
    }
}

/// Error raised inside the blocking upload
#[derive(Debug, thiserror::Error)]
enum FtpUploadError {
    #[error(transparent)]
    Ftp(#[from] suppaftp::FtpError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid upload target: {0}")]
    Target(String),
}

fn ftp_upload(
    session: &TransferSession,
    source: &Path,
    target: &str,
    shape: SourceShape,
) -> std::result::Result<(), FtpUploadError> {
    let mut ftp = FtpStream::connect(server_address(&session.address))?;
    ftp.login(session.user.as_str(), session.password.as_str())?;
    ftp.transfer_type(FileType::Binary)?;

    match shape {
        SourceShape::File => {
            let (dir, name) = target
                .rsplit_once('/')
                .filter(|(_, name)| !name.is_empty())
                .ok_or_else(|| FtpUploadError::Target(target.to_string()))?;
            ftp.cwd(if dir.is_empty() { "/" } else { dir })?;
            let mut file = fs::File::open(source)?;
            ftp.put_file(name, &mut file)?;
        }
        SourceShape::Directory => {
            ftp.cwd(target)?;
            upload_tree(&mut ftp, source)?;
        }
    }

    ftp.quit()?;
    Ok(())
}

/// Upload the contents of `dir` into the current remote directory
fn upload_tree(ftp: &mut FtpStream, dir: &Path) -> std::result::Result<(), FtpUploadError> {
    for path in sorted_entries(dir)? {
        let metadata = fs::symlink_metadata(&path)?;
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                tracing::warn!(path = %path.display(), "skipping entry with non UTF-8 name");
                continue;
            }
        };

        if metadata.is_dir() {
            // may already exist when reloading a volume
            if let Err(e) = ftp.mkdir(name.as_str()) {
                tracing::debug!(%name, error = %e, "mkdir failed, assuming directory exists");
            }
            ftp.cwd(name.as_str())?;
            upload_tree(ftp, &path)?;
            ftp.cdup()?;
        } else if metadata.is_file() {
            let mut file = fs::File::open(&path)?;
            ftp.put_file(name.as_str(), &mut file)?;
        } else {
            tracing::warn!(path = %path.display(), "skipping special file");
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
