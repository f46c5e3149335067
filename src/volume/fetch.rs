//! How each initialized volume gets its content

use crate::volume::bind::{source_shape, split_git_ref, SourceKind, SourceShape};
use crate::volume::{InitVolume, INIT_VOLUME_FILENAME};
use crate::{HyperError, Result};

/// Kind of work needed for one volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    /// Run this command inside the helper container
    Exec(Vec<String>),
    /// Upload from this machine over the transfer channel
    Upload,
}

/// Resolved fetch task for one volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub volume: InitVolume,
    pub shape: SourceShape,
    pub kind: FetchKind,
    /// Path inside the helper the content is written to
    pub target: String,
}

impl FetchPlan {
    /// Classify the volume's source and build its command or upload target
    pub fn new(volume: &InitVolume) -> Result<Self> {
        let kind = SourceKind::detect(&volume.source);
        let shape = source_shape(kind, &volume.source)?;
        let mount = volume.helper_path();

        let (kind, target) = match kind {
            SourceKind::Git => (FetchKind::Exec(git_clone(&volume.source, &mount)), mount),
            SourceKind::Http => (
                FetchKind::Exec(http_download(&volume.source, &mount, shape)),
                mount,
            ),
            SourceKind::Local => {
                let target = match shape {
                    SourceShape::File => format!("{}/{}", mount, INIT_VOLUME_FILENAME),
                    SourceShape::Directory => mount,
                };
                (FetchKind::Upload, target)
            }
            SourceKind::Ordinary => {
                return Err(HyperError::UnsupportedSource(volume.source.clone()));
            }
        };

        Ok(Self {
            volume: volume.clone(),
            shape,
            kind,
            target,
        })
    }

    pub fn needs_upload(&self) -> bool {
        self.kind == FetchKind::Upload
    }
}

fn git_clone(source: &str, mount: &str) -> Vec<String> {
    let (repo, reference) = split_git_ref(source);
    let mut cmd = vec!["git".to_string(), "clone".to_string()];
    if let Some(reference) = reference {
        cmd.push("--branch".to_string());
        cmd.push(reference.to_string());
    }
    cmd.push(repo.to_string());
    cmd.push(mount.to_string());
    cmd
}

fn http_download(source: &str, mount: &str, shape: SourceShape) -> Vec<String> {
    let mut cmd = vec![
        "wget".to_string(),
        "--no-check-certificate".to_string(),
        "--tries=5".to_string(),
    ];
    match shape {
        SourceShape::File => {
            cmd.push(source.to_string());
            cmd.push(format!(
                "--output-document={}/{}",
                mount, INIT_VOLUME_FILENAME
            ));
        }
        SourceShape::Directory => {
            let parts = source.split('/').count();
            cmd.push("--mirror".to_string());
            cmd.push("--no-host-directories".to_string());
            cmd.push(format!("--cut-dirs={}", parts));
            cmd.push(source.to_string());
            cmd.push(format!("--directory-prefix={}", mount));
        }
    }
    cmd
}
