//! Bind specification parsing and source classification

use crate::{HyperError, Result};
use std::path::Path;

/// Where a bind's source comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `git://` repository
    Git,
    /// `http://` or `https://` URL
    Http,
    /// Absolute local path, uploaded from this machine
    Local,
    /// Anything else; passed to the engine untouched
    Ordinary,
}

/// Whether a source populates a single file or a directory tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    File,
    Directory,
}

/// One `SOURCE:DEST` entry from `-v`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindSpec {
    pub source: String,
    pub destination: String,
    pub kind: SourceKind,
}

impl BindSpec {
    /// Parse a bind string. Special binds split at the last colon; everything
    /// else is `Ordinary` and keeps the raw string as its source.
    pub fn parse(bind: &str) -> Self {
        match parse_special_bind(bind) {
            Some((source, destination)) => Self {
                kind: SourceKind::detect(source),
                source: source.to_string(),
                destination: destination.to_string(),
            },
            None => Self {
                source: bind.to_string(),
                destination: bind
                    .split_once(':')
                    .map(|(_, rest)| rest.to_string())
                    .unwrap_or_default(),
                kind: SourceKind::Ordinary,
            },
        }
    }

    /// Check if this bind needs a volume initialized from its source
    pub fn is_special(&self) -> bool {
        self.kind != SourceKind::Ordinary
    }

    /// Secondary classification, see [`source_shape`]
    pub fn shape(&self) -> Result<SourceShape> {
        source_shape(self.kind, &self.source)
    }
}

impl SourceKind {
    /// Classify a bare source (no destination part)
    pub fn detect(source: &str) -> Self {
        if source.starts_with("git://") {
            SourceKind::Git
        } else if source.starts_with("http://") || source.starts_with("https://") {
            SourceKind::Http
        } else if source.starts_with('/') || has_drive_letter(source) {
            SourceKind::Local
        } else {
            SourceKind::Ordinary
        }
    }
}

/// Split a protocol-qualified or absolute-local bind into `(source, dest)`.
/// Returns `None` for binds that are not special.
pub fn parse_special_bind(bind: &str) -> Option<(&str, &str)> {
    let colons = bind.matches(':').count();
    let qualifies = if bind.starts_with("git://")
        || bind.starts_with("http://")
        || bind.starts_with("https://")
    {
        // one colon belongs to the scheme
        colons >= 2
    } else if bind.starts_with('/') {
        colons >= 1
    } else if has_drive_letter(bind) {
        colons >= 2
    } else {
        false
    };
    if !qualifies {
        return None;
    }

    let pos = bind.rfind(':')?;
    if pos + 1 >= bind.len() {
        return None;
    }
    Some((&bind[..pos], &bind[pos + 1..]))
}

/// Decide whether `source` populates a file or a directory.
///
/// Local sources are `stat`ed, so a missing path fails here.
pub fn source_shape(kind: SourceKind, source: &str) -> Result<SourceShape> {
    match kind {
        SourceKind::Git => Ok(SourceShape::Directory),
        SourceKind::Http => Ok(http_shape(source)),
        SourceKind::Local => local_shape(Path::new(source)),
        SourceKind::Ordinary => Err(HyperError::UnsupportedSource(source.to_string())),
    }
}

fn http_shape(source: &str) -> SourceShape {
    let parts: Vec<&str> = source.split(':').collect();
    let count = parts.len();
    if source.ends_with('/')
        || source.ends_with(".git")
        || (count >= 3 && parts[count - 2].ends_with(".git"))
    {
        SourceShape::Directory
    } else {
        SourceShape::File
    }
}

fn local_shape(path: &Path) -> Result<SourceShape> {
    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        Ok(SourceShape::Directory)
    } else if metadata.is_file() {
        Ok(SourceShape::File)
    } else {
        Err(HyperError::SpecialFile(path.display().to_string()))
    }
}

/// Split `<repo>.git:<ref>` into the repository URL and the ref to check out
pub fn split_git_ref(source: &str) -> (&str, Option<&str>) {
    if let Some((repo, reference)) = source.rsplit_once(':') {
        if repo.contains("://") && repo.ends_with(".git") && !reference.is_empty() {
            return (repo, Some(reference));
        }
    }
    (source, None)
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    cfg!(windows) && bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
