//! Storage for uploaded audio files.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rand_distr::Alphanumeric;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Only MPEG audio is accepted.
pub const ACCEPTED_AUDIO_MIME: &str = "audio/mpeg";

/// Url path segment under which stored audio files are served.
pub const AUDIO_URL_SEGMENT: &str = "audio";

/// Attempts at finding a free file name before giving up.
const MAX_NAME_ATTEMPTS: usize = 4;

#[derive(Debug, Error)]
pub enum AudioStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Audio file not found: {0}")]
    NotFound(String),
}

/// Reference to a stored audio file, as saved on a post (`audio/<file name>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AudioRef(pub String);

impl AudioRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Stores the bytes and returns the reference to save on the post.
    async fn store(&self, bytes: Vec<u8>, suggested_name: &str)
        -> Result<AudioRef, AudioStorageError>;

    async fn release(&self, audio_ref: &AudioRef) -> Result<(), AudioStorageError>;
}

/// Releases the given audio files off the response path, logging the outcome.
pub fn release_in_background(storage: Arc<dyn AudioStorage>, audio_refs: Vec<AudioRef>) {
    if audio_refs.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for audio_ref in audio_refs {
            match storage.release(&audio_ref).await {
                Ok(()) => debug!("Released audio {}", audio_ref),
                Err(err) => warn!("Failed to release audio {}: {}", audio_ref, err),
            }
        }
    });
}

/// Keeps audio files flat in one directory on the local filesystem.
pub struct LocalAudioStorage {
    dir: PathBuf,
}

impl LocalAudioStorage {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Filesystem path of a stored audio file.
    pub fn resolve(&self, audio_ref: &AudioRef) -> Result<PathBuf, AudioStorageError> {
        let file_name = audio_ref
            .as_str()
            .strip_prefix(AUDIO_URL_SEGMENT)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AudioStorageError::InvalidFilename(audio_ref.to_string()))?;
        if sanitize_filename(file_name)? != file_name {
            return Err(AudioStorageError::InvalidFilename(audio_ref.to_string()));
        }
        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl AudioStorage for LocalAudioStorage {
    async fn store(
        &self,
        bytes: Vec<u8>,
        suggested_name: &str,
    ) -> Result<AudioRef, AudioStorageError> {
        match infer::get(&bytes) {
            Some(kind) if kind.mime_type() == ACCEPTED_AUDIO_MIME => {}
            Some(kind) => {
                return Err(AudioStorageError::UnsupportedType(
                    kind.mime_type().to_string(),
                ))
            }
            None => return Err(AudioStorageError::UnsupportedType("unknown".to_string())),
        }

        let timestamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace(':', "-");
        let sanitized = sanitize_filename(suggested_name)?;

        let mut attempt = 0;
        let (mut file, file_name, path) = loop {
            // Same name within the same millisecond gets a random infix.
            let file_name = if attempt == 0 {
                format!("{}-{}", timestamp, sanitized)
            } else {
                format!("{}-{}-{}", timestamp, random_infix(), sanitized)
            };
            let path = self.dir.join(&file_name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (file, file_name, path),
                Err(err)
                    if err.kind() == std::io::ErrorKind::AlreadyExists
                        && attempt + 1 < MAX_NAME_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };
        write_or_discard(&mut file, &path, &bytes).await?;

        debug!("Stored {} bytes of audio at {:?}", bytes.len(), path);
        Ok(AudioRef(format!("{}/{}", AUDIO_URL_SEGMENT, file_name)))
    }

    async fn release(&self, audio_ref: &AudioRef) -> Result<(), AudioStorageError> {
        let path = self.resolve(audio_ref)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AudioStorageError::NotFound(audio_ref.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes `bytes` through `writer`, removing the file at `path` when the write
/// fails so no partial upload is left behind.
async fn write_or_discard<W>(
    writer: &mut W,
    path: &Path,
    bytes: &[u8],
) -> Result<(), AudioStorageError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;
    if let Err(err) = written {
        if let Err(remove_err) = fs::remove_file(path).await {
            warn!("Failed to remove partial audio {:?}: {}", path, remove_err);
        }
        return Err(err.into());
    }
    Ok(())
}

fn random_infix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

/// Keeps only the final path component and replaces characters that do not
/// belong in a served file name.
fn sanitize_filename(filename: &str) -> Result<String, AudioStorageError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AudioStorageError::InvalidFilename(filename.to_string()))?;

    if name.contains('\0') || name.starts_with('.') {
        return Err(AudioStorageError::InvalidFilename(filename.to_string()));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '%' => '_',
            c if c.is_whitespace() => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() {
        return Err(AudioStorageError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized)
}
