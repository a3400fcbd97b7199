use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not read session file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write session file `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("session file `{path}` is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// A signed-in identity as far as the client knows. The backend decides
/// whether the token is still good.
#[derive(Debug)]
pub struct Session {
    pub token: SecretString,
    pub username: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, username: Option<String>) -> Self {
        Self { token: SecretString::from(token.into()), username, signed_in_at: Utc::now() }
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            token: SecretString::from(self.token.expose_secret().to_owned()),
            username: self.username.clone(),
            signed_in_at: self.signed_in_at,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, SessionError>;
    async fn save(&self, session: &Session) -> Result<(), SessionError>;
    async fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    access_token: String,
    #[serde(default)]
    username: Option<String>,
    signed_in_at: DateTime<Utc>,
}

/// Keeps the token in a small JSON file, readable only by the owner on unix.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionError::Read { path: self.path.clone(), source }),
        };

        let file: SessionFile = serde_json::from_str(&raw).map_err(|error| {
            SessionError::Corrupt { path: self.path.clone(), message: error.to_string() }
        })?;
        if file.access_token.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(Session {
            token: SecretString::from(file.access_token),
            username: file.username,
            signed_in_at: file.signed_in_at,
        }))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SessionError::Write { path: parent.to_path_buf(), source })?;
        }

        let file = SessionFile {
            access_token: session.token.expose_secret().to_owned(),
            username: session.username.clone(),
            signed_in_at: session.signed_in_at,
        };
        let payload = serde_json::to_vec_pretty(&file).map_err(|error| {
            SessionError::Corrupt { path: self.path.clone(), message: error.to_string() }
        })?;

        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|source| SessionError::Write { path: self.path.clone(), source })?;
        restrict_permissions(&self.path).await?;

        debug!(event_name = "session.saved", path = %self.path.display(), "session stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(
                    event_name = "session.cleared",
                    path = %self.path.display(),
                    "session removed"
                );
                Ok(())
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Write { path: self.path.clone(), source }),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|source| SessionError::Write { path: path.to_path_buf(), source })
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { session: RwLock::new(Some(Session::new(token, None))) }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().await = None;
        Ok(())
    }
}
