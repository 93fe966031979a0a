use std::io;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::fs;

use crate::dao::models::SessionEntity;
use crate::dao::session_store::SessionStore;
use crate::dao::storage::{StorageError, StorageResult};

/// Errors raised by the filesystem backend.
#[derive(Debug, Error)]
pub enum FsDaoError {
    /// The snapshot directory could not be created or probed.
    #[error("cannot prepare snapshot directory {path}")]
    PrepareDir {
        /// Directory the store was pointed at.
        path: String,
        /// Underlying io failure.
        #[source]
        source: io::Error,
    },
    /// Writing a snapshot blob failed.
    #[error("cannot write snapshot for room {room_key}")]
    Save {
        /// Storage key of the room.
        room_key: String,
        /// Underlying io failure.
        #[source]
        source: io::Error,
    },
    /// Reading a snapshot blob failed.
    #[error("cannot read snapshot for room {room_key}")]
    Load {
        /// Storage key of the room.
        room_key: String,
        /// Underlying io failure.
        #[source]
        source: io::Error,
    },
    /// Deleting a snapshot blob failed.
    #[error("cannot delete snapshot for room {room_key}")]
    Delete {
        /// Storage key of the room.
        room_key: String,
        /// Underlying io failure.
        #[source]
        source: io::Error,
    },
    /// A snapshot could not be serialized before writing.
    #[error("cannot encode snapshot for room {room_key}")]
    Encode {
        /// Storage key of the room.
        room_key: String,
        /// Underlying serializer failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored blob is not valid snapshot JSON.
    #[error("cannot decode snapshot for room {room_key}")]
    Decode {
        /// Storage key of the room.
        room_key: String,
        /// Underlying parser failure.
        #[source]
        source: serde_json::Error,
    },
}

impl From<FsDaoError> for StorageError {
    fn from(err: FsDaoError) -> Self {
        match err {
            FsDaoError::Decode { .. } => StorageError::corrupt(err.to_string(), err),
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}

/// Filesystem-backed [`SessionStore`], one pretty-printed JSON blob per room.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, FsDaoError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| FsDaoError::PrepareDir {
                path: dir.display().to_string(),
                source,
            })?;
        Ok(Self { dir })
    }

    /// Directory the snapshots live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, room_key: &str) -> PathBuf {
        self.dir.join(format!("{room_key}.json"))
    }

    async fn save(&self, room_key: String, session: SessionEntity) -> Result<(), FsDaoError> {
        let encoded =
            serde_json::to_vec_pretty(&session).map_err(|source| FsDaoError::Encode {
                room_key: room_key.clone(),
                source,
            })?;
        fs::write(self.blob_path(&room_key), encoded)
            .await
            .map_err(|source| FsDaoError::Save { room_key, source })
    }

    async fn load(&self, room_key: String) -> Result<Option<SessionEntity>, FsDaoError> {
        let bytes = match fs::read(self.blob_path(&room_key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FsDaoError::Load { room_key, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FsDaoError::Decode { room_key, source })
    }

    async fn delete(&self, room_key: String) -> Result<bool, FsDaoError> {
        match fs::remove_file(self.blob_path(&room_key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FsDaoError::Delete { room_key, source }),
        }
    }

    async fn probe(&self) -> Result<(), FsDaoError> {
        let metadata =
            fs::metadata(&self.dir)
                .await
                .map_err(|source| FsDaoError::PrepareDir {
                    path: self.dir.display().to_string(),
                    source,
                })?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(FsDaoError::PrepareDir {
                path: self.dir.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            })
        }
    }

    async fn reconnect(&self) -> Result<(), FsDaoError> {
        // Recreates the directory if it was removed underneath us.
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| FsDaoError::PrepareDir {
                path: self.dir.display().to_string(),
                source,
            })
    }
}

impl SessionStore for FsSessionStore {
    fn save_session(
        &self,
        room_key: String,
        session: SessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save(room_key, session).await.map_err(Into::into) })
    }

    fn load_session(
        &self,
        room_key: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load(room_key).await.map_err(Into::into) })
    }

    fn delete_session(&self, room_key: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete(room_key).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.probe().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reconnect().await.map_err(Into::into) })
    }
}
