use std::path::PathBuf;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::entities::{Album, AlbumId, AlbumPhotoLink, Photo, PhotoId, PhotoTagLink, Tag, TagId};
use crate::error::ShoeboxError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbOperation {
    CreatePhoto { photo: Photo },
    UpdatePhoto { photo: Photo },
    CreateTag { tag: Tag },
    LinkPhotoTags { links: Vec<PhotoTagLink> },
    ReplacePhotoTags { photo_id: PhotoId, tag_ids: Vec<TagId> },
    CreateAlbum { album: Album },
    AddPhotoToAlbum { link: AlbumPhotoLink },
    RemovePhotoFromAlbum { album_id: AlbumId, photo_id: PhotoId },
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_all(&self) -> Result<Vec<DbOperation>, ShoeboxError>;
    async fn write(&mut self, operation: &DbOperation) -> Result<(), ShoeboxError>;
}

pub type DynStorage = Box<dyn Storage>;

#[async_trait]
impl Storage for DynStorage {
    async fn read_all(&self) -> Result<Vec<DbOperation>, ShoeboxError> {
        (**self).read_all().await
    }

    async fn write(&mut self, operation: &DbOperation) -> Result<(), ShoeboxError> {
        (**self).write(operation).await
    }
}

/// Append-only log of operations, one JSON document per line.
pub struct FileStorage {
    db_path: PathBuf,
}

impl FileStorage {
    pub fn new(db_path: PathBuf) -> anyhow::Result<Self> {
        if db_path.exists() && !db_path.is_file() {
            anyhow::bail!("db_path is not a file");
        }
        if !db_path.exists() {
            std::fs::write(&db_path, "")?;
        }
        Ok(Self { db_path })
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read_all(&self) -> Result<Vec<DbOperation>, ShoeboxError> {
        let file_str = tokio::fs::read_to_string(&self.db_path).await
            .map_err(ShoeboxError::DbIOError)?;
        let operations = file_str.split('\n')
            .filter(|x| !x.is_empty())
            .map(|x| serde_json::from_str(x).map_err(ShoeboxError::DbSerializationError))
            .collect::<Result<Vec<DbOperation>, ShoeboxError>>()?;
        Ok(operations)
    }

    async fn write(&mut self, operation: &DbOperation) -> Result<(), ShoeboxError> {
        let serialized_operation = serde_json::to_string(operation)
            .map_err(ShoeboxError::DbSerializationError)?;
        let line = format!("{}\n", serialized_operation);
        let mut file = tokio::fs::OpenOptions::new().append(true).open(&self.db_path).await
            .map_err(ShoeboxError::DbIOError)?;
        tokio::io::AsyncWriteExt::write_all(&mut file, line.as_bytes()).await
            .map_err(ShoeboxError::DbIOError)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    operations: Vec<DbOperation>,
}

impl InMemoryStorage {
    pub fn with_operations(operations: Vec<DbOperation>) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn read_all(&self) -> Result<Vec<DbOperation>, ShoeboxError> {
        Ok(self.operations.clone())
    }

    async fn write(&mut self, operation: &DbOperation) -> Result<(), ShoeboxError> {
        self.operations.push(operation.clone());
        Ok(())
    }
}
