use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShoeboxError {
    #[error("Failed to read/write DB file: {0}")]
    DbIOError(std::io::Error),
    #[error("Failed to serialize/deserialize DB operation: {0}")]
    DbSerializationError(serde_json::Error),
    #[error("Failed to read/write bucket object: {0}")]
    BucketIOError(std::io::Error),
    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),
    #[error("Photo not found")]
    PhotoNotFound,
    #[error("Album not found")]
    AlbumNotFound,
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("Photo already has tag: {0}")]
    DuplicateTagLink(String),
    #[error("Photo already in album")]
    PhotoAlreadyInAlbum,
    #[error("Photo not found in album")]
    PhotoNotInAlbum,
}
