use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use crate::error::ShoeboxError;

/// Flat local directory holding uploaded objects, one file per key.
#[derive(Debug, Clone)]
pub struct Bucket {
    dir: PathBuf,
}

impl Bucket {
    pub fn open(dir: PathBuf) -> anyhow::Result<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        if !dir.is_dir() {
            anyhow::bail!("bucket path is not a directory");
        }
        info!("bucket: {}", dir.display());
        Ok(Self { dir })
    }

    /// Store `data` under a fresh `<uuid>.<ext>` key, keeping the extension of `original_name`.
    pub async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, ShoeboxError> {
        let key = Self::new_key(original_name);
        tokio::fs::write(self.dir.join(&key), data).await
            .map_err(ShoeboxError::BucketIOError)?;
        Ok(key)
    }

    pub fn object_path(&self, key: &str) -> Result<PathBuf, ShoeboxError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(ShoeboxError::InvalidObjectKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    pub async fn open_object(&self, key: &str) -> Result<Option<tokio::fs::File>, ShoeboxError> {
        let path = self.object_path(key)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShoeboxError::BucketIOError(e)),
        }
    }

    fn new_key(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|x| x.to_str())
            .filter(|x| x.chars().all(|c| c.is_ascii_alphanumeric()));
        match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use super::*;

    #[tokio::test]
    async fn put_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = Bucket::open(dir.path().join("my-photo-bucket")).unwrap();
        let key = bucket.put("Holiday.JPG", b"jpeg bytes").await.unwrap();
        assert!(key.ends_with(".jpg"));
        assert_eq!(key.len(), 36 + 4);

        let mut file = bucket.open_object(&key).await.unwrap().unwrap();
        let mut content = vec![];
        file.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"jpeg bytes");
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = Bucket::open(dir.path().to_path_buf()).unwrap();
        assert!(bucket.open_object("nope.png").await.unwrap().is_none());
    }

    #[test]
    fn keys_cannot_escape_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = Bucket::open(dir.path().to_path_buf()).unwrap();
        for key in ["../secret", "a/b.png", "a\\b.png", ""] {
            assert!(matches!(bucket.object_path(key), Err(ShoeboxError::InvalidObjectKey(_))), "{}", key);
        }
        assert!(bucket.object_path("abc.png").is_ok());
    }

    #[test]
    fn key_without_usable_extension() {
        assert_eq!(Bucket::new_key("README").len(), 36);
        assert_eq!(Bucket::new_key("photo.j p g").len(), 36);
    }

    #[test]
    fn bucket_path_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(Bucket::open(file).is_err());
    }
}
