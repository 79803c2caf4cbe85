use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use itertools::Itertools;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use crate::entities::*;
use crate::error::ShoeboxError;
use crate::reconcile::{PartialInsertFailure, PhotoTagLinks, Reconciliation, TagInput, TagReconciler, TagRegistry};
use crate::storage::{DbOperation, Storage};
use crate::utils::str_utils::StringExtensions;

/// Changes requested by a metadata update; `None` leaves a field as it is.
#[derive(Debug, Clone)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub album_id: Option<AlbumId>,
    pub tags: TagInput,
}

/// Holds the update lock of one photo. The lock's map entry is dropped with its last holder.
struct PhotoLockGuard<'a> {
    locks: &'a DashMap<PhotoId, Arc<Mutex<()>>>,
    photo_id: PhotoId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PhotoLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.photo_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// In-memory view of the photo library, rebuilt from and persisted to a [`Storage`] log.
///
/// Every mutation holds the storage lock while it writes the log entry and
/// applies it, so writes are serialized and the maps never run ahead of the log.
pub struct Library<S: Storage> {
    storage: Mutex<S>,
    photos: DashMap<PhotoId, Photo>,
    tags: DashMap<TagId, Tag>,
    tag_names: DashMap<String, TagId>,
    photo_tags: DashMap<PhotoId, Vec<TagId>>,
    albums: DashMap<AlbumId, Album>,
    album_photos: DashMap<AlbumId, Vec<AlbumPhotoLink>>,
    photo_locks: DashMap<PhotoId, Arc<Mutex<()>>>,
}

impl<S: Storage> Library<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
            photos: DashMap::new(),
            tags: DashMap::new(),
            tag_names: DashMap::new(),
            photo_tags: DashMap::new(),
            albums: DashMap::new(),
            album_photos: DashMap::new(),
            photo_locks: DashMap::new(),
        }
    }

    pub async fn init(&self) -> Result<(), ShoeboxError> {
        info!("Starting DB import from log...");
        let operations = self.storage.lock().await.read_all().await?;
        let count = operations.len();
        for operation in operations {
            self.apply(operation);
        }
        info!("DB Imported! {} operations, {} photos, {} tags, {} albums", count, self.photos.len(), self.tags.len(), self.albums.len());
        Ok(())
    }

    fn apply(&self, operation: DbOperation) {
        match operation {
            DbOperation::CreatePhoto { mut photo } | DbOperation::UpdatePhoto { mut photo } => {
                photo.tag_ids = self.photo_tags.get(&photo.id).map(|x| x.clone()).unwrap_or_default();
                self.photos.insert(photo.id, photo);
            }
            DbOperation::CreateTag { tag } => {
                self.tag_names.insert(tag.name.clone(), tag.id);
                self.tags.insert(tag.id, tag);
            }
            DbOperation::LinkPhotoTags { links } => {
                for link in links {
                    let tag_ids = {
                        let mut entry = self.photo_tags.entry(link.photo_id).or_default();
                        if !entry.contains(&link.tag_id) {
                            entry.push(link.tag_id);
                        }
                        entry.clone()
                    };
                    self.sync_photo_tag_ids(&link.photo_id, tag_ids);
                }
            }
            DbOperation::ReplacePhotoTags { photo_id, tag_ids } => {
                if tag_ids.is_empty() {
                    self.photo_tags.remove(&photo_id);
                } else {
                    self.photo_tags.insert(photo_id, tag_ids.clone());
                }
                self.sync_photo_tag_ids(&photo_id, tag_ids);
            }
            DbOperation::CreateAlbum { album } => {
                self.albums.insert(album.id, album);
            }
            DbOperation::AddPhotoToAlbum { link } => {
                self.album_photos.entry(link.album_id).or_default().push(link);
            }
            DbOperation::RemovePhotoFromAlbum { album_id, photo_id } => {
                if let Some(mut links) = self.album_photos.get_mut(&album_id) {
                    links.retain(|x| x.photo_id != photo_id);
                }
            }
        }
    }

    async fn commit(&self, storage: &mut S, operation: DbOperation) -> Result<(), ShoeboxError> {
        storage.write(&operation).await?;
        self.apply(operation);
        Ok(())
    }

    /// The link table is authoritative; a photo's `tag_ids` only mirrors it.
    fn sync_photo_tag_ids(&self, photo_id: &PhotoId, tag_ids: Vec<TagId>) {
        if let Some(mut photo) = self.photos.get_mut(photo_id) {
            photo.tag_ids = tag_ids;
        }
    }

    async fn lock_photo(&self, photo_id: &PhotoId) -> Result<PhotoLockGuard<'_>, ShoeboxError> {
        if !self.photos.contains_key(photo_id) {
            return Err(ShoeboxError::PhotoNotFound);
        }
        let mut guard = PhotoLockGuard { locks: &self.photo_locks, photo_id: *photo_id, guard: None };
        let lock = self.photo_locks.entry(*photo_id).or_default().value().clone();
        guard.guard = Some(lock.lock_owned().await);
        Ok(guard)
    }

    // photos

    pub fn get_photo(&self, photo_id: &PhotoId) -> Option<Photo> {
        self.photos.get(photo_id).map(|x| x.value().clone())
    }

    pub fn get_photo_count(&self) -> usize {
        self.photos.len()
    }

    pub async fn create_photo(&self, photo: Photo) -> Result<Photo, ShoeboxError> {
        let mut storage = self.storage.lock().await;
        self.commit(&mut storage, DbOperation::CreatePhoto { photo: photo.clone() }).await?;
        Ok(photo)
    }

    async fn modify_photo<F>(&self, photo_id: &PhotoId, f: F) -> Result<Photo, ShoeboxError>
    where
        F: FnOnce(&mut Photo) + Send,
    {
        let mut storage = self.storage.lock().await;
        let mut photo = self.get_photo(photo_id).ok_or(ShoeboxError::PhotoNotFound)?;
        f(&mut photo);
        photo.updated_at = Utc::now();
        self.commit(&mut storage, DbOperation::UpdatePhoto { photo: photo.clone() }).await?;
        Ok(photo)
    }

    pub async fn trash_photo(&self, photo_id: &PhotoId) -> Result<Photo, ShoeboxError> {
        self.modify_photo(photo_id, |photo| photo.is_trashed = true).await
    }

    pub async fn restore_photo(&self, photo_id: &PhotoId) -> Result<Photo, ShoeboxError> {
        self.modify_photo(photo_id, |photo| photo.is_trashed = false).await
    }

    pub async fn toggle_favorite(&self, photo_id: &PhotoId) -> Result<Photo, ShoeboxError> {
        self.modify_photo(photo_id, |photo| photo.is_favorite = !photo.is_favorite).await
    }

    /// Photos matching `filter`, newest first.
    pub fn list_photos<F>(&self, filter: F) -> Vec<Photo>
    where
        F: Fn(&Photo) -> bool,
    {
        self.photos.iter()
            .filter(|x| filter(x.value()))
            .map(|x| x.value().clone())
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .collect()
    }

    pub fn library_photos(&self) -> Vec<Photo> {
        self.list_photos(|x| !x.is_trashed)
    }

    pub fn favorite_photos(&self) -> Vec<Photo> {
        self.list_photos(|x| !x.is_trashed && x.is_favorite)
    }

    pub fn trashed_photos(&self) -> Vec<Photo> {
        self.list_photos(|x| x.is_trashed)
    }

    /// Non-trashed photos whose title, description or one of the tag names contains `query`.
    pub fn search_photos(&self, query: &str) -> Vec<Photo> {
        let query = query.normalize_query();
        if query.is_empty() {
            return vec![];
        }
        self.list_photos(|photo| {
            !photo.is_trashed && (photo.title.contains_normalized(&query)
                || photo.description.contains_normalized(&query)
                || self.tags_of_photo(&photo.id).iter().any(|tag| tag.name.contains_normalized(&query)))
        })
    }

    pub fn details(&self, photo: Photo) -> PhotoDetails {
        let tags = self.tags_of_photo(&photo.id).into_iter().map(|x| x.name).collect();
        let album = photo.album_id.and_then(|id| self.get_album(&id));
        PhotoDetails { photo, tags, album }
    }

    pub fn get_photo_details(&self, photo_id: &PhotoId) -> Option<PhotoDetails> {
        self.get_photo(photo_id).map(|x| self.details(x))
    }

    /// Apply title/description/album changes and reconcile tags.
    ///
    /// A malformed tag list leaves tag links and the photo's tag references alone.
    pub async fn update_photo_metadata(&self, photo_id: &PhotoId, update: MetadataUpdate) -> Result<(PhotoDetails, Reconciliation), ShoeboxError> {
        let _lock = self.lock_photo(photo_id).await?;
        if let Some(album_id) = &update.album_id {
            if !self.albums.contains_key(album_id) {
                return Err(ShoeboxError::AlbumNotFound);
            }
        }

        let reconciliation = TagReconciler::new(self, self).reconcile(photo_id, &update.tags).await?;
        let MetadataUpdate { title, description, album_id, .. } = update;
        let photo = self.modify_photo(photo_id, move |photo| {
            if let Some(title) = title {
                photo.title = title;
            }
            if let Some(description) = description {
                photo.description = description;
            }
            if album_id.is_some() {
                photo.album_id = album_id;
            }
        }).await?;

        Ok((self.details(photo), reconciliation))
    }

    /// Reconcile only the tags of a photo.
    pub async fn update_photo_tags(&self, photo_id: &PhotoId, input: &TagInput) -> Result<Reconciliation, ShoeboxError> {
        let _lock = self.lock_photo(photo_id).await?;
        TagReconciler::new(self, self).reconcile(photo_id, input).await
    }

    // tags

    pub fn get_tag(&self, tag_id: &TagId) -> Option<Tag> {
        self.tags.get(tag_id).map(|x| x.value().clone())
    }

    pub fn get_tag_by_name(&self, name: &str) -> Option<Tag> {
        self.tag_names.get(name).and_then(|id| self.get_tag(id.value()))
    }

    pub fn all_tags(&self) -> Vec<Tag> {
        self.tags.iter()
            .map(|x| x.value().clone())
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    pub async fn create_tag(&self, name: String) -> Result<InsertResult<Tag>, ShoeboxError> {
        let mut storage = self.storage.lock().await;
        if let Some(existing) = self.get_tag_by_name(&name) {
            return Ok(InsertResult::Existing(existing));
        }
        let tag = Tag::new(name);
        self.commit(&mut storage, DbOperation::CreateTag { tag: tag.clone() }).await?;
        Ok(InsertResult::New(tag))
    }

    /// Tags linked to a photo, in link order.
    pub fn tags_of_photo(&self, photo_id: &PhotoId) -> Vec<Tag> {
        self.photo_tags.get(photo_id)
            .map(|ids| ids.iter().filter_map(|id| self.get_tag(id)).collect())
            .unwrap_or_default()
    }

    fn validate_links(&self, links: &[PhotoTagLink]) -> Result<(), ShoeboxError> {
        for link in links {
            if !self.tags.contains_key(&link.tag_id) {
                return Err(ShoeboxError::TagNotFound(link.tag_id.to_string()));
            }
        }
        if let Some(duplicate) = links.iter().duplicates().next() {
            return Err(ShoeboxError::DuplicateTagLink(duplicate.tag_id.to_string()));
        }
        Ok(())
    }

    // albums

    pub fn get_album(&self, album_id: &AlbumId) -> Option<Album> {
        self.albums.get(album_id).map(|x| x.value().clone())
    }

    pub fn all_albums(&self) -> Vec<Album> {
        self.albums.iter()
            .map(|x| x.value().clone())
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .collect()
    }

    pub async fn create_album(&self, name: String, description: Option<String>) -> Result<Album, ShoeboxError> {
        let album = Album::new(name, description);
        let mut storage = self.storage.lock().await;
        self.commit(&mut storage, DbOperation::CreateAlbum { album: album.clone() }).await?;
        Ok(album)
    }

    fn album_contains(&self, album_id: &AlbumId, photo_id: &PhotoId) -> bool {
        self.album_photos.get(album_id)
            .map(|links| links.iter().any(|x| &x.photo_id == photo_id))
            .unwrap_or(false)
    }

    pub async fn add_photo_to_album(&self, album_id: &AlbumId, photo_id: &PhotoId) -> Result<AlbumPhotoLink, ShoeboxError> {
        let mut storage = self.storage.lock().await;
        if !self.albums.contains_key(album_id) {
            return Err(ShoeboxError::AlbumNotFound);
        }
        if !self.photos.contains_key(photo_id) {
            return Err(ShoeboxError::PhotoNotFound);
        }
        if self.album_contains(album_id, photo_id) {
            return Err(ShoeboxError::PhotoAlreadyInAlbum);
        }
        let link = AlbumPhotoLink { album_id: *album_id, photo_id: *photo_id, created_at: Utc::now() };
        self.commit(&mut storage, DbOperation::AddPhotoToAlbum { link: link.clone() }).await?;
        Ok(link)
    }

    pub async fn remove_photo_from_album(&self, album_id: &AlbumId, photo_id: &PhotoId) -> Result<AlbumPhotoLink, ShoeboxError> {
        let mut storage = self.storage.lock().await;
        let link = self.album_photos.get(album_id)
            .and_then(|links| links.iter().find(|x| &x.photo_id == photo_id).cloned())
            .ok_or(ShoeboxError::PhotoNotInAlbum)?;
        self.commit(&mut storage, DbOperation::RemovePhotoFromAlbum { album_id: *album_id, photo_id: *photo_id }).await?;
        Ok(link)
    }

    /// Photos of an album in the order they were added.
    pub fn photos_in_album(&self, album_id: &AlbumId) -> Result<Vec<Photo>, ShoeboxError> {
        if !self.albums.contains_key(album_id) {
            return Err(ShoeboxError::AlbumNotFound);
        }
        let photos = self.album_photos.get(album_id)
            .map(|links| links.iter().filter_map(|x| self.get_photo(&x.photo_id)).collect())
            .unwrap_or_default();
        Ok(photos)
    }
}

#[async_trait]
impl<S: Storage> TagRegistry for Library<S> {
    async fn find_tags_by_names(&self, names: &[String]) -> Result<Vec<Tag>, ShoeboxError> {
        Ok(names.iter().filter_map(|name| self.get_tag_by_name(name)).collect())
    }

    async fn insert_tags(&self, names: &[String]) -> Result<Vec<Tag>, PartialInsertFailure> {
        let mut storage = self.storage.lock().await;
        let mut inserted: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names {
            if self.tag_names.contains_key(name) {
                return Err(PartialInsertFailure {
                    attempted: names.to_vec(),
                    succeeded: inserted,
                    reason: format!("tag '{}' already exists", name),
                });
            }
            let tag = Tag::new(name.clone());
            if let Err(e) = self.commit(&mut storage, DbOperation::CreateTag { tag: tag.clone() }).await {
                warn!("failed to insert tag '{}': {}", name, e);
                return Err(PartialInsertFailure {
                    attempted: names.to_vec(),
                    succeeded: inserted,
                    reason: e.to_string(),
                });
            }
            inserted.push(tag);
        }
        Ok(inserted)
    }
}

#[async_trait]
impl<S: Storage> PhotoTagLinks for Library<S> {
    async fn delete_links_for_photo(&self, photo_id: &PhotoId) -> Result<usize, ShoeboxError> {
        let mut storage = self.storage.lock().await;
        let count = self.photo_tags.get(photo_id).map(|x| x.len()).unwrap_or(0);
        self.commit(&mut storage, DbOperation::ReplacePhotoTags { photo_id: *photo_id, tag_ids: vec![] }).await?;
        Ok(count)
    }

    async fn insert_links(&self, links: &[PhotoTagLink]) -> Result<(), ShoeboxError> {
        let mut storage = self.storage.lock().await;
        self.validate_links(links)?;
        let already_linked = links.iter()
            .find(|link| self.photo_tags.get(&link.photo_id).map(|x| x.contains(&link.tag_id)).unwrap_or(false));
        if let Some(link) = already_linked {
            return Err(ShoeboxError::DuplicateTagLink(link.tag_id.to_string()));
        }
        self.commit(&mut storage, DbOperation::LinkPhotoTags { links: links.to_vec() }).await
    }

    async fn replace_links_for_photo(&self, photo_id: &PhotoId, links: &[PhotoTagLink]) -> Result<(), ShoeboxError> {
        let mut storage = self.storage.lock().await;
        self.validate_links(links)?;
        let tag_ids = links.iter()
            .filter(|x| &x.photo_id == photo_id)
            .map(|x| x.tag_id)
            .collect();
        self.commit(&mut storage, DbOperation::ReplacePhotoTags { photo_id: *photo_id, tag_ids }).await
    }
}
