//! Reconciliation of a photo's tag links with a desired set of tag names.
//!
//! Missing tags are created on the fly. Creation is best effort: if the batch
//! insert fails part way (typically because a concurrent request created the
//! same name first) the tags that did get inserted are kept, the remaining
//! names are dropped from the result and reported in
//! [`Reconciliation::dropped_names`]. Link failures are fatal.

use async_trait::async_trait;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};
use crate::entities::{PhotoId, PhotoTagLink, Tag, TagId};
use crate::error::ShoeboxError;

/// Tag names as they arrive from a request body, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagInput {
    Valid(Vec<String>),
    Malformed,
}

impl TagInput {
    /// Names are matched exactly (case-sensitive); duplicates are collapsed keeping the first occurrence.
    /// Blank names are skipped, the same rule `POST /tags` applies.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagInput::Valid(names.into_iter()
            .map(Into::into)
            .filter(|x: &String| !x.trim().is_empty())
            .unique()
            .collect())
    }

    /// Anything but an array of strings is malformed, including an absent value.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        let Some(serde_json::Value::Array(items)) = value else {
            return TagInput::Malformed;
        };
        let names: Option<Vec<String>> = items.iter()
            .map(|x| x.as_str().map(str::to_string))
            .collect();
        match names {
            Some(names) => TagInput::from_names(names),
            None => TagInput::Malformed,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, TagInput::Malformed)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("inserted {} of {} tags: {}", .succeeded.len(), .attempted.len(), .reason)]
pub struct PartialInsertFailure {
    pub attempted: Vec<String>,
    pub succeeded: Vec<Tag>,
    pub reason: String,
}

impl PartialInsertFailure {
    pub fn failed_names(&self) -> Vec<String> {
        self.attempted.iter()
            .filter(|name| !self.succeeded.iter().any(|tag| &tag.name == *name))
            .cloned()
            .collect()
    }
}

/// Name-keyed tag registry.
#[async_trait]
pub trait TagRegistry: Send + Sync {
    async fn find_tags_by_names(&self, names: &[String]) -> Result<Vec<Tag>, ShoeboxError>;

    /// Insert in order, stopping at the first failure.
    async fn insert_tags(&self, names: &[String]) -> Result<Vec<Tag>, PartialInsertFailure>;
}

/// Many-to-many link table between photos and tags.
#[async_trait]
pub trait PhotoTagLinks: Send + Sync {
    async fn delete_links_for_photo(&self, photo_id: &PhotoId) -> Result<usize, ShoeboxError>;

    async fn insert_links(&self, links: &[PhotoTagLink]) -> Result<(), ShoeboxError>;

    /// Delete every link of `photo_id`, then insert `links`.
    ///
    /// The default runs two separate writes; stores that can do better should
    /// apply both in one atomic step.
    async fn replace_links_for_photo(&self, photo_id: &PhotoId, links: &[PhotoTagLink]) -> Result<(), ShoeboxError> {
        self.delete_links_for_photo(photo_id).await?;
        self.insert_links(links).await
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    LookupTags { names: Vec<String> },
    InsertTags { names: Vec<String> },
    DeleteLinks { photo_id: PhotoId },
    InsertLinks { photo_id: PhotoId, tag_ids: Vec<TagId> },
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub tags: Vec<Tag>,
    pub operations: Vec<Operation>,
    pub dropped_names: Vec<String>,
    /// Set when the input was malformed and nothing was touched.
    pub short_circuited: bool,
}

impl Reconciliation {
    pub fn tag_ids(&self) -> Vec<TagId> {
        self.tags.iter().map(|x| x.id).collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|x| x.name.clone()).collect()
    }
}

/// Names from `desired` that have no tag in `existing`, in `desired` order.
pub fn missing_names(desired: &[String], existing: &[Tag]) -> Vec<String> {
    desired.iter()
        .filter(|name| !existing.iter().any(|tag| &tag.name == *name))
        .unique()
        .cloned()
        .collect()
}

pub struct TagReconciler<'a, R: ?Sized, L: ?Sized> {
    registry: &'a R,
    links: &'a L,
}

impl<'a, R, L> TagReconciler<'a, R, L>
where
    R: TagRegistry + ?Sized,
    L: PhotoTagLinks + ?Sized,
{
    pub fn new(registry: &'a R, links: &'a L) -> Self {
        Self { registry, links }
    }

    /// Replace the tag links of `photo_id` with links to the tags named in `input`.
    ///
    /// Callers must check that the photo exists and serialize calls per photo.
    pub async fn reconcile(&self, photo_id: &PhotoId, input: &TagInput) -> Result<Reconciliation, ShoeboxError> {
        let desired: Vec<String> = match input {
            TagInput::Malformed => {
                debug!("malformed tag input for photo {}, leaving tags untouched", photo_id);
                return Ok(Reconciliation { short_circuited: true, ..Default::default() });
            }
            TagInput::Valid(names) => names.iter().unique().cloned().collect(),
        };

        let mut operations = Vec::new();

        let existing_tags = if desired.is_empty() {
            vec![]
        } else {
            operations.push(Operation::LookupTags { names: desired.clone() });
            self.registry.find_tags_by_names(&desired).await?
        };

        let new_names = missing_names(&desired, &existing_tags);
        let mut dropped_names = vec![];
        let inserted_tags = if new_names.is_empty() {
            vec![]
        } else {
            operations.push(Operation::InsertTags { names: new_names.clone() });
            match self.registry.insert_tags(&new_names).await {
                Ok(tags) => tags,
                Err(failure) => {
                    dropped_names = failure.failed_names();
                    warn!("tag insert for photo {} partially failed ({}), dropping {:?}", photo_id, failure, dropped_names);
                    failure.succeeded
                }
            }
        };

        let tags: Vec<Tag> = existing_tags.into_iter()
            .chain(inserted_tags)
            .unique_by(|x| x.id)
            .collect();
        let links: Vec<PhotoTagLink> = tags.iter()
            .map(|tag| PhotoTagLink { photo_id: *photo_id, tag_id: tag.id })
            .collect();

        operations.push(Operation::DeleteLinks { photo_id: *photo_id });
        operations.push(Operation::InsertLinks { photo_id: *photo_id, tag_ids: tags.iter().map(|x| x.id).collect() });
        self.links.replace_links_for_photo(photo_id, &links).await?;

        debug!("reconciled tags of photo {}: {:?}", photo_id, operations);
        Ok(Reconciliation { tags, operations, dropped_names, short_circuited: false })
    }
}
