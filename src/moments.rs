//! Grouping of photos into "moments": bursts of photos taken or uploaded
//! close together in time.
//!
//! The grouper walks a sequence that is already sorted newest first and starts
//! a new moment whenever the gap to the *previous photo* exceeds the window.
//! Gaps are chained, so a series of photos four minutes apart stays in one
//! moment no matter how long it runs. The input is never re-sorted.

use std::time::Duration;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use crate::entities::{Photo, PhotoDetails};
use crate::utils::time_utils::format_moment_label;

/// Default gap that still keeps two consecutive photos in the same moment (inclusive).
pub const MOMENT_WINDOW: Duration = Duration::from_secs(5 * 60);

pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Photo {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for PhotoDetails {
    fn timestamp(&self) -> DateTime<Utc> {
        self.photo.created_at
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Moment<T> {
    pub index: usize,
    pub label: String,
    #[serde(rename = "photos")]
    pub items: Vec<T>,
}

#[derive(Clone, Copy, Debug)]
pub struct MomentGrouper {
    window_ms: i64,
    offset: FixedOffset,
}

impl Default for MomentGrouper {
    fn default() -> Self {
        Self::new(MOMENT_WINDOW, Utc.fix())
    }
}

impl MomentGrouper {
    pub fn new(window: Duration, offset: FixedOffset) -> Self {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self { window_ms, offset }
    }

    pub fn label(&self, timestamp: &DateTime<Utc>) -> String {
        format_moment_label(timestamp, &self.offset)
    }

    /// Partition `items` (sorted by timestamp, newest first) into moments.
    ///
    /// Concatenating the returned moments yields the input unchanged.
    pub fn group<T, I>(&self, items: I) -> Vec<Moment<T>>
    where
        T: Timestamped,
        I: IntoIterator<Item = T>,
    {
        let mut moments: Vec<Moment<T>> = Vec::new();
        let mut previous_time: Option<DateTime<Utc>> = None;

        for item in items {
            let current_time = item.timestamp();
            let continues_open_moment = match previous_time {
                None => true,
                Some(previous) => (previous - current_time).num_milliseconds() <= self.window_ms,
            };

            match moments.last_mut() {
                Some(open) if continues_open_moment => open.items.push(item),
                _ => moments.push(Moment {
                    index: moments.len(),
                    label: self.label(&current_time),
                    items: vec![item],
                }),
            }

            previous_time = Some(current_time);
        }

        moments
    }
}

/// Group with the default five minute window and UTC labels.
pub fn group_by_moment<T, I>(items: I) -> Vec<Moment<T>>
where
    T: Timestamped,
    I: IntoIterator<Item = T>,
{
    MomentGrouper::default().group(items)
}

/// Label-keyed view of moments, as older clients expect it.
///
/// Serializes as a JSON object. When two moments share a label the later one
/// replaces the earlier one's photos while keeping the key's original position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyMoments<T>(Vec<(String, Vec<T>)>);

impl<T> LegacyMoments<T> {
    pub fn entries(&self) -> &[(String, Vec<T>)] {
        &self.0
    }

    pub fn get(&self, label: &str) -> Option<&Vec<T>> {
        self.0.iter().find(|(key, _)| key == label).map(|(_, items)| items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<Moment<T>>> for LegacyMoments<T> {
    fn from(moments: Vec<Moment<T>>) -> Self {
        let mut entries: Vec<(String, Vec<T>)> = Vec::with_capacity(moments.len());
        for moment in moments {
            match entries.iter_mut().find(|(label, _)| *label == moment.label) {
                Some((_, items)) => *items = moment.items,
                None => entries.push((moment.label, moment.items)),
            }
        }
        Self(entries)
    }
}

impl<T: Serialize> Serialize for LegacyMoments<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, items) in &self.0 {
            map.serialize_entry(label, items)?;
        }
        map.end()
    }
}
