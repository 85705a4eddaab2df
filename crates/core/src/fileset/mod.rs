//! Ordered set of user-selected files.
//!
//! Intake enforces the size limit, the optional accept filter of the bound
//! route, and the maximum set length (first come, first kept). Image items
//! get a preview URL that lives exactly as long as the item.

mod types;

pub use types::{IntakeReport, RawFile, Rejection, RejectionReason, UploadedItem};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::metrics;
use crate::object_url::ObjectUrlPool;
use crate::route::AcceptFilter;

/// Limits applied at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSetLimits {
    pub max_files: usize,
    pub max_size_bytes: u64,
}

impl From<&IntakeConfig> for FileSetLimits {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_size_bytes: config.max_size_bytes(),
        }
    }
}

impl Default for FileSetLimits {
    fn default() -> Self {
        Self::from(&IntakeConfig::default())
    }
}

/// The files selected for the next batch.
#[derive(Debug)]
pub struct FileSet {
    items: Vec<UploadedItem>,
    limits: FileSetLimits,
    accept: Option<AcceptFilter>,
    urls: ObjectUrlPool,
}

impl FileSet {
    pub fn new(limits: FileSetLimits, urls: ObjectUrlPool) -> Self {
        Self {
            items: Vec::new(),
            limits,
            accept: None,
            urls,
        }
    }

    /// Restricts future intake to files matching `accept`.
    pub fn with_accept(mut self, accept: AcceptFilter) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn set_accept(&mut self, accept: Option<AcceptFilter>) {
        self.accept = accept;
    }

    pub fn limits(&self) -> FileSetLimits {
        self.limits
    }

    /// Adds files in order. Oversized or unaccepted files are rejected, and
    /// files beyond `max_files` are dropped.
    pub fn add(&mut self, files: impl IntoIterator<Item = RawFile>) -> IntakeReport {
        let mut report = IntakeReport::default();

        for file in files {
            let reason = if file.size() > self.limits.max_size_bytes {
                Some(RejectionReason::TooLarge {
                    size_bytes: file.size(),
                    max_bytes: self.limits.max_size_bytes,
                })
            } else if !self.accepts(&file) {
                Some(RejectionReason::NotAccepted)
            } else if self.items.len() >= self.limits.max_files {
                Some(RejectionReason::SetFull {
                    max_files: self.limits.max_files,
                })
            } else {
                None
            };

            if let Some(reason) = reason {
                warn!("Rejected file {}: {}", file.name, reason);
                metrics::INTAKE_REJECTIONS
                    .with_label_values(&[reason.label()])
                    .inc();
                report.rejected.push(Rejection {
                    name: file.name,
                    reason,
                });
                continue;
            }

            let preview = file.is_image().then(|| self.urls.allocate());
            let item = UploadedItem {
                id: Uuid::new_v4().to_string(),
                file,
                preview,
            };
            debug!("Accepted file {} as {}", item.file.name, item.id);
            report.accepted.push(item.id.clone());
            self.items.push(item);
        }

        report
    }

    /// Removes an item and revokes its preview. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(index) => {
                self.items.remove(index).release();
                true
            }
            None => false,
        }
    }

    /// Removes every item and revokes every preview.
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            item.release();
        }
    }

    pub fn items(&self) -> &[UploadedItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&UploadedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn accepts(&self, file: &RawFile) -> bool {
        self.accept
            .as_ref()
            .map_or(true, |accept| accept.matches(&file.name, &file.mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn file(name: &str, mime: &str, size: usize) -> RawFile {
        RawFile::new(name, mime, vec![0u8; size])
    }

    fn small_set(max_files: usize, max_size_bytes: u64) -> (FileSet, ObjectUrlPool) {
        let urls = ObjectUrlPool::new();
        let set = FileSet::new(
            FileSetLimits {
                max_files,
                max_size_bytes,
            },
            urls.clone(),
        );
        (set, urls)
    }

    #[test]
    fn test_size_and_cap_applied_together() {
        let (mut set, _) = small_set(2, MB as u64);
        let report = set.add(vec![
            file("file1.pdf", "application/pdf", MB / 2),
            file("file2.pdf", "application/pdf", 2 * MB),
            file("file3.pdf", "application/pdf", MB * 3 / 10),
        ]);

        let names: Vec<_> = set.items().iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(names, vec!["file1.pdf", "file3.pdf"]);
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(
            report.rejected[0].reason,
            RejectionReason::TooLarge { .. }
        ));
    }

    #[test]
    fn test_cap_keeps_first_files() {
        let (mut set, _) = small_set(2, MB as u64);
        set.add(vec![file("a.txt", "text/plain", 1)]);
        let report = set.add(vec![
            file("b.txt", "text/plain", 1),
            file("c.txt", "text/plain", 1),
        ]);

        let names: Vec<_> = set.items().iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(report.rejected[0].name, "c.txt");
        assert!(matches!(
            report.rejected[0].reason,
            RejectionReason::SetFull { max_files: 2 }
        ));
    }

    #[test]
    fn test_file_at_exact_limit_is_accepted() {
        let (mut set, _) = small_set(5, 10);
        set.add(vec![file("edge.bin", "application/octet-stream", 10)]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_preview_only_for_images() {
        let (mut set, urls) = small_set(5, MB as u64);
        set.add(vec![
            file("photo.png", "image/png", 10),
            file("doc.pdf", "application/pdf", 10),
        ]);

        assert!(set.items()[0].preview().is_some());
        assert!(set.items()[1].preview().is_none());
        assert_eq!(urls.live_count(), 1);
    }

    #[test]
    fn test_ids_unique() {
        let (mut set, _) = small_set(10, MB as u64);
        set.add((0..10).map(|i| file(&format!("{}.txt", i), "text/plain", 1)));
        let mut ids: Vec<_> = set.items().iter().map(|i| i.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_remove_revokes_preview() {
        let (mut set, urls) = small_set(5, MB as u64);
        let report = set.add(vec![
            file("a.jpg", "image/jpeg", 10),
            file("b.jpg", "image/jpeg", 10),
        ]);
        let preview = set.items()[0].preview().unwrap().to_string();

        assert!(set.remove(&report.accepted[0]));
        assert!(!urls.is_live(&preview));
        assert_eq!(urls.live_count(), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (mut set, _) = small_set(5, MB as u64);
        set.add(vec![file("a.txt", "text/plain", 1)]);
        assert!(!set.remove("missing"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear_revokes_all() {
        let (mut set, urls) = small_set(5, MB as u64);
        set.add(vec![
            file("a.jpg", "image/jpeg", 10),
            file("b.webp", "image/webp", 10),
            file("c.mp4", "video/mp4", 10),
        ]);
        assert_eq!(urls.live_count(), 2);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_dropping_set_revokes_previews() {
        let urls = ObjectUrlPool::new();
        {
            let mut set = FileSet::new(FileSetLimits::default(), urls.clone());
            set.add(vec![file("a.gif", "image/gif", 10)]);
            assert_eq!(urls.live_count(), 1);
        }
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_accept_filter_rejects_mismatched_files() {
        let (set, _) = small_set(5, MB as u64);
        let mut set = set.with_accept(AcceptFilter::parse(".pdf,application/pdf"));
        let report = set.add(vec![
            file("a.pdf", "application/pdf", 1),
            file("b.png", "image/png", 1),
        ]);

        assert_eq!(set.len(), 1);
        assert_eq!(report.rejected[0].reason, RejectionReason::NotAccepted);
    }
}
