//! Retention manager
//!
//! Keeps the total size of recorded videos in the output directory under a
//! byte budget by deleting the oldest files first. Only the top level of the
//! directory is scanned and only files with the configured extension count.

use log::{debug, error, info, warn};
use std::fs;

use crate::models::{CleanupReport, LatestVideo, RetentionConfig, VideoFileRecord};

#[derive(Debug, Clone)]
pub struct RetentionManager {
    config: RetentionConfig,
}

impl RetentionManager {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Matching files sorted oldest first, ties broken by path.
    /// A missing or unreadable directory yields no files.
    pub fn scan(&self) -> Vec<VideoFileRecord> {
        let directory = self.config.directory();
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {}", directory.display(), err);
                return Vec::new();
            }
        };

        let mut videos: Vec<VideoFileRecord> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| self.config.matches(path))
            .filter_map(|path| {
                let metadata = match fs::metadata(&path) {
                    Ok(metadata) if metadata.is_file() => metadata,
                    Ok(_) => return None,
                    Err(err) => {
                        debug!("Skipping {}: {}", path.display(), err);
                        return None;
                    }
                };
                let modified = metadata.modified().ok()?;
                Some(VideoFileRecord {
                    path,
                    size_bytes: metadata.len(),
                    modified,
                })
            })
            .collect();

        videos.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        videos
    }

    /// Sum of matching file sizes
    pub fn total_size(&self) -> u64 {
        self.scan().iter().map(|video| video.size_bytes).sum()
    }

    /// Newest matching file, or absent
    pub fn get_latest_video(&self) -> LatestVideo {
        match self.scan().pop() {
            Some(video) => LatestVideo::from(video),
            None => {
                debug!(
                    "No .{} files found in {}",
                    self.config.extension(),
                    self.config.directory().display()
                );
                LatestVideo::absent()
            }
        }
    }

    /// Run a cleanup pass when the folder is over budget
    pub fn check_and_manage_folder_size(&self) -> Option<CleanupReport> {
        let total = self.total_size();
        let limit = self.config.max_total_bytes();
        if total > limit {
            info!(
                "Total folder size {} exceeds maximum of {}. Initiating cleanup.",
                total, limit
            );
            Some(self.cleanup_videos())
        } else {
            info!("Total folder size {} is within the limit of {}.", total, limit);
            None
        }
    }

    /// Delete oldest files until the total is within budget or nothing is left
    pub fn cleanup_videos(&self) -> CleanupReport {
        self.remove_oldest(self.scan())
    }

    /// `videos` must already be sorted oldest first
    fn remove_oldest(&self, videos: Vec<VideoFileRecord>) -> CleanupReport {
        let limit = self.config.max_total_bytes();
        let mut current: u64 = videos.iter().map(|video| video.size_bytes).sum();
        let mut report = CleanupReport::default();

        for video in videos {
            if current <= limit {
                break;
            }
            match fs::remove_file(&video.path) {
                Ok(()) => {
                    current = current.saturating_sub(video.size_bytes);
                    report.freed_bytes += video.size_bytes;
                    info!(
                        "Deleted old video: {} (freed {} bytes)",
                        video.path.display(),
                        video.size_bytes
                    );
                    report.deleted.push(video);
                }
                Err(err) => {
                    error!("Could not delete video {}: {}", video.path.display(), err);
                    report.failed.push(video.path);
                }
            }
        }

        report.remaining_bytes = current;
        report.within_limit = current <= limit;
        if !report.within_limit {
            warn!(
                "Folder still holds {} bytes after cleanup, over the limit of {}; \
                 the limit cannot be reached with the remaining files",
                current, limit
            );
        }
        report
    }
}
