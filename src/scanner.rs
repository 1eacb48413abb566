//! Background directory scan.
//!
//! Enumeration runs on its own thread and posts one `ScanResult` back over a
//! channel when done, so startup never blocks on a large or slow directory
//! tree. The file list is naturally sorted over the full path string, which
//! both orders `img2` before `img10` and keeps files grouped by directory.

use std::path::{Path, PathBuf};

use crossbeam_channel::{bounded, Receiver};
use jwalk::WalkDir;
use tracing::{info, warn};

use crate::image_loader::{is_supported_image, natord};

/// Outcome of a finished scan.
pub struct ScanResult {
    /// Supported image files in natural path order.
    pub files: Vec<PathBuf>,
    /// Index of the first file of each distinct parent directory.
    pub directory_starts: Vec<usize>,
}

/// Walk `dir` for supported images. Non-recursive mode only looks at the top
/// level. Unreadable entries are skipped with a warning.
pub fn scan_directory(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let max_depth = if recurse { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .skip_hidden(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| is_supported_image(p))
        .collect();

    files.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
    files
}

/// Index of the first file of each distinct parent directory, in list order.
/// Assumes `files` is already sorted so directories are contiguous.
pub fn directory_starts(files: &[PathBuf]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous: Option<&Path> = None;

    for (i, file) in files.iter().enumerate() {
        let parent = file.parent();
        if parent != previous {
            starts.push(i);
            previous = parent;
        }
    }

    starts
}

/// First directory start after the range containing `current`; wraps to the
/// first file from the last directory.
pub fn next_directory_start(starts: &[usize], current: usize) -> Option<usize> {
    if starts.is_empty() {
        return None;
    }
    for window in starts.windows(2) {
        if current >= window[0] && current < window[1] {
            return Some(window[1]);
        }
    }
    // Already in the last directory
    Some(0)
}

/// Start of the directory preceding the range containing `current`. From the
/// first directory this lands on the last start index.
pub fn previous_directory_start(starts: &[usize], current: usize) -> Option<usize> {
    if starts.is_empty() {
        return None;
    }
    for i in (1..starts.len()).rev() {
        if current <= starts[i] && current > starts[i - 1] {
            return Some(starts[i - 1]);
        }
    }
    starts.last().copied()
}

/// Run the scan on a dedicated thread. The result arrives on the returned
/// channel; `repaint` wakes the UI when it does.
pub fn spawn_scan(
    dir: PathBuf,
    recurse: bool,
    repaint: Option<egui::Context>,
) -> Receiver<ScanResult> {
    let (tx, rx) = bounded::<ScanResult>(1);

    std::thread::Builder::new()
        .name("mural-scanner".into())
        .spawn(move || {
            let files = scan_directory(&dir, recurse);
            let directory_starts = directory_starts(&files);
            info!(
                count = files.len(),
                directories = directory_starts.len(),
                dir = %dir.display(),
                "scan finished"
            );

            let _ = tx.send(ScanResult {
                files,
                directory_starts,
            });
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        })
        .expect("failed to spawn scanner thread");

    rx
}
