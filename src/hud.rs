//! Status text shown in the control window and overlaid on panels.

use std::path::Path;

/// Parent directory of `path` relative to the scan root, with the root
/// itself shown as `.`. Paths outside the root are shown as-is.
pub fn relative_dir(root: &Path, path: &Path) -> String {
    let parent = match path.parent() {
        Some(p) => p,
        None => return ".".to_string(),
    };

    match parent.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => Path::new(".").join(rel).display().to_string(),
        Err(_) => parent.display().to_string(),
    }
}

/// Three-line status block:
/// position / total, relative directory, filename with original size and the
/// size after fitting to the panel.
pub fn format_status(
    current: usize,
    total: usize,
    root: &Path,
    path: &Path,
    original: (u32, u32),
    fitted: (u32, u32),
) -> String {
    let pad = total.to_string().len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        "{:0pad$} / {}\n{}\n{} [{}, {}({}, {})]",
        current + 1,
        total,
        relative_dir(root, path),
        name,
        original.0,
        original.1,
        fitted.0,
        fitted.1,
        pad = pad,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_dir_of_root_file_is_dot() {
        let root = PathBuf::from("/pics");
        assert_eq!(relative_dir(&root, &root.join("a.png")), ".");
    }

    #[test]
    fn relative_dir_of_nested_file() {
        let root = PathBuf::from("/pics");
        let nested = root.join("trip").join("day2").join("a.png");
        let rel = relative_dir(&root, &nested);
        assert_eq!(rel, Path::new(".").join("trip").join("day2").display().to_string());
    }

    #[test]
    fn relative_dir_outside_root_kept_absolute() {
        let root = PathBuf::from("/pics");
        let other = PathBuf::from("/other/a.png");
        assert_eq!(relative_dir(&root, &other), Path::new("/other").display().to_string());
    }

    #[test]
    fn status_pads_index_to_total_width() {
        let root = PathBuf::from("/pics");
        let path = root.join("shot7.png");
        let text = format_status(6, 120, &root, &path, (4000, 3000), (1440, 1080));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "007 / 120");
        assert_eq!(lines[1], ".");
        assert_eq!(lines[2], "shot7.png [4000, 3000(1440, 1080)]");
    }
}
