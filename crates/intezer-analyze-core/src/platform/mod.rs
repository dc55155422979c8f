#[cfg(target_os = "windows")]
pub mod windows;

use std::path::Path;

/// Windows: HIDDEN or SYSTEM attribute. Elsewhere: dot-prefixed file name.
#[cfg(target_os = "windows")]
pub fn is_hidden(path: &Path) -> bool {
    windows::is_hidden(path)
}

#[cfg(not(target_os = "windows"))]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(all(test, not(target_os = "windows")))]
mod tests {
    use super::*;

    #[test]
    fn test_dot_files_are_hidden() {
        assert!(is_hidden(Path::new("/tmp/samples/.DS_Store")));
        assert!(is_hidden(Path::new(".git")));
        assert!(!is_hidden(Path::new("/tmp/.cache/sample.exe")));
        assert!(!is_hidden(Path::new("sample.exe")));
    }
}
