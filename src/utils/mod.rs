// heic2jpg/src/utils/mod.rs
use std::path::Path;

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as i32).clamp(0, UNITS.len() as i32 - 1);
    let size = bytes_f64 / base.powi(exponent);

    format!("{:.1} {}", size, UNITS[exponent as usize])
}

/// Replaces characters that would break a `Content-Disposition` filename or a path.
pub fn sanitize_filename(filename: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    filename
        .chars()
        .map(|c| if invalid_chars.contains(&c) || c.is_control() { '_' } else { c })
        .collect()
}

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|s| s.to_lowercase())
}

/// Lowercased, dot-prefixed form used for extension comparisons.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

/// True when `name` names a single entry inside a directory: no separators, no traversal.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50.0 MB");
        assert_eq!(format_file_size(1536), "1.5 KB");
    }

    #[test]
    fn sanitize_replaces_separators_and_quotes() {
        assert_eq!(sanitize_filename("a/b\\c\"d.jpg"), "a_b_c_d.jpg");
        assert_eq!(sanitize_filename("holiday.jpg"), "holiday.jpg");
    }

    #[test]
    fn extensions_normalise() {
        assert_eq!(normalize_extension("HEIC"), ".heic");
        assert_eq!(normalize_extension(".Heif"), ".heif");
        assert_eq!(get_file_extension(Path::new("x.JPG")).as_deref(), Some("jpg"));
        assert_eq!(get_file_extension(Path::new("x")), None);
    }

    #[test]
    fn plain_file_names_reject_traversal() {
        assert!(is_plain_file_name("0f1e.jpg"));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name("a/b.jpg"));
        assert!(!is_plain_file_name(""));
    }
}
