use headless_chrome::types::PrintToPdfOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A4 paper, in inches
pub const A4_INCHES: (f64, f64) = (8.27, 11.69);

pub fn a4_print_options() -> PrintToPdfOptions {
    let (width, height) = A4_INCHES;
    PrintToPdfOptions {
        landscape: Some(false),
        paper_width: Some(width),
        paper_height: Some(height),
        ..Default::default()
    }
}

/// `<title>.pdf`, with path separators replaced so the file
/// always lands in the current directory
pub fn pdf_filename(title: &str) -> PathBuf {
    let title = title.trim();
    let stem: String = if title.is_empty() {
        "untitled".to_string()
    } else {
        title
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect()
    };
    PathBuf::from(format!("{}.pdf", stem))
}

/// Writes next to `path` then renames over it, so `path` is either
/// the complete document or left untouched
pub fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
