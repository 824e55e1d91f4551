// ============================================================================
// FILE OUTPUT — write downloads to disk or through a native save dialog
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rfd::FileDialog;

use crate::session::DownloadFile;

/// Replace characters that are not allowed in file names on common
/// platforms.  A name that ends up empty becomes `untitled`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() { "untitled".to_string() } else { cleaned }
}

/// Write `file` to `path`.
pub fn write_file(file: &DownloadFile, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&file.bytes)?;
    writer.flush()?;
    log_info!("IO: wrote {} ({} bytes)", path.display(), file.bytes.len());
    Ok(())
}

/// Write `file` into `dir` under its (sanitized) download name.
pub fn write_download(file: &DownloadFile, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(sanitize_file_name(&file.file_name));
    write_file(file, &path)?;
    Ok(path)
}

/// Ask the user where to save `file`.  `None` when the dialog was cancelled.
pub fn save_with_dialog(file: &DownloadFile) -> Option<std::io::Result<PathBuf>> {
    let name = sanitize_file_name(&file.file_name);
    let ext = Path::new(&name).extension().and_then(|e| e.to_str()).unwrap_or("").to_string();

    let mut dialog = FileDialog::new().set_file_name(name.as_str());
    if !ext.is_empty() {
        dialog = dialog.add_filter(&ext.to_uppercase(), &[ext.as_str()]);
    }
    let path = dialog.save_file()?;
    Some(write_file(file, &path).map(|_| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_path_separators() {
        assert_eq!(sanitize_file_name("a/b\\c.jpg"), "a_b_c.jpg");
        assert_eq!(sanitize_file_name("경복궁: 근정전?.txt"), "경복궁_ 근정전_.txt");
        assert_eq!(sanitize_file_name("  ..  "), "untitled");
    }

    #[test]
    fn download_lands_in_directory() {
        let dir = std::env::temp_dir().join(format!("heritagepromo-io-{}", uuid::Uuid::new_v4()));
        let file = DownloadFile { file_name: "탑/plan.txt".into(), mime: "text/plain", bytes: b"hello".to_vec() };

        let path = write_download(&file, &dir).unwrap();
        assert_eq!(path, dir.join("탑_plan.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
