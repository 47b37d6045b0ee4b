//! Best-effort local copies of generated media.

use std::path::Path;

use tracing::{debug, info};

use super::types::GeneratedMedia;
use crate::item::Item;

/// Longest directory name produced by [`sanitize_file_name`], in bytes.
const MAX_NAME_BYTES: usize = 200;

/// Makes `name` safe to use as a single directory name.
///
/// Reserved characters become `_`, trailing spaces and dots are trimmed and
/// the result is cut to at most 200 bytes on a character boundary.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let mut out = replaced.trim_end_matches([' ', '.']).to_string();
    if out.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out = out.trim_end_matches([' ', '.']).to_string();
    }

    if out.is_empty() {
        "_".to_string()
    } else {
        out
    }
}

/// Copies the item's media into `<dir>/<sanitized stem>/`.
///
/// Returns one warning per failed copy; never fails the item.
pub(crate) async fn archive_media(dir: &Path, item: &Item, media: &GeneratedMedia) -> Vec<String> {
    let target = dir.join(sanitize_file_name(&item.stem()));
    if let Err(e) = tokio::fs::create_dir_all(&target).await {
        return vec![format!(
            "Failed to create archive directory {}: {}",
            target.display(),
            e
        )];
    }

    let mut copies = Vec::with_capacity(media.screenshots.len() + 1);
    if let Some(sheet) = &media.contact_sheet {
        copies.push((sheet.as_path(), target.join("contact_sheet.jpg")));
    }
    for (index, shot) in media.screenshots.iter().enumerate() {
        copies.push((
            shot.as_path(),
            target.join(format!("screenshot_{:02}.jpg", index + 1)),
        ));
    }

    let mut warnings = Vec::new();
    for (from, to) in copies {
        match tokio::fs::copy(from, &to).await {
            Ok(_) => debug!(to = %to.display(), "Archived media"),
            Err(e) => warnings.push(format!("Failed to save {}: {}", to.display(), e)),
        }
    }

    info!(item = %item.id, dir = %target.display(), failed = warnings.len(), "Saved media locally");
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sanitize_reserved_characters() {
        assert_eq!(sanitize_file_name("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name("Movie (2020). . "), "Movie (2020)");
        assert_eq!(sanitize_file_name("..."), "_");
    }

    #[test]
    fn test_sanitize_caps_length_on_char_boundary() {
        let long = "é".repeat(150);
        let out = sanitize_file_name(&long);
        assert!(out.len() <= MAX_NAME_BYTES);
        assert_eq!(out.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_archive_copies_and_reports_failures() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let sheet = work.path().join("sheet.jpg");
        let shot = work.path().join("screenshot_1.jpg");
        tokio::fs::write(&sheet, b"sheet").await.unwrap();
        tokio::fs::write(&shot, b"shot").await.unwrap();

        let item = Item::new("1", "/videos/My: Movie.mkv");
        let media = GeneratedMedia {
            contact_sheet: Some(sheet),
            screenshots: vec![shot, PathBuf::from("/nonexistent/screenshot_2.jpg")],
        };

        let warnings = archive_media(out.path(), &item, &media).await;
        assert_eq!(warnings.len(), 1);

        let target = out.path().join("My_ Movie");
        assert!(target.join("contact_sheet.jpg").exists());
        assert!(target.join("screenshot_01.jpg").exists());
        assert!(!target.join("screenshot_02.jpg").exists());
    }
}
