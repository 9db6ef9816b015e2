use std::path::{Path, PathBuf};

use ab_glyph::FontVec;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
    #[error("no usable font found (searched: {})", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NotFound(Vec<PathBuf>),
}

/// Common sans-serif fonts shipped by desktop Linux, macOS and Windows.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

pub fn load_font(path: &Path) -> Result<FontVec, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // Collections (.ttc) keep their first face at index 0; plain fonts ignore the index.
    FontVec::try_from_vec_and_index(bytes, 0).map_err(|_| FontError::Invalid(path.to_path_buf()))
}

/// Loads `explicit` when given, otherwise the first readable system font.
///
/// An explicit path that fails to load is an error rather than a fallback,
/// so a typo on the command line is reported.
pub fn locate_font(explicit: Option<&Path>) -> Result<FontVec, FontError> {
    if let Some(path) = explicit {
        return load_font(path);
    }
    let candidates: Vec<PathBuf> = SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from).collect();
    first_loadable(&candidates)
}

fn first_loadable(candidates: &[PathBuf]) -> Result<FontVec, FontError> {
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match load_font(path) {
            Ok(font) => {
                log::debug!("Using font {}", path.display());
                return Ok(font);
            }
            Err(e) => log::debug!("Skipping font candidate: {e}"),
        }
    }
    Err(FontError::NotFound(candidates.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_font_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope.ttf");

        let err = locate_font(Some(&path)).unwrap_err();

        assert!(matches!(err, FontError::Read { .. }));
    }

    #[test]
    fn test_garbage_font_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("garbage.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let err = load_font(&path).unwrap_err();

        assert!(matches!(err, FontError::Invalid(_)));
    }

    #[test]
    fn test_no_candidates_lists_searched_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let candidates = vec![tmp.path().join("a.ttf"), tmp.path().join("b.ttf")];

        let err = first_loadable(&candidates).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("a.ttf"));
        assert!(message.contains("b.ttf"));
    }

    #[test]
    fn test_invalid_candidates_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.ttf");
        std::fs::write(&bad, b"xx").unwrap();

        let err = first_loadable(&[bad]).unwrap_err();

        assert!(matches!(err, FontError::NotFound(_)));
    }
}
