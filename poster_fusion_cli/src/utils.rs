use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{FusionError, GeneratedPoster};

/// Reads an image from disk, guessing its media type from the extension.
pub fn read_image(path: &Path) -> Result<(Vec<u8>, String), FusionError> {
    let bytes = fs::read(path)?;
    let media_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok((bytes, media_type))
}

/// Writes the poster as `poster-<id>.png` inside `dir`.
pub fn save_poster(poster: &GeneratedPoster, dir: &Path) -> Result<PathBuf, FusionError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(poster.file_name());
    let mut file = File::create(&path)?;
    file.write_all(&poster.src.bytes)?;
    println!("✅ {} written.", path.display());
    Ok(path)
}

pub fn save_json(data: &serde_json::Value, path: &Path) -> Result<(), FusionError> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(data)?.as_bytes())?;
    println!("✅ {} written.", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImagePayload;

    #[test]
    fn media_type_comes_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("bottle.png");
        fs::write(&png, b"png-bytes").unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        let (bytes, media_type) = read_image(&png).unwrap();
        assert_eq!(bytes, b"png-bytes");
        assert_eq!(media_type, "image/png");

        let (_, media_type) = read_image(&txt).unwrap();
        assert_eq!(media_type, "text/plain");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image(&dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, FusionError::Io(_)));
    }

    #[test]
    fn poster_saved_under_its_download_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let poster = GeneratedPoster::new("42", ImagePayload::new("image/png", b"img".to_vec()));

        let path = save_poster(&poster, &out).unwrap();
        assert_eq!(path, out.join("poster-42.png"));
        assert_eq!(fs::read(path).unwrap(), b"img");
    }
}
