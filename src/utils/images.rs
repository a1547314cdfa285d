//! Embedding image files into documents as base64 and back.

use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::PersistenceError;

/// Replace every character that is not alphanumeric (in any script) or one
/// of `._-` with `_`.
///
/// Used for embedded-image keys, so the result is always a single path
/// component. Not injective; callers that need distinct names must check
/// for collisions.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

/// Embedding key for an image path: its sanitized base name.
pub fn embed_key(path: &str) -> Option<String> {
    let base = Path::new(path).file_name()?.to_string_lossy();
    Some(sanitize_file_name(&base))
}

pub fn encode_file(path: &Path) -> Result<String, PersistenceError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(STANDARD.encode(bytes))
}

/// Decode `data` into `path`, creating parent directories as needed.
pub fn decode_to_file(name: &str, data: &str, path: &Path) -> Result<(), PersistenceError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|source| PersistenceError::Decode {
            name: name.to_string(),
            source,
        })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| PersistenceError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_to_a_single_component() {
        assert_eq!(sanitize_file_name("ok-button.png"), "ok-button.png");
        assert_eq!(sanitize_file_name("my image (2).png"), "my_image__2_.png");
        assert_eq!(sanitize_file_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_file_name(".."), "_..");
        assert_eq!(sanitize_file_name(""), "_");
        assert_eq!(sanitize_file_name("按钮 1.png"), "按钮_1.png");
        assert_ne!(sanitize_file_name("按钮.png"), sanitize_file_name("图标.png"));
    }

    #[test]
    fn embed_key_uses_base_name() {
        assert_eq!(embed_key("/tmp/x/ok button.png").as_deref(), Some("ok_button.png"));
        assert_eq!(embed_key(""), None);
    }

    #[test]
    fn encode_then_decode_restores_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.png");
        fs::write(&src, [0u8, 159, 146, 150, 255]).unwrap();
        let data = encode_file(&src).unwrap();

        let dst = dir.path().join("nested/out.png");
        decode_to_file("in.png", &data, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_to_file("x.png", "!!!not base64", &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { .. }));
    }
}
