//! Artifact validation
//!
//! The same rules run on the client when a file is selected or dropped and on
//! the server before an upload is forwarded to the analysis backend.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Missing file extension: {0}")]
    MissingExtension(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Validates artifacts by extension and size.
#[derive(Debug, Clone)]
pub struct ArtifactValidator {
    max_size: usize,
    allowed_extensions: Vec<String>,
}

impl ArtifactValidator {
    pub fn new(max_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// `.apk` only, 50 MB
    pub fn apk() -> Self {
        Self::new(50 * 1024 * 1024, vec!["apk".to_string()])
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_size,
            });
        }

        Ok(())
    }

    pub fn validate(&self, filename: &str, size: usize) -> Result<(), ValidationError> {
        self.validate_extension(filename)?;
        self.validate_size(size)
    }
}

/// Human-readable size, e.g. `0 Bytes`, `1.5 KB`, `10 MB`.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut index = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && index < UNITS.len() - 1 {
        value /= 1024.0;
        index += 1;
    }

    let mut rendered = format!("{:.*}", decimals, value);
    if rendered.contains('.') {
        rendered = rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }

    format!("{} {}", rendered, UNITS[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_apk_case_insensitive() {
        let validator = ArtifactValidator::apk();
        assert!(validator.validate_extension("app.apk").is_ok());
        assert!(validator.validate_extension("App.APK").is_ok());
    }

    #[test]
    fn test_rejects_other_extensions() {
        let validator = ArtifactValidator::apk();
        match validator.validate_extension("notes.txt") {
            Err(ValidationError::InvalidExtension { extension, .. }) => {
                assert_eq!(extension, "txt")
            }
            other => panic!("expected InvalidExtension, got {:?}", other),
        }
        assert!(matches!(
            validator.validate_extension("apk"),
            Err(ValidationError::MissingExtension(_))
        ));
        assert!(validator.validate_extension("app.apk.zip").is_err());
    }

    #[test]
    fn test_leading_dot_in_allowed_list() {
        let validator = ArtifactValidator::new(10, vec![".APK".to_string()]);
        assert!(validator.validate_extension("x.apk").is_ok());
    }

    #[test]
    fn test_size_limits() {
        let validator = ArtifactValidator::new(10, vec!["apk".to_string()]);
        assert!(matches!(
            validator.validate_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(validator.validate_size(10).is_ok());
        assert!(matches!(
            validator.validate_size(11),
            Err(ValidationError::FileTooLarge { size: 11, max: 10 })
        ));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 2), "0 Bytes");
        assert_eq!(format_bytes(1000, 2), "1000 Bytes");
        assert_eq!(format_bytes(1536, 2), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024, 2), "10 MB");
        assert_eq!(format_bytes(1_234_567, 2), "1.18 MB");
        assert_eq!(format_bytes(1_234_567, 0), "1 MB");
    }
}
