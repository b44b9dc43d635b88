use crate::constants::*;
use crate::error::ValidationError;

/// Which MIME types an upload slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedTypes {
    /// Exactly the JPEG / PNG / WebP set.
    Listed,
    /// Anything under `image/`.
    AnyImage,
}

/// Type and size limits for one upload slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    pub accepted: AcceptedTypes,
    pub max_size: usize,
}

/// Chat attachments and avatars.
pub const ATTACHMENT_POLICY: ImagePolicy = ImagePolicy {
    accepted: AcceptedTypes::Listed,
    max_size: MAX_FILE_SIZE,
};

/// Site logo uploaded from the admin panel.
pub const LOGO_POLICY: ImagePolicy = ImagePolicy {
    accepted: AcceptedTypes::AnyImage,
    max_size: MAX_FILE_SIZE,
};

/// General image uploaded from the admin panel.
pub const ADMIN_IMAGE_POLICY: ImagePolicy = ImagePolicy {
    accepted: AcceptedTypes::AnyImage,
    max_size: MAX_ADMIN_IMAGE_SIZE,
};

impl ImagePolicy {
    pub fn with_max_size(self, max_size: usize) -> Self {
        Self { max_size, ..self }
    }

    /// Type is checked before size, so an oversized PDF reports the type.
    pub fn check(&self, mime_type: &str, size: usize) -> Result<(), ValidationError> {
        match self.accepted {
            AcceptedTypes::Listed if !ALLOWED_IMAGE_TYPES.contains(&mime_type) => {
                return Err(ValidationError::UnsupportedImageType(mime_type.to_string()));
            }
            AcceptedTypes::AnyImage if !mime_type.starts_with("image/") => {
                return Err(ValidationError::NotAnImage(mime_type.to_string()));
            }
            _ => {}
        }
        if size > self.max_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }
}

pub fn validate_image_file(mime_type: &str, size: usize) -> Result<(), ValidationError> {
    ATTACHMENT_POLICY.check(mime_type, size)
}

/// Text after the last dot; empty when there is none or the name starts
/// with it (`.hidden`).
pub fn file_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[idx + 1..],
        _ => "",
    }
}

pub fn is_valid_image_extension(filename: &str) -> bool {
    let ext = file_extension(filename).to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// MIME type for the accepted image extensions, `None` for anything else.
pub fn mime_from_extension(filename: &str) -> Option<&'static str> {
    match file_extension(filename).to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Trim `value` and reject it when nothing is left.
pub fn require_field<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_policy_rejects_gif_and_oversize() {
        assert!(validate_image_file("image/png", 1024).is_ok());
        assert_eq!(
            validate_image_file("image/gif", 10),
            Err(ValidationError::UnsupportedImageType("image/gif".into()))
        );
        assert!(matches!(
            validate_image_file("image/webp", MAX_FILE_SIZE + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
        assert!(validate_image_file("image/jpeg", MAX_FILE_SIZE).is_ok());
    }

    #[test]
    fn admin_policies_accept_any_image_type() {
        assert!(LOGO_POLICY.check("image/svg+xml", 100).is_ok());
        assert!(LOGO_POLICY.check("application/pdf", 100).is_err());
        assert!(LOGO_POLICY.check("image/gif", MAX_FILE_SIZE + 1).is_err());
        assert!(ADMIN_IMAGE_POLICY.check("image/gif", MAX_FILE_SIZE + 1).is_ok());
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(file_extension("photo.final.JPG"), "JPG");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".bashrc"), "");
        assert!(is_valid_image_extension("cat.WebP"));
        assert!(!is_valid_image_extension("cat.gif"));
        assert_eq!(mime_from_extension("a.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_from_extension("a.txt"), None);
    }

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(require_field("Username", "  neo "), Ok("neo"));
        assert_eq!(
            require_field("Display name", "   "),
            Err(ValidationError::MissingField("Display name"))
        );
    }
}
