//! Gravatar URL construction.

use md5::{Digest, Md5};

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar";

/// Query options of a Gravatar URL.
#[derive(Clone, Debug)]
pub struct AvatarOptions {
    /// Image size in pixels.
    pub size: u16,
    /// Highest allowed content rating.
    pub rating: String,
    /// Image served when the email has no Gravatar.
    pub fallback: String,
}

impl Default for AvatarOptions {
    fn default() -> Self {
        Self {
            size: 200,
            rating: "pg".into(),
            fallback: "mm".into(),
        }
    }
}

/// Build the Gravatar URL for an email address.
///
/// Gravatar identifies accounts by the MD5 digest of the trimmed, lowercased
/// address, so the result is stable for a given email.
pub fn gravatar_url(email: &str, options: &AvatarOptions) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());

    format!(
        "{GRAVATAR_BASE}/{}?s={}&r={}&d={}",
        hex::encode(digest),
        options.size,
        options.rating,
        options.fallback
    )
}
