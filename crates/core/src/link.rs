//! Deep-link payload codec.
//!
//! A deep link carries a `start` payload of the form
//! `<kind>_<owner_id>_<file_unique_id>`. The file unique id is opaque and may
//! itself contain underscores, so decoding splits into at most three parts
//! and treats everything after the second underscore as the id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UserId;

/// Errors produced while decoding a deep-link payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The payload does not match any recognised `<kind>_<owner>_<file>` shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// The three recognised deep-link kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// First-touch public request, subject to gating.
    PublicGet,
    /// The owner retrieving their own file.
    OwnerGet,
    /// Post-verification retrieval.
    FinalGet,
}

impl LinkKind {
    /// Every kind, used to check that routing tables are exhaustive.
    pub const ALL: [Self; 3] = [Self::PublicGet, Self::OwnerGet, Self::FinalGet];

    /// The payload prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::PublicGet => "get",
            Self::OwnerGet => "ownerget",
            Self::FinalGet => "finalget",
        }
    }

    /// Look up a kind by its payload prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == prefix)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifies a stored file scoped to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilePayload {
    pub owner_id: UserId,
    pub file_unique_id: String,
}

impl FilePayload {
    #[must_use]
    pub fn new(owner_id: UserId, file_unique_id: impl Into<String>) -> Self {
        Self {
            owner_id,
            file_unique_id: file_unique_id.into(),
        }
    }

    /// The `<owner>_<file>` composite used in deep links and `/get/` URLs.
    #[must_use]
    pub fn composite_id(&self) -> String {
        format!("{}_{}", self.owner_id, self.file_unique_id)
    }
}

/// A decoded deep-link request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeepLinkRequest {
    OwnerGet(FilePayload),
    FinalGet(FilePayload),
    PublicGet(FilePayload),
}

impl DeepLinkRequest {
    /// Build a request of the given kind.
    #[must_use]
    pub fn new(kind: LinkKind, payload: FilePayload) -> Self {
        match kind {
            LinkKind::PublicGet => Self::PublicGet(payload),
            LinkKind::OwnerGet => Self::OwnerGet(payload),
            LinkKind::FinalGet => Self::FinalGet(payload),
        }
    }

    /// Decode a raw `start` payload.
    pub fn decode(raw: &str) -> Result<Self, LinkError> {
        let malformed = || LinkError::MalformedPayload(raw.to_owned());

        let mut parts = raw.splitn(3, '_');
        let (Some(prefix), Some(owner), Some(file_unique_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let kind = LinkKind::from_prefix(prefix).ok_or_else(malformed)?;
        let owner_id: UserId = owner.parse().map_err(|_| malformed())?;
        if file_unique_id.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(kind, FilePayload::new(owner_id, file_unique_id)))
    }

    /// Encode back into the wire payload.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self.kind(), self.payload().owner_id, &self.payload().file_unique_id)
    }

    #[must_use]
    pub fn kind(&self) -> LinkKind {
        match self {
            Self::PublicGet(_) => LinkKind::PublicGet,
            Self::OwnerGet(_) => LinkKind::OwnerGet,
            Self::FinalGet(_) => LinkKind::FinalGet,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &FilePayload {
        match self {
            Self::PublicGet(p) | Self::OwnerGet(p) | Self::FinalGet(p) => p,
        }
    }

    #[must_use]
    pub fn into_payload(self) -> FilePayload {
        match self {
            Self::PublicGet(p) | Self::OwnerGet(p) | Self::FinalGet(p) => p,
        }
    }
}

impl FromStr for DeepLinkRequest {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for DeepLinkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Join a kind, owner, and file id into a deep-link payload.
#[must_use]
pub fn encode(kind: LinkKind, owner_id: UserId, file_unique_id: &str) -> String {
    format!("{}_{owner_id}_{file_unique_id}", kind.prefix())
}

/// Render the full `https://t.me/<bot>?start=<payload>` deep link.
#[must_use]
pub fn deep_link_url(bot_username: &str, request: &DeepLinkRequest) -> String {
    format!(
        "https://t.me/{}?start={}",
        bot_username.trim_start_matches('@'),
        request.encode()
    )
}
