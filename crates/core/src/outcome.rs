use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Why a deep-link request ended without delivering or issuing a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    MalformedPayload,
    NotOwner,
    FileGone,
    NeedsJoin,
    ChannelGone,
    RecipientBlocked,
    StorageUnavailable,
}

impl Rejection {
    /// The failure category reported for this rejection.
    #[must_use]
    pub const fn failure_kind(self) -> FailureKind {
        match self {
            Self::MalformedPayload => FailureKind::MalformedPayload,
            Self::NotOwner => FailureKind::NotOwner,
            Self::FileGone => FailureKind::FileGone,
            Self::NeedsJoin => FailureKind::NeedsJoin,
            Self::ChannelGone => FailureKind::ChannelGone,
            Self::RecipientBlocked => FailureKind::RecipientBlocked,
            Self::StorageUnavailable => FailureKind::InvalidRecipientChannel,
        }
    }
}

/// How an issued `finalget` link reached the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuedLink {
    /// Shortener disabled or requester already verified.
    Direct,
    /// Wrapped by the owner's shortener.
    Shortened,
    /// The shortener failed and the raw link was handed out instead.
    Fallback,
}

/// Terminal result of resolving a deep-link request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The stored file was copied to the requester.
    Delivered,
    /// A link leading to the `finalget` step was presented.
    LinkIssued { url: String, kind: IssuedLink },
    Rejected { reason: Rejection },
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn rejected(reason: Rejection) -> Self {
        Self::Rejected { reason }
    }

    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected { reason } => Some(*reason),
            _ => None,
        }
    }
}
