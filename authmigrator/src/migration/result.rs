use crate::migration::exchange::ExchangeFailureKind;
use crate::primitives::AuthSession;

/// Why a migration attempt did not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum RejectionKind {
    /// The authority refused the legacy token; it has been deleted
    PermanentExchangeFailure,
    /// The exchange failed in a way that may be retried; the legacy token is kept
    TransientExchangeFailure,
    /// The exchange succeeded but the session provider refused the new token; the legacy
    /// token is kept
    SignInFailure,
}

impl From<ExchangeFailureKind> for RejectionKind {
    fn from(kind: ExchangeFailureKind) -> Self {
        match kind {
            ExchangeFailureKind::Permanent => Self::PermanentExchangeFailure,
            ExchangeFailureKind::Transient => Self::TransientExchangeFailure,
        }
    }
}

/// Details of a rejected migration.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MigrationRejection {
    /// Category of the failure
    pub kind: RejectionKind,
    /// Human readable reason, taken from the authority or the session provider when available
    pub message: String,
    /// HTTP status of the exchange response, if the failure came from one
    pub status_code: Option<u16>,
}

impl MigrationRejection {
    /// Whether calling `migrate` again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self.kind, RejectionKind::PermanentExchangeFailure)
    }
}

/// The terminal state of one `migrate` call.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum MigrationResult {
    /// A session was already active; it was left untouched and the legacy credential removed
    AlreadyActive {
        /// The session that was already signed in
        session: AuthSession,
    },
    /// No usable legacy credential is stored for the persistence key
    NoLegacyCredential,
    /// The legacy credential was exchanged, the user signed in, and the credential removed
    Migrated {
        /// The newly established session
        session: AuthSession,
    },
    /// The migration failed; see [`MigrationRejection::kind`] for whether the credential was kept
    Rejected {
        /// Why the migration failed
        reason: MigrationRejection,
    },
}

impl MigrationResult {
    /// The session signed in after this call, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::AlreadyActive { session } | Self::Migrated { session } => Some(session),
            Self::NoLegacyCredential | Self::Rejected { .. } => None,
        }
    }

    pub(crate) const fn rejected(
        kind: RejectionKind,
        message: String,
        status_code: Option<u16>,
    ) -> Self {
        Self::Rejected {
            reason: MigrationRejection {
                kind,
                message,
                status_code,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            uid: "uid-1".to_string(),
            provider_id: None,
        }
    }

    #[test]
    fn test_session_accessor() {
        assert_eq!(
            MigrationResult::Migrated { session: session() }.session(),
            Some(&session())
        );
        assert_eq!(
            MigrationResult::AlreadyActive { session: session() }.session(),
            Some(&session())
        );
        assert_eq!(MigrationResult::NoLegacyCredential.session(), None);
        assert_eq!(
            MigrationResult::rejected(RejectionKind::SignInFailure, "nope".to_string(), None)
                .session(),
            None
        );
    }

    #[test]
    fn test_retryable_rejections() {
        let rejection = |kind| MigrationRejection {
            kind,
            message: String::new(),
            status_code: None,
        };
        assert!(!rejection(RejectionKind::PermanentExchangeFailure).is_retryable());
        assert!(rejection(RejectionKind::TransientExchangeFailure).is_retryable());
        assert!(rejection(RejectionKind::SignInFailure).is_retryable());
    }
}
