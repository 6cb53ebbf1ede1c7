//! [`LeaseManager`] – exclusive operator lease.
//!
//! At most one [`Identity`] holds the lease at any time.  Every mutating
//! command must present either that identity's token or the administrative
//! override token; [`LeaseManager::authorize`] decides which.
//!
//! The override token authenticates unconditionally.  When no lease is held
//! it also claims the empty session for a synthetic administrative identity.
//! When another operator holds the lease the override is accepted for the
//! command but the holder's identity and token are left untouched.

use chrono::Utc;
use email_address::{EmailAddress, Options};
use leubot_types::{ArmError, Identity, IdentityInfo};
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Display name of the identity installed by the override token.
pub const ADMIN_NAME: &str = "Super User";
/// Contact of the identity installed by the override token.
pub const ADMIN_EMAIL: &str = "root@localhost";

/// How a successful [`LeaseManager::acquire`] came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    /// The lease was empty and is now held by the candidate.
    Fresh,
    /// The candidate already held the lease; a new token replaced the old one.
    Reissued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGrant {
    pub identity: Identity,
    pub kind: GrantKind,
}

/// Result of a successful [`LeaseManager::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Token of the current lease holder.
    Holder,
    /// Override token while another operator holds the lease.
    Override,
    /// Override token claimed the empty session for this identity.
    Provisioned(Identity),
}

/// Owns the single live lease and the override credential.
///
/// # Example
///
/// ```
/// use leubot_kernel::{Authorization, LeaseManager};
///
/// let mut leases = LeaseManager::new(None);
/// let grant = leases.acquire("Ada", "ada@example.org").unwrap();
///
/// assert_eq!(leases.authorize(&grant.identity.token), Ok(Authorization::Holder));
/// assert!(leases.authorize("guess").is_err());
/// ```
#[derive(Default)]
pub struct LeaseManager {
    current: Option<Identity>,
    master_token: Option<Zeroizing<String>>,
}

impl LeaseManager {
    /// Create an empty manager.  An empty or absent `master_token` disables
    /// the override.
    pub fn new(master_token: Option<Zeroizing<String>>) -> Self {
        Self {
            current: None,
            master_token: master_token.filter(|t| !t.is_empty()),
        }
    }

    /// Name and email of the current holder, if any.
    pub fn info(&self) -> Option<IdentityInfo> {
        self.current.as_ref().map(Identity::info)
    }

    pub fn is_held(&self) -> bool {
        self.current.is_some()
    }

    /// Grant the lease to `name` / `email`.
    ///
    /// # Errors
    ///
    /// - [`ArmError::InvalidIdentity`] – `email` is not a well-formed address.
    ///   Checked before any state changes.
    /// - [`ArmError::IdentityConflict`] – a different contact holds the lease.
    pub fn acquire(&mut self, name: &str, email: &str) -> Result<LeaseGrant, ArmError> {
        validate_email(email)?;

        let kind = match &self.current {
            None => GrantKind::Fresh,
            Some(holder) if holder.email == email => GrantKind::Reissued,
            Some(holder) => {
                debug!(holder = %holder.email, candidate = %email, "lease conflict");
                return Err(ArmError::IdentityConflict);
            }
        };

        let identity = Identity {
            name: name.to_string(),
            email: email.to_string(),
            token: generate_token(),
            acquired_at: Utc::now(),
        };
        self.current = Some(identity.clone());
        info!(name = %identity.name, email = %identity.email, ?kind, "lease granted");
        Ok(LeaseGrant { identity, kind })
    }

    /// Drop the lease if `token` belongs to the holder or is the override.
    ///
    /// Returns the identity that held the lease.
    ///
    /// # Errors
    ///
    /// [`ArmError::NotFound`] when no lease is held under `token`, including
    /// when no lease is held at all.
    pub fn release(&mut self, token: &str) -> Result<Identity, ArmError> {
        let matches = match &self.current {
            None => false,
            Some(holder) => holder.token == token || self.is_override(token),
        };
        if !matches {
            return Err(ArmError::NotFound);
        }
        self.clear().ok_or(ArmError::NotFound)
    }

    /// Check `token` for a mutating command.
    ///
    /// # Errors
    ///
    /// - [`ArmError::NoSession`] – no lease is held and `token` is not the
    ///   override.
    /// - [`ArmError::InvalidToken`] – a lease is held under another token.
    pub fn authorize(&mut self, token: &str) -> Result<Authorization, ArmError> {
        if self.is_override(token) {
            if self.current.is_some() {
                return Ok(Authorization::Override);
            }
            let identity = Identity {
                name: ADMIN_NAME.to_string(),
                email: ADMIN_EMAIL.to_string(),
                token: token.to_string(),
                acquired_at: Utc::now(),
            };
            self.current = Some(identity.clone());
            info!("override token claimed the empty session");
            return Ok(Authorization::Provisioned(identity));
        }

        match &self.current {
            None => Err(ArmError::NoSession),
            Some(holder) if holder.token == token => Ok(Authorization::Holder),
            Some(_) => Err(ArmError::InvalidToken),
        }
    }

    /// Unconditionally drop the lease, returning the former holder.
    pub fn clear(&mut self) -> Option<Identity> {
        self.current.take()
    }

    fn is_override(&self, token: &str) -> bool {
        self.master_token
            .as_ref()
            .is_some_and(|master| master.as_str() == token)
    }
}

fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Well-formedness check for a contact address.
///
/// Parses `email` as an RFC 5322 addr-spec.  A display name such as
/// `Ada <ada@example.org>` is refused; single-label domains like
/// `localhost` are accepted.
pub fn validate_email(email: &str) -> Result<(), ArmError> {
    EmailAddress::parse_with_options(email, Options::default().without_display_text())
        .map(|_| ())
        .map_err(|e| ArmError::InvalidIdentity(format!("malformed email address {email:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_master(token: &str) -> LeaseManager {
        LeaseManager::new(Some(Zeroizing::new(token.to_string())))
    }

    #[test]
    fn fresh_acquire_grants_token() {
        let mut leases = LeaseManager::new(None);
        let grant = leases.acquire("Ada", "ada@example.org").unwrap();
        assert_eq!(grant.kind, GrantKind::Fresh);
        assert_eq!(grant.identity.token.len(), 32);
        assert_eq!(leases.info(), Some(grant.identity.info()));
    }

    #[test]
    fn reacquire_same_contact_reissues_token() {
        let mut leases = LeaseManager::new(None);
        let first = leases.acquire("Ada", "ada@example.org").unwrap();
        let second = leases.acquire("Ada L.", "ada@example.org").unwrap();

        assert_eq!(second.kind, GrantKind::Reissued);
        assert_ne!(first.identity.token, second.identity.token);
        // The old token is no longer recognized.
        assert_eq!(
            leases.authorize(&first.identity.token),
            Err(ArmError::InvalidToken)
        );
        assert_eq!(
            leases.authorize(&second.identity.token),
            Ok(Authorization::Holder)
        );
    }

    #[test]
    fn second_contact_conflicts_without_overwriting() {
        let mut leases = LeaseManager::new(None);
        let first = leases.acquire("Ada", "ada@example.org").unwrap();
        let result = leases.acquire("Bob", "bob@example.org");
        assert_eq!(result, Err(ArmError::IdentityConflict));
        assert_eq!(leases.info(), Some(first.identity.info()));
        assert_eq!(
            leases.authorize(&first.identity.token),
            Ok(Authorization::Holder)
        );
    }

    #[test]
    fn malformed_email_rejected_before_mutation() {
        let mut leases = LeaseManager::new(None);
        let first = leases.acquire("Ada", "ada@example.org").unwrap();
        let result = leases.acquire("Ada", "not-an-address");
        assert!(matches!(result, Err(ArmError::InvalidIdentity(_))));
        assert_eq!(
            leases.authorize(&first.identity.token),
            Ok(Authorization::Holder)
        );
    }

    #[test]
    fn release_by_holder() {
        let mut leases = LeaseManager::new(None);
        let grant = leases.acquire("Ada", "ada@example.org").unwrap();
        let released = leases.release(&grant.identity.token).unwrap();
        assert_eq!(released.email, "ada@example.org");
        assert!(!leases.is_held());
    }

    #[test]
    fn release_outcomes_without_match() {
        let mut leases = LeaseManager::new(None);
        assert_eq!(leases.release("anything"), Err(ArmError::NotFound));
        leases.acquire("Ada", "ada@example.org").unwrap();
        assert_eq!(leases.release("wrong"), Err(ArmError::NotFound));
        assert!(leases.is_held());
    }

    #[test]
    fn authorize_without_lease_is_no_session() {
        let mut leases = with_master("master");
        assert_eq!(leases.authorize("whatever"), Err(ArmError::NoSession));
    }

    #[test]
    fn override_claims_empty_session() {
        let mut leases = with_master("master");
        let auth = leases.authorize("master").unwrap();
        let Authorization::Provisioned(identity) = auth else {
            panic!("expected provisioning, got {auth:?}");
        };
        assert_eq!(identity.email, ADMIN_EMAIL);
        assert_eq!(leases.info(), Some(identity.info()));
        // Second use authenticates against the installed lease.
        assert_eq!(leases.authorize("master"), Ok(Authorization::Override));
    }

    #[test]
    fn override_does_not_hijack_held_lease() {
        let mut leases = with_master("master");
        let grant = leases.acquire("Ada", "ada@example.org").unwrap();

        assert_eq!(leases.authorize("master"), Ok(Authorization::Override));
        assert_eq!(leases.authorize("master"), Ok(Authorization::Override));

        assert_eq!(leases.info(), Some(grant.identity.info()));
        assert_eq!(
            leases.authorize(&grant.identity.token),
            Ok(Authorization::Holder)
        );
    }

    #[test]
    fn override_can_release_any_lease() {
        let mut leases = with_master("master");
        leases.acquire("Ada", "ada@example.org").unwrap();
        assert!(leases.release("master").is_ok());
        assert!(!leases.is_held());
    }

    #[test]
    fn empty_master_token_disables_override() {
        let mut leases = with_master("");
        assert_eq!(leases.authorize(""), Err(ArmError::NoSession));
    }

    #[test]
    fn email_format() {
        for ok in [
            "a@b",
            ADMIN_EMAIL,
            "ada.lovelace+arm@example.org",
            "x_y@sub-domain.example.ch",
        ] {
            assert!(validate_email(ok).is_ok(), "{ok}");
        }
        for bad in [
            "",
            "@example.org",
            "ada@",
            "ada",
            "ada@example..org",
            "ada lovelace@example.org",
            "Ada <ada@example.org>",
        ] {
            assert!(validate_email(bad).is_err(), "{bad}");
        }
    }
}
