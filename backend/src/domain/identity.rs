//! Caller identity value objects.
//!
//! Authentication happens upstream; the booking domain only sees an optional
//! member id taken from the session and an optional guest email supplied
//! with the request. At least one of them must be present for a requester.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted length of a guest email address.
pub const GUEST_EMAIL_MAX: usize = 254;

/// Validation errors raised while building identity values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("user id must be a valid UUID")]
    InvalidUserId,
    #[error("guest email must not be empty")]
    EmptyEmail,
    #[error("guest email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("guest email must look like local@domain")]
    MalformedEmail,
    #[error("an authenticated user or a guest email is required")]
    MissingIdentity,
}

/// Stable member identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, IdentityValidationError> {
        if id.is_empty() {
            return Err(IdentityValidationError::EmptyUserId);
        }
        if id.trim() != id {
            return Err(IdentityValidationError::InvalidUserId);
        }
        let parsed = Uuid::parse_str(&id).map_err(|_| IdentityValidationError::InvalidUserId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Email address used as the fallback identity of unauthenticated guests.
///
/// Stored lower-cased so ownership checks compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuestEmail(String);

impl GuestEmail {
    /// Validate, trim, and normalise an email address.
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::GuestEmail;
    ///
    /// let email = GuestEmail::new(" Guest@Example.COM ").expect("valid email");
    /// assert_eq!(email.as_ref(), "guest@example.com");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyEmail);
        }
        if trimmed.chars().count() > GUEST_EMAIL_MAX {
            return Err(IdentityValidationError::EmailTooLong {
                max: GUEST_EMAIL_MAX,
            });
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(IdentityValidationError::MalformedEmail);
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok || trimmed.chars().any(char::is_whitespace) {
            return Err(IdentityValidationError::MalformedEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }
}

impl AsRef<str> for GuestEmail {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for GuestEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<GuestEmail> for String {
    fn from(value: GuestEmail) -> Self {
        value.0
    }
}

impl TryFrom<String> for GuestEmail {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Who asked for a reservation.
///
/// ## Invariants
/// - At least one of `user_id` or `email` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    user_id: Option<UserId>,
    email: Option<GuestEmail>,
}

impl Requester {
    /// Build a requester, rejecting fully anonymous callers.
    pub fn new(
        user_id: Option<UserId>,
        email: Option<GuestEmail>,
    ) -> Result<Self, IdentityValidationError> {
        if user_id.is_none() && email.is_none() {
            return Err(IdentityValidationError::MissingIdentity);
        }
        Ok(Self { user_id, email })
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn email(&self) -> Option<&GuestEmail> {
        self.email.as_ref()
    }

    /// Whether `caller` may act on a reservation made by this requester.
    ///
    /// A matching member id always wins. Email matching only applies when the
    /// reservation was made anonymously, so a member's booking cannot be
    /// cancelled by someone who merely knows their address.
    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        match (&self.user_id, caller.user_id()) {
            (Some(owner), Some(candidate)) => owner == candidate,
            (Some(_), None) => false,
            (None, _) => match (&self.email, caller.email()) {
                (Some(owner), Some(candidate)) => owner == candidate,
                _ => false,
            },
        }
    }
}

/// Identity presented by the caller of a mutating operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    user_id: Option<UserId>,
    email: Option<GuestEmail>,
}

impl Caller {
    pub fn new(user_id: Option<UserId>, email: Option<GuestEmail>) -> Self {
        Self { user_id, email }
    }

    /// An unauthenticated caller without an email.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn email(&self) -> Option<&GuestEmail> {
        self.email.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("no-at-sign")]
    #[case("@example.com")]
    #[case("guest@localhost")]
    #[case("guest@.example.com")]
    #[case("gu est@example.com")]
    fn rejects_malformed_emails(#[case] raw: &str) {
        assert!(GuestEmail::new(raw).is_err());
    }

    #[rstest]
    fn user_id_rejects_padding() {
        let padded = format!(" {} ", Uuid::nil());
        assert_eq!(
            UserId::new(padded),
            Err(IdentityValidationError::InvalidUserId)
        );
    }

    #[rstest]
    fn requester_needs_some_identity() {
        assert_eq!(
            Requester::new(None, None),
            Err(IdentityValidationError::MissingIdentity)
        );
    }

    #[rstest]
    fn member_booking_ignores_email_match() {
        let email = GuestEmail::new("guest@example.com").expect("email");
        let requester =
            Requester::new(Some(UserId::random()), Some(email.clone())).expect("requester");
        let caller = Caller::new(None, Some(email));
        assert!(!requester.is_owned_by(&caller));
    }

    #[rstest]
    fn anonymous_booking_matches_email_case_insensitively() {
        let requester = Requester::new(
            None,
            Some(GuestEmail::new("Guest@Example.com").expect("email")),
        )
        .expect("requester");
        let caller = Caller::new(None, Some(GuestEmail::new("guest@example.COM").expect("email")));
        assert!(requester.is_owned_by(&caller));
    }

    #[rstest]
    fn member_booking_matches_member_id() {
        let user = UserId::random();
        let requester = Requester::new(Some(user.clone()), None).expect("requester");
        assert!(requester.is_owned_by(&Caller::new(Some(user), None)));
        assert!(!requester.is_owned_by(&Caller::new(Some(UserId::random()), None)));
    }
}
