//! Authentication primitives: login credentials, password digests, and
//! bearer session tokens.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{ARGON2ID_IDENT, Argon2};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::Error;
use crate::domain::user::{EmailAddress, PersonName, RoleProfile, UserValidationError};

/// Domain error returned when login or registration payloads are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Email was missing or malformed.
    #[error("email must be a valid address")]
    InvalidEmail,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// Password is shorter than [`PASSWORD_MIN`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    /// A user attribute failed validation.
    #[error(transparent)]
    User(#[from] UserValidationError),
}

/// Minimum password length accepted on registration.
pub const PASSWORD_MIN: usize = 8;

/// Validated login credentials used by authentication services.
///
/// ## Invariants
/// - `email` is trimmed, lower-cased, and syntactically valid.
/// - `password` is non-empty and retains caller-provided whitespace.
///
/// # Examples
/// ```
/// use registrar::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Ada@Example.edu", "secret").unwrap();
/// assert_eq!(creds.email().as_ref(), "ada@example.edu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = EmailAddress::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email used for account lookups.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated request to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: PersonName,
    pub email: EmailAddress,
    pub profile: RoleProfile,
    password: Zeroizing<String>,
}

impl NewAccount {
    /// Validate account fields. The password must be at least
    /// [`PASSWORD_MIN`] characters.
    pub fn try_new(
        name: &str,
        email: &str,
        password: &str,
        profile: RoleProfile,
    ) -> Result<Self, LoginValidationError> {
        let name = PersonName::new(name)?;
        let email = EmailAddress::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        check_new_password(password)?;
        Ok(Self {
            name,
            email,
            profile,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Argon2id digest of the supplied password.
    pub fn digest(&self) -> Result<PasswordDigest, PasswordHashError> {
        PasswordDigest::generate(self.password.as_str())
    }
}

fn check_new_password(password: &str) -> Result<(), LoginValidationError> {
    if password.is_empty() {
        return Err(LoginValidationError::EmptyPassword);
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(LoginValidationError::PasswordTooShort { min: PASSWORD_MIN });
    }
    Ok(())
}

/// Validated administrator edit of an existing account.
///
/// Every attribute is replaced. A password is optional: `None` keeps the
/// current one, `Some` resets it under the same rules as registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub name: PersonName,
    pub email: EmailAddress,
    pub profile: RoleProfile,
    password: Option<Zeroizing<String>>,
}

impl AccountUpdate {
    /// Validate the edit. An empty password means "keep the current one".
    pub fn try_new(
        name: &str,
        email: &str,
        profile: RoleProfile,
        password: Option<&str>,
    ) -> Result<Self, LoginValidationError> {
        let name = PersonName::new(name)?;
        let email = EmailAddress::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        let password = match password.filter(|value| !value.is_empty()) {
            Some(value) => {
                check_new_password(value)?;
                Some(Zeroizing::new(value.to_owned()))
            }
            None => None,
        };
        Ok(Self {
            name,
            email,
            profile,
            password,
        })
    }

    pub fn resets_password(&self) -> bool {
        self.password.is_some()
    }

    /// Digest of the replacement password, if one was supplied.
    pub fn digest(&self) -> Result<Option<PasswordDigest>, PasswordHashError> {
        self.password
            .as_ref()
            .map(|password| PasswordDigest::generate(password.as_str()))
            .transpose()
    }
}

/// Failure while hashing a password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

impl From<PasswordHashError> for Error {
    fn from(value: PasswordHashError) -> Self {
        Error::internal(value.to_string())
    }
}

/// Argon2id password hash stored as a PHC string (`$argon2id$v=19$...`).
///
/// The salt and parameters travel inside the string, so verification needs
/// nothing but the stored value.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hash a password under a fresh random salt.
    pub fn generate(password: &str) -> Result<Self, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|err| PasswordHashError(err.to_string()))
    }

    /// Parse a stored digest. Returns `None` unless the value is an argon2id
    /// PHC string.
    pub fn parse(stored: impl Into<String>) -> Option<Self> {
        let stored = stored.into();
        let valid =
            PasswordHash::new(&stored).is_ok_and(|hash| hash.algorithm == ARGON2ID_IDENT);
        valid.then_some(Self(stored))
    }

    /// Whether `password` hashes to this digest.
    pub fn verify(&self, password: &str) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
    }

    /// Stored representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Opaque bearer token naming an authenticated session.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a new random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token presented by a caller. Blank tokens are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}
