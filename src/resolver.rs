use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        pub use windows::LocalAccountResolver;
    }
}

/// Failure to resolve an identity to an account name.
///
/// Resolution failures are never fatal inside this crate: the canonical
/// serializer treats them as "drop the entry and warn".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The identity is not mapped to any account on the target system.
    #[error("no account maps to `{identity}`")]
    NoneMapped {
        /// The identity that failed to resolve.
        identity: String,
    },
    /// The identity string is not in a form the platform accepts.
    #[error("`{identity}` is not a valid identity string")]
    InvalidFormat {
        /// The rejected identity text.
        identity: String,
    },
    /// Any other platform failure, with its raw error code.
    #[error("account lookup for `{identity}` failed (code {code})")]
    Lookup {
        /// The identity being looked up.
        identity: String,
        /// Raw platform error code.
        code: u32,
    },
}

/// Resolves identity text to an account name.
///
/// Implementations wrap the platform's account database (see
/// [`LocalAccountResolver`] on Windows) or a test double. The crate only
/// consults a resolver through the optional validation filter; parsing,
/// merging and unvalidated rendering never touch one.
pub trait IdentityResolver {
    /// Resolves `identity` to a resolved account name (e.g. `DOMAIN\Name`).
    ///
    /// # Errors
    /// A [`ResolveError`] when the identity does not map to an account.
    fn resolve(&self, identity: &str) -> Result<String, ResolveError>;
}

/// Validation filter applied to identities when filtered rendering is
/// requested.
///
/// An identity in raw SID form (`S-` prefix) is valid only if the resolver
/// maps it to an account; any other form is taken to be an already resolved
/// account name and accepted without a lookup. A resolution failure logs a
/// warning and yields `false`, never an error.
#[inline]
#[must_use]
pub fn is_valid_identity(resolver: &dyn IdentityResolver, identity: &str) -> bool {
    if !parsing::is_sid_string(identity) {
        return true;
    }
    match resolver.resolve(identity) {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(identity, %error, "dropping entry with unresolvable identity");
            false
        }
    }
}
