use core::fmt::{self, Display};
use core::str::FromStr;

use parsing::{AceFields, MalformedClause};

use crate::AceType;

/// One access-control entry, kept as its verbatim parenthesized clause plus
/// the two derived values the model needs: the identity the clause names and
/// the parsed type tag.
///
/// The clause is deliberately opaque beyond that. Rights masks, flags and
/// object-type GUIDs are re-emitted byte for byte, so an entry that is never
/// modified round-trips without normalization drift.
///
/// # Examples
/// ```rust
/// use win_security_descriptor::{AceToken, AceType};
///
/// let token: AceToken = "(D;;FA;;;S-1-1-0)".parse().unwrap();
/// assert_eq!(token.identity(), "S-1-1-0");
/// assert_eq!(token.ace_type(), AceType::AccessDenied);
/// assert_eq!(token.to_string(), "(D;;FA;;;S-1-1-0)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AceToken {
    raw: Box<str>,
    ace_type: AceType,
    identity: Box<str>,
}

impl AceToken {
    /// The verbatim clause text, parentheses included.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed type tag of the clause's first field.
    #[inline]
    #[must_use]
    pub const fn ace_type(&self) -> AceType {
        self.ace_type
    }

    /// The identity named by the clause's sixth field. Buckets in the owned
    /// model are keyed by this value.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl FromStr for AceToken {
    type Err = MalformedClause;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let fields = AceFields::parse(raw)?;
        Ok(Self {
            raw: raw.into(),
            ace_type: AceType::from_tag(fields.ace_type),
            identity: fields.identity.into(),
        })
    }
}

impl Display for AceToken {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
