//! Portable structural encoding of the model.
//!
//! The interchange schema is a tree with four keys: `Owner` and `Group`
//! (strings, omitted when absent), and `Aces`/`Saces` (maps from identity to
//! the ordered list of verbatim clause strings). Unlike descriptor parsing,
//! decoding is strict: a schema mismatch, an unknown key, a malformed
//! embedded clause or an entry filed under the wrong identity is a hard
//! failure, because the encoding is supposed to round-trip losslessly.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::de;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{AceBuckets, AceToken, SecurityDescriptor};

/// Failure to encode or decode the portable descriptor encoding.
///
/// This is the one error class in the crate that aborts an operation instead
/// of degrading: a model that cannot round-trip is worse than no model.
#[derive(Debug, Error)]
#[error("portable descriptor encoding is invalid")]
pub struct EncodingError(#[from] serde_json::Error);

impl Serialize for AceToken {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AceToken {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokenVisitor;

        impl de::Visitor<'_> for TokenVisitor {
            type Value = AceToken;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a parenthesized six-field ACE clause")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                AceToken::from_str(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(TokenVisitor)
    }
}

struct Entries<'a>(&'a AceBuckets);

impl Serialize for Entries<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter())
    }
}

impl Serialize for SecurityDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = 2 + usize::from(self.owner.is_some()) + usize::from(self.group.is_some());
        let mut state = serializer.serialize_struct("SecurityDescriptor", fields)?;
        match self.owner.as_deref() {
            Some(owner) => state.serialize_field("Owner", owner)?,
            None => state.skip_field("Owner")?,
        }
        match self.group.as_deref() {
            Some(group) => state.serialize_field("Group", group)?,
            None => state.skip_field("Group")?,
        }
        state.serialize_field("Aces", &Entries(&self.dacl))?;
        state.serialize_field("Saces", &Entries(&self.sacl))?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PortableDescriptor {
    #[serde(rename = "Owner", default)]
    owner: Option<String>,
    #[serde(rename = "Group", default)]
    group: Option<String>,
    #[serde(rename = "Aces", default)]
    aces: BTreeMap<String, Vec<AceToken>>,
    #[serde(rename = "Saces", default)]
    saces: BTreeMap<String, Vec<AceToken>>,
}

impl<'de> Deserialize<'de> for SecurityDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let portable = PortableDescriptor::deserialize(deserializer)?;
        Ok(Self {
            owner: portable.owner.filter(|owner| !owner.is_empty()),
            group: portable.group.filter(|group| !group.is_empty()),
            dacl: rebuild::<D>(portable.aces)?,
            sacl: rebuild::<D>(portable.saces)?,
        })
    }
}

/// Bucket keys are a derived index; re-derive them from each entry and treat
/// a disagreement as a schema violation.
fn rebuild<'de, D>(entries: BTreeMap<String, Vec<AceToken>>) -> Result<AceBuckets, D::Error>
where
    D: Deserializer<'de>,
{
    let mut buckets = AceBuckets::new();
    for (identity, tokens) in entries {
        for token in tokens {
            if token.identity() != identity {
                return Err(de::Error::custom(format!(
                    "entry `{}` is filed under `{identity}` but names `{}`",
                    token.raw(),
                    token.identity()
                )));
            }
            buckets.push(token);
        }
    }
    Ok(buckets)
}

impl SecurityDescriptor {
    /// Encodes the model as pretty-printed JSON in the portable schema.
    ///
    /// # Errors
    /// An [`EncodingError`] if serialization fails.
    #[inline]
    pub fn to_json(&self) -> Result<String, EncodingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a model from the portable JSON schema.
    ///
    /// # Errors
    /// An [`EncodingError`] on any schema mismatch; this is a hard failure,
    /// never a silent degradation.
    #[inline]
    pub fn from_json(text: &str) -> Result<Self, EncodingError> {
        Ok(serde_json::from_str(text)?)
    }
}
