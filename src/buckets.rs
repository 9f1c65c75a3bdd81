use std::collections::BTreeMap;

use delegate::delegate;

use crate::AceToken;

/// Identity-keyed collection of [`AceToken`], as used for both the
/// discretionary and the system entry lists.
///
/// Keys are always derived from the tokens themselves on insertion, so every
/// token under a key names that key's identity and no bucket is ever empty.
/// The outer map iterates in a deterministic (lexicographic) key order;
/// within a bucket, insertion order is preserved. Neither order feeds the
/// canonical DACL sort, which is applied after flattening.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AceBuckets {
    inner: BTreeMap<String, Vec<AceToken>>,
}

impl AceBuckets {
    /// Creates an empty collection.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    delegate! {
        to self.inner {
            /// Number of distinct identities holding at least one entry.
            #[call(len)]
            #[must_use]
            pub fn identity_count(&self) -> usize;

            /// Returns `true` when the collection holds no entries at all.
            #[must_use]
            pub fn is_empty(&self) -> bool;
        }
    }

    /// Total number of entries across all identities.
    #[inline]
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// Appends a token to the bucket of the identity it names, creating the
    /// bucket on first use.
    #[inline]
    pub fn push(&mut self, token: AceToken) {
        self.inner
            .entry(token.identity().to_owned())
            .or_default()
            .push(token);
    }

    /// Merges one token in: the first textually identical token already held
    /// under the same identity is removed, then the incoming token is
    /// appended once.
    ///
    /// A duplicate is therefore moved rather than duplicated, one occurrence
    /// per absorb, which is what keeps a self-merge from changing any
    /// bucket's length or content. Buckets may legitimately hold repeated
    /// entries (the lenient parser accepts them), so eviction must never
    /// remove more copies than the merge appends.
    #[inline]
    pub fn absorb(&mut self, token: AceToken) {
        let bucket = self.inner.entry(token.identity().to_owned()).or_default();
        if let Some(held) = bucket.iter().position(|held| held.raw() == token.raw()) {
            bucket.remove(held);
        }
        bucket.push(token);
    }

    /// The entries held for one identity, in insertion order.
    #[inline]
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&[AceToken]> {
        self.inner.get(identity).map(Vec::as_slice)
    }

    /// Iterates over `(identity, entries)` pairs in deterministic key order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AceToken])> {
        self.inner
            .iter()
            .map(|(identity, bucket)| (identity.as_str(), bucket.as_slice()))
    }

    /// Flattens the collection into its tokens, bucket-then-insertion order.
    #[inline]
    pub fn tokens(&self) -> impl Iterator<Item = &AceToken> {
        self.inner.values().flatten()
    }

    /// Consumes the collection, yielding owned tokens in the same order as
    /// [`AceBuckets::tokens`].
    #[inline]
    pub fn into_tokens(self) -> impl Iterator<Item = AceToken> {
        self.inner.into_values().flatten()
    }
}

impl Extend<AceToken> for AceBuckets {
    #[inline]
    fn extend<T: IntoIterator<Item = AceToken>>(&mut self, iter: T) {
        for token in iter {
            self.push(token);
        }
    }
}

impl FromIterator<AceToken> for AceBuckets {
    #[inline]
    fn from_iter<T: IntoIterator<Item = AceToken>>(iter: T) -> Self {
        let mut buckets = Self::new();
        buckets.extend(iter);
        buckets
    }
}
