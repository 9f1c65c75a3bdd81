use parsing::{DescriptorSections, ace_clauses};

use crate::{AceBuckets, AceToken};

/// Editable in-memory form of one security descriptor: owner, group and the
/// two identity-keyed entry collections.
///
/// A descriptor is built by parsing ([`SecurityDescriptor::from_sddl`]), by
/// decoding the portable encoding, or field by field; it holds no resource
/// and is plain data. The only mutating operation the crate itself performs
/// on an existing descriptor is [`SecurityDescriptor::merge`].
///
/// # Examples
/// ```rust
/// use win_security_descriptor::SecurityDescriptor;
///
/// let model = SecurityDescriptor::from_sddl("O:BAG:SYD:(D;;FA;;;WD)(A;;FA;;;WD)");
/// assert_eq!(model.owner.as_deref(), Some("BA"));
/// assert_eq!(model.dacl.token_count(), 2);
/// assert_eq!(model.to_sddl(), "O:BAG:SYD:(D;;FA;;;WD)(A;;FA;;;WD)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityDescriptor {
    /// Owner identity, raw SID or account-name form.
    pub owner: Option<String>,
    /// Primary group identity.
    pub group: Option<String>,
    /// Discretionary (grant/deny) entries, keyed by identity.
    pub dacl: AceBuckets,
    /// System (audit) entries, keyed by identity.
    pub sacl: AceBuckets,
}

impl SecurityDescriptor {
    /// Parses descriptor text into a model. Never fails: a missing or
    /// malformed section yields an absent owner/group or an empty entry
    /// collection, and clauses with fewer than six fields are dropped
    /// silently (accepted information loss, per the grammar's leniency).
    #[inline]
    #[must_use]
    pub fn from_sddl(text: &str) -> Self {
        let sections = DescriptorSections::split(text);
        Self {
            owner: sections.owner.map(str::to_owned),
            group: sections.group.map(str::to_owned),
            dacl: collect_section(sections.dacl),
            sacl: collect_section(sections.sacl),
        }
    }

    /// Absorbs `incoming` into `self` with last-writer-wins semantics.
    ///
    /// A non-empty incoming owner or group replaces the existing one; an
    /// empty or absent one leaves it untouched. Every incoming entry first
    /// evicts one textually identical entry (if any) from the matching bucket
    /// and is then appended once, so merging a descriptor with a copy of
    /// itself leaves every bucket's length and content unchanged, including
    /// buckets that hold repeated entries.
    ///
    /// # Examples
    /// ```rust
    /// use win_security_descriptor::SecurityDescriptor;
    ///
    /// let mut base = SecurityDescriptor::from_sddl("O:BAD:(A;;FA;;;WD)");
    /// let template = SecurityDescriptor::from_sddl("O:SYD:(D;;FA;;;WD)");
    /// base.merge(template);
    /// assert_eq!(base.owner.as_deref(), Some("SY"));
    /// assert_eq!(base.dacl.token_count(), 2);
    /// ```
    #[inline]
    pub fn merge(&mut self, incoming: Self) {
        if let Some(owner) = incoming.owner.filter(|owner| !owner.is_empty()) {
            self.owner = Some(owner);
        }
        if let Some(group) = incoming.group.filter(|group| !group.is_empty()) {
            self.group = Some(group);
        }
        for token in incoming.dacl.into_tokens() {
            self.dacl.absorb(token);
        }
        for token in incoming.sacl.into_tokens() {
            self.sacl.absorb(token);
        }
    }
}

fn collect_section(section: Option<&str>) -> AceBuckets {
    let mut buckets = AceBuckets::new();
    for clause in section.into_iter().flat_map(ace_clauses) {
        if let Ok(token) = clause.parse::<AceToken>() {
            buckets.push(token);
        }
    }
    buckets
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[allow(clippy::expect_used, reason = "Expect is not an issue in test")]
pub(crate) mod test {
    use proptest::prelude::*;

    use super::*;

    prop_compose! {
        pub(crate) fn arb_identity()
            (subs in prop::collection::vec(0u32..=99_999, 1..4))
            -> String {
            let subs: Vec<String> = subs.iter().map(u32::to_string).collect();
            format!("S-1-5-{}", subs.join("-"))
        }
    }

    prop_compose! {
        pub(crate) fn arb_token()
            (tag in prop::sample::select(vec!["A", "D", "OA", "OD", "AU", "XU"]),
             flags in prop::sample::select(vec!["", "OICI", "CI", "ID"]),
             rights in prop::sample::select(vec!["FA", "FR", "FW", "0x1f01ff"]),
             identity in arb_identity())
            -> AceToken {
            format!("({tag};{flags};{rights};;;{identity})")
                .parse()
                .expect("generated clause is well formed")
        }
    }

    prop_compose! {
        // The small clause space makes repeated entries likely, which is
        // intentional: buckets holding textual duplicates are valid models
        // and every property below must hold for them too.
        pub(crate) fn arb_descriptor()
            (owner in prop::option::of(arb_identity()),
             group in prop::option::of(arb_identity()),
             dacl in prop::collection::vec(arb_token(), 0..8),
             sacl in prop::collection::vec(arb_token(), 0..4))
            -> SecurityDescriptor {
            SecurityDescriptor {
                owner,
                group,
                dacl: dacl.into_iter().collect(),
                sacl: sacl.into_iter().collect(),
            }
        }
    }

    #[test]
    fn parses_the_reference_descriptor() {
        let model = SecurityDescriptor::from_sddl(
            "O:S-1-5-21-1Owner G:S-1-5-21-1GroupD:(D;;FA;;;S-1-1-0)(A;;FA;;;S-1-1-0)",
        );
        assert_eq!(model.owner.as_deref(), Some("S-1-5-21-1Owner"));
        assert_eq!(model.group.as_deref(), Some("S-1-5-21-1Group"));
        let bucket = model.dacl.get("S-1-1-0").unwrap();
        let raws: Vec<&str> = bucket.iter().map(AceToken::raw).collect();
        assert_eq!(raws, vec!["(D;;FA;;;S-1-1-0)", "(A;;FA;;;S-1-1-0)"]);
        assert!(model.sacl.is_empty());
    }

    #[test]
    fn malformed_clauses_are_dropped_silently() {
        let model = SecurityDescriptor::from_sddl("D:(A;OI;FA;SID)(A;;FA;;;S-1-1-0)");
        assert_eq!(model.dacl.token_count(), 1);
        assert!(model.dacl.get("SID").is_none());
    }

    #[test]
    fn empty_input_yields_empty_model() {
        assert_eq!(SecurityDescriptor::from_sddl(""), SecurityDescriptor::default());
    }

    #[test]
    fn sacl_section_populates_system_entries() {
        let model = SecurityDescriptor::from_sddl("D:(A;;FA;;;WD)S:(AU;SA;FA;;;WD)");
        assert_eq!(model.dacl.token_count(), 1);
        assert_eq!(model.sacl.token_count(), 1);
        assert_eq!(model.sacl.get("WD").unwrap().len(), 1);
    }

    #[test]
    fn self_merge_keeps_duplicated_buckets_intact() {
        // The lenient parser accepts repeated clauses into one bucket; a
        // self-merge must not collapse them.
        let model = SecurityDescriptor::from_sddl("D:(A;;FA;;;WD)(A;;FA;;;WD)");
        assert_eq!(model.dacl.token_count(), 2);
        let mut merged = model.clone();
        merged.merge(model.clone());
        assert_eq!(merged.dacl.token_count(), model.dacl.token_count());
        assert_eq!(merged, model);
    }

    #[test]
    fn merge_keeps_base_owner_when_incoming_is_absent() {
        let mut base = SecurityDescriptor::from_sddl("O:BAG:SY");
        base.merge(SecurityDescriptor::from_sddl("D:(A;;FA;;;WD)"));
        assert_eq!(base.owner.as_deref(), Some("BA"));
        assert_eq!(base.group.as_deref(), Some("SY"));
        assert_eq!(base.dacl.token_count(), 1);
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(descriptor in arb_descriptor()) {
            let mut merged = descriptor.clone();
            merged.merge(descriptor.clone());
            prop_assert_eq!(merged, descriptor);
        }

        #[test]
        fn merge_overrides_owner_only_when_set(
            base in arb_descriptor(),
            incoming in arb_descriptor(),
        ) {
            let mut merged = base.clone();
            merged.merge(incoming.clone());
            match incoming.owner {
                Some(owner) => prop_assert_eq!(merged.owner, Some(owner)),
                None => prop_assert_eq!(merged.owner, base.owner),
            }
            match incoming.group {
                Some(group) => prop_assert_eq!(merged.group, Some(group)),
                None => prop_assert_eq!(merged.group, base.group),
            }
        }

        #[test]
        fn merge_preserves_clause_copy_counts(
            base in arb_descriptor(),
            incoming in arb_descriptor(),
        ) {
            // Each incoming entry evicts one copy and appends one, so a
            // clause already present keeps its copy count and a new clause
            // ends up with exactly one copy, however often it recurs in the
            // incoming descriptor.
            let mut merged = base.clone();
            merged.merge(incoming);
            for (identity, bucket) in merged.dacl.iter() {
                for token in bucket {
                    prop_assert_eq!(token.identity(), identity);
                    let copies = bucket.iter().filter(|held| held.raw() == token.raw()).count();
                    let before = base
                        .dacl
                        .get(identity)
                        .into_iter()
                        .flatten()
                        .filter(|held| held.raw() == token.raw())
                        .count();
                    prop_assert_eq!(copies, before.max(1), "merge changed a clause's copy count");
                }
            }
        }

        #[test]
        fn parse_keys_match_token_identities(descriptor in arb_descriptor()) {
            let reparsed = SecurityDescriptor::from_sddl(&descriptor.to_sddl());
            for (identity, bucket) in reparsed.dacl.iter().chain(reparsed.sacl.iter()) {
                for token in bucket {
                    prop_assert_eq!(token.identity(), identity);
                }
            }
        }
    }
}
