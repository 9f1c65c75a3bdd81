//! Zero-copy tokenization of security descriptor definition language (SDDL)
//! text.
//!
//! The descriptor grammar is a flat sequence of optional sections, each
//! introduced by a two-character token (`O:`, `G:`, `D:`, `S:`) and running
//! to the next recognized introducer or the end of input. List sections hold
//! zero or more parenthesized ACE clauses whose interior is `;`-delimited.
//!
//! Everything here borrows from the input string and never allocates; the
//! owned model lives in the `win-security-descriptor` crate.

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt::{self, Display};

use arrayvec::ArrayVec;
use thiserror::Error;

/// Number of `;`-delimited fields a clause must have to be a valid ACE.
pub const ACE_FIELD_COUNT: usize = 6;

/// Error type returned when a parenthesized clause cannot be read as an ACE.
///
/// A clause is malformed when it is missing its surrounding parentheses or
/// has fewer than [`ACE_FIELD_COUNT`] fields. The lenient descriptor parser
/// skips such clauses without surfacing this error; it only reaches callers
/// that parse individual clauses (e.g. the portable encoding decoder).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct MalformedClause;

impl Display for MalformedClause {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed ACE clause (fewer than six fields)")
    }
}

/// Returns `true` when `s` is in raw security-identifier form (`S-` prefix).
///
/// The check is ASCII-case-insensitive, matching how SID text is accepted
/// elsewhere in the grammar. A resolved account name never carries this
/// prefix.
#[inline]
#[must_use]
pub fn is_sid_string(s: &str) -> bool {
    s.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("s-"))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Owner,
    Group,
    Dacl,
    Sacl,
}

impl SectionKind {
    const fn from_introducer(byte: u8) -> Option<Self> {
        match byte {
            b'O' => Some(Self::Owner),
            b'G' => Some(Self::Group),
            b'D' => Some(Self::Dacl),
            b'S' => Some(Self::Sacl),
            _ => None,
        }
    }

    /// Whether `next` terminates a section of this kind. Sections only stop
    /// at introducers that follow them in the grammar order, so a literal
    /// `O:` occurring later in the input stays part of the running section.
    const fn stopped_by(self, next: Self) -> bool {
        match self {
            Self::Owner => !matches!(next, Self::Owner),
            Self::Group => matches!(next, Self::Dacl | Self::Sacl),
            Self::Dacl => matches!(next, Self::Sacl),
            Self::Sacl => false,
        }
    }
}

/// The four optional section substrings of one descriptor, split in a single
/// left-to-right pass.
///
/// Section introducers are only recognized at parenthesis depth zero, so
/// clause contents can never open a new section. Absent or empty sections
/// are `None`; stored substrings are trimmed. Splitting never fails.
///
/// # Examples
/// ```rust
/// use win_security_descriptor_parsing::DescriptorSections;
///
/// let sections = DescriptorSections::split("O:BA G:SY D:(A;;FA;;;WD)");
/// assert_eq!(sections.owner, Some("BA"));
/// assert_eq!(sections.group, Some("SY"));
/// assert_eq!(sections.dacl, Some("(A;;FA;;;WD)"));
/// assert_eq!(sections.sacl, None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorSections<'a> {
    /// Owner section body (`O:`), if present and non-empty.
    pub owner: Option<&'a str>,
    /// Group section body (`G:`), if present and non-empty.
    pub group: Option<&'a str>,
    /// Discretionary-list section body (`D:`), if present and non-empty.
    pub dacl: Option<&'a str>,
    /// System-list section body (`S:`), if present and non-empty.
    pub sacl: Option<&'a str>,
}

impl<'a> DescriptorSections<'a> {
    /// Splits descriptor text into its sections.
    #[must_use]
    pub fn split(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut sections = Self::default();
        let mut current: Option<(SectionKind, usize)> = None;
        let mut depth = 0usize;
        let mut i = 0;
        while let Some(&byte) = bytes.get(i) {
            match byte {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                    if let Some(next) = SectionKind::from_introducer(byte) {
                        let switches = match current {
                            None => true,
                            Some((kind, _)) => kind.stopped_by(next),
                        };
                        if switches {
                            if let Some((kind, start)) = current {
                                sections.store(kind, text.get(start..i));
                            }
                            current = Some((next, i + 2));
                            i += 2;
                            continue;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if let Some((kind, start)) = current {
            sections.store(kind, text.get(start..));
        }
        sections
    }

    fn store(&mut self, kind: SectionKind, body: Option<&'a str>) {
        let Some(body) = body.map(str::trim).filter(|body| !body.is_empty()) else {
            return;
        };
        let slot = match kind {
            SectionKind::Owner => &mut self.owner,
            SectionKind::Group => &mut self.group,
            SectionKind::Dacl => &mut self.dacl,
            SectionKind::Sacl => &mut self.sacl,
        };
        *slot = Some(body);
    }
}

/// Returns an iterator over the complete parenthesized clauses of a list
/// section, in order of appearance.
///
/// Text between clauses (e.g. DACL control flags such as `PAI`) is skipped.
/// An unterminated clause at the end of the section is dropped.
#[inline]
#[must_use]
pub const fn ace_clauses(section: &str) -> AceClauses<'_> {
    AceClauses { section, pos: 0 }
}

/// Iterator over `(...)` clauses of one list section. See [`ace_clauses`].
#[derive(Debug, Clone)]
pub struct AceClauses<'a> {
    section: &'a str,
    pos: usize,
}

impl<'a> Iterator for AceClauses<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.section.as_bytes();
        while let Some(&byte) = bytes.get(self.pos) {
            if byte == b'(' {
                break;
            }
            self.pos += 1;
        }
        let open = self.pos;
        let mut depth = 0usize;
        let mut i = open;
        while let Some(&byte) = bytes.get(i) {
            match byte {
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos = i + 1;
                        return self.section.get(open..=i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.pos = bytes.len();
        None
    }
}

/// The six named fields of one ACE clause, borrowed from its interior.
///
/// Fields beyond the sixth (e.g. resource-attribute data) are tolerated and
/// ignored; the identity is always the zero-based field 5.
///
/// # Examples
/// ```rust
/// use win_security_descriptor_parsing::AceFields;
///
/// let fields = AceFields::parse("(A;OICI;FA;;;S-1-1-0)").unwrap();
/// assert_eq!(fields.ace_type, "A");
/// assert_eq!(fields.identity, "S-1-1-0");
/// assert!(AceFields::parse("(A;OI;FA;SID)").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AceFields<'a> {
    /// ACE type tag (`A`, `D`, `OA`, `OD`, audit types, ...).
    pub ace_type: &'a str,
    /// ACE flags (inheritance and audit flags).
    pub flags: &'a str,
    /// Rights mask, symbolic or hexadecimal. Kept opaque.
    pub rights: &'a str,
    /// Object type GUID for object ACEs. Kept opaque.
    pub object_type: &'a str,
    /// Inherited object type GUID for object ACEs. Kept opaque.
    pub inherited_object_type: &'a str,
    /// The identity the clause names; the bucket key in the owned model.
    pub identity: &'a str,
}

impl<'a> AceFields<'a> {
    /// Splits a full parenthesized clause into its fields.
    ///
    /// # Errors
    /// [`MalformedClause`] if the clause is missing its parentheses or has
    /// fewer than [`ACE_FIELD_COUNT`] `;`-delimited fields.
    pub fn parse(clause: &'a str) -> Result<Self, MalformedClause> {
        let interior = clause
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or(MalformedClause)?;
        let mut fields = ArrayVec::<&str, ACE_FIELD_COUNT>::new();
        for field in interior.split(';') {
            if fields.is_full() {
                break;
            }
            fields.push(field);
        }
        let [ace_type, flags, rights, object_type, inherited_object_type, identity] =
            fields.into_inner().map_err(|_| MalformedClause)?;
        Ok(Self {
            ace_type,
            flags,
            rights,
            object_type,
            inherited_object_type,
            identity,
        })
    }
}

impl<'a> TryFrom<&'a str> for AceFields<'a> {
    type Error = MalformedClause;

    #[inline]
    fn try_from(clause: &'a str) -> Result<Self, Self::Error> {
        Self::parse(clause)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;

    #[test]
    fn splits_all_four_sections() {
        let sections =
            DescriptorSections::split("O:BAG:SYD:(A;;FA;;;WD)(D;;FR;;;BG)S:(AU;SA;FA;;;WD)");
        assert_eq!(sections.owner, Some("BA"));
        assert_eq!(sections.group, Some("SY"));
        assert_eq!(sections.dacl, Some("(A;;FA;;;WD)(D;;FR;;;BG)"));
        assert_eq!(sections.sacl, Some("(AU;SA;FA;;;WD)"));
    }

    #[test]
    fn trims_and_drops_empty_sections() {
        let sections = DescriptorSections::split("O:S-1-5-21-1Owner G:S-1-5-21-1GroupD:");
        assert_eq!(sections.owner, Some("S-1-5-21-1Owner"));
        assert_eq!(sections.group, Some("S-1-5-21-1Group"));
        assert_eq!(sections.dacl, None);
        assert_eq!(sections.sacl, None);
    }

    #[test]
    fn missing_sections_are_none() {
        let sections = DescriptorSections::split("D:(A;;FA;;;WD)");
        assert_eq!(sections.owner, None);
        assert_eq!(sections.group, None);
        assert_eq!(sections.dacl, Some("(A;;FA;;;WD)"));
        assert_eq!(sections.sacl, None);
        assert_eq!(DescriptorSections::split(""), DescriptorSections::default());
    }

    #[test]
    fn introducers_inside_clauses_do_not_switch_sections() {
        // "S:" inside the parentheses must not start a system section.
        let sections = DescriptorSections::split("D:(A;;FA;;;NAME WITH S:COLON)");
        assert_eq!(sections.dacl, Some("(A;;FA;;;NAME WITH S:COLON)"));
        assert_eq!(sections.sacl, None);
    }

    #[test]
    fn later_owner_introducer_stays_in_running_section() {
        let sections = DescriptorSections::split("G:GRP O:not-a-section");
        assert_eq!(sections.group, Some("GRP O:not-a-section"));
        assert_eq!(sections.owner, None);
    }

    #[test]
    fn leading_junk_is_ignored() {
        let sections = DescriptorSections::split("xx O:BA");
        assert_eq!(sections.owner, Some("BA"));
    }

    #[test]
    fn clause_iterator_yields_each_clause_verbatim() {
        let clauses: Vec<&str> = ace_clauses("PAI(A;;FA;;;WD)(D;;FR;;;BG)").collect();
        assert_eq!(clauses, vec!["(A;;FA;;;WD)", "(D;;FR;;;BG)"]);
    }

    #[test]
    fn unterminated_clause_is_dropped() {
        let clauses: Vec<&str> = ace_clauses("(A;;FA;;;WD)(D;;FR;;;BG").collect();
        assert_eq!(clauses, vec!["(A;;FA;;;WD)"]);
    }

    #[test]
    fn empty_section_has_no_clauses() {
        assert_eq!(ace_clauses("").count(), 0);
        assert_eq!(ace_clauses("PAI").count(), 0);
    }

    #[test]
    fn fields_split_by_position() {
        let fields = AceFields::parse("(D;OICI;FA;;;S-1-1-0)").unwrap();
        assert_eq!(fields.ace_type, "D");
        assert_eq!(fields.flags, "OICI");
        assert_eq!(fields.rights, "FA");
        assert_eq!(fields.object_type, "");
        assert_eq!(fields.inherited_object_type, "");
        assert_eq!(fields.identity, "S-1-1-0");
    }

    #[test]
    fn short_clause_is_malformed() {
        assert_eq!(AceFields::parse("(A;OI;FA;SID)"), Err(MalformedClause));
        assert_eq!(AceFields::parse("()"), Err(MalformedClause));
        assert_eq!(AceFields::parse("A;;FA;;;WD"), Err(MalformedClause));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let fields = AceFields::parse("(XA;;FA;;;S-1-1-0;(exists WIN://SYSAPPID))").unwrap();
        assert_eq!(fields.identity, "S-1-1-0");
    }

    #[test]
    fn sid_prefix_detection() {
        assert!(is_sid_string("S-1-5-32-544"));
        assert!(is_sid_string("s-1-1-0"));
        assert!(!is_sid_string("BUILTIN\\Administrators"));
        assert!(!is_sid_string("S"));
        assert!(!is_sid_string(""));
    }
}
