/// Parsed ACE type tag, reduced to the categories the canonical DACL order
/// distinguishes.
///
/// Every tag outside the four explicit grant/deny categories (audit ACEs,
/// conditional ACEs, inherited variants, unknown tags) collapses into
/// [`AceType::Other`]; those entries always sort after the explicit ones and
/// keep their relative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceType {
    /// Explicit deny (`D`).
    AccessDenied,
    /// Object-specific deny (`OD`).
    ObjectAccessDenied,
    /// Explicit allow (`A`).
    AccessAllowed,
    /// Object-specific allow (`OA`).
    ObjectAccessAllowed,
    /// Any other tag. Treated as opaque.
    Other,
}

impl AceType {
    /// Classifies a type tag. Tags compare ASCII-case-insensitively; an
    /// unrecognized tag is [`AceType::Other`], never an error.
    #[inline]
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("D") {
            Self::AccessDenied
        } else if tag.eq_ignore_ascii_case("OD") {
            Self::ObjectAccessDenied
        } else if tag.eq_ignore_ascii_case("A") {
            Self::AccessAllowed
        } else if tag.eq_ignore_ascii_case("OA") {
            Self::ObjectAccessAllowed
        } else {
            Self::Other
        }
    }

    /// Precedence rank within a canonically ordered DACL.
    ///
    /// Deny entries (ranks 1 and 2) must precede allow entries (ranks 3
    /// and 4), which precede everything else (rank 5). Entries of equal rank
    /// keep their original relative order under the stable canonical sort.
    #[inline]
    #[must_use]
    pub const fn canonical_rank(self) -> u8 {
        match self {
            Self::AccessDenied => 1,
            Self::ObjectAccessDenied => 2,
            Self::AccessAllowed => 3,
            Self::ObjectAccessAllowed => 4,
            Self::Other => 5,
        }
    }
}
