//! Canonical re-serialization of a [`SecurityDescriptor`] into descriptor
//! text.
//!
//! The emitted discretionary list is always in canonical precedence order:
//! explicit deny, object deny, explicit allow, object allow, then everything
//! else (audit types, inherited variants, unknown tags). The sort is stable,
//! so entries of equal rank keep the order they held in the model. System
//! entries are emitted in bucket-then-insertion order with no precedence
//! sort; no source variant ever ordered them, and that asymmetry is kept
//! rather than guessed away.

use crate::resolver::is_valid_identity;
use crate::{AceToken, IdentityResolver, SecurityDescriptor};

impl SecurityDescriptor {
    /// Renders the descriptor back into SDDL text with canonical DACL
    /// ordering. Deterministic for a given model.
    ///
    /// The `D:` section is always emitted, even when empty; `S:` only when
    /// at least one system entry exists. No identity validation is applied.
    ///
    /// # Examples
    /// ```rust
    /// use win_security_descriptor::SecurityDescriptor;
    ///
    /// // Allow-before-deny input re-renders in canonical order.
    /// let model = SecurityDescriptor::from_sddl("D:(A;;FA;;;S-1-1-0)(D;;FA;;;S-1-1-0)");
    /// assert_eq!(model.to_sddl(), "D:(D;;FA;;;S-1-1-0)(A;;FA;;;S-1-1-0)");
    /// ```
    #[inline]
    #[must_use]
    pub fn to_sddl(&self) -> String {
        self.render(None)
    }

    /// Like [`SecurityDescriptor::to_sddl`], but drops every component whose
    /// identity fails the validation filter.
    ///
    /// Identities in raw SID form must resolve through `resolver`; resolved
    /// account names pass untouched. Each dropped owner, group or entry logs
    /// a warning. Rendering itself never fails.
    #[inline]
    #[must_use]
    pub fn to_sddl_filtered(&self, resolver: &dyn IdentityResolver) -> String {
        self.render(Some(resolver))
    }

    fn render(&self, resolver: Option<&dyn IdentityResolver>) -> String {
        let passes = |identity: &str| match resolver {
            None => true,
            Some(resolver) => is_valid_identity(resolver, identity),
        };

        let mut out = String::new();
        if let Some(owner) = self.owner.as_deref().filter(|owner| passes(owner)) {
            out.push_str("O:");
            out.push_str(owner);
        }
        if let Some(group) = self.group.as_deref().filter(|group| passes(group)) {
            out.push_str("G:");
            out.push_str(group);
        }

        let mut discretionary: Vec<&AceToken> = self
            .dacl
            .tokens()
            .filter(|token| passes(token.identity()))
            .collect();
        // Stable by-rank sort: deny before allow, explicit before the rest.
        discretionary.sort_by_key(|token| token.ace_type().canonical_rank());
        out.push_str("D:");
        for token in discretionary {
            out.push_str(token.raw());
        }

        let system: Vec<&AceToken> = self
            .sacl
            .tokens()
            .filter(|token| passes(token.identity()))
            .collect();
        if !system.is_empty() {
            out.push_str("S:");
            for token in system {
                out.push_str(token.raw());
            }
        }
        out
    }
}
