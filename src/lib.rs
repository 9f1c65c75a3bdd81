//! # Windows security descriptor (SDDL) model for Rust
//!
//! Building blocks to read, edit, merge and re-apply discretionary and
//! system access-control lists of filesystem objects. The crate provides:
//! - [`SecurityDescriptor`]: the editable in-memory model, made of owner,
//!   group and two identity-keyed collections of access-control entries.
//! - [`AceToken`] / [`AceType`]: one entry, kept as its verbatim clause plus
//!   the derived identity and type tag.
//! - [`AceBuckets`]: the identity-keyed, insertion-ordered entry collection.
//! - Canonical re-serialization ([`SecurityDescriptor::to_sddl`]): explicit
//!   deny before explicit allow before everything else, with an optional
//!   SID-validity filter ([`SecurityDescriptor::to_sddl_filtered`]).
//! - In-place merging ([`SecurityDescriptor::merge`]) with last-writer-wins
//!   semantics and no duplicated entries.
//! - A portable JSON encoding (`serde` feature, on by default).
//! - (Windows) [`ObjectSecurityProvider`] and [`LocalAccountResolver`]: the
//!   platform collaborators behind the [`SecurityProvider`] and
//!   [`IdentityResolver`] seams, plus [`apply_descriptor`] which tolerates
//!   per-entry rejection.
//!
//! ## Overview
//! - **Lenient parsing**: [`SecurityDescriptor::from_sddl`] never fails.
//!   Missing sections come back absent, malformed clauses are dropped.
//! - **Verbatim re-emission**: entries are opaque tokens; rights masks and
//!   GUIDs are never normalized, so unmodified entries round-trip byte for
//!   byte.
//! - **Order correctness**: rendering restores the precedence order any
//!   descriptor consumer requires, regardless of input order.
//!
//! ## Examples
//! ### Parse, merge with a template, re-render
//! ```rust
//! use win_security_descriptor::SecurityDescriptor;
//!
//! let mut model = SecurityDescriptor::from_sddl("O:BAD:(A;;FA;;;S-1-1-0)");
//! let template = SecurityDescriptor::from_sddl("D:(D;;FW;;;S-1-5-32-546)");
//! model.merge(template);
//! // Deny entries come first in the canonical rendering.
//! assert_eq!(
//!     model.to_sddl(),
//!     "O:BAD:(D;;FW;;;S-1-5-32-546)(A;;FA;;;S-1-1-0)",
//! );
//! ```
//!
//! ### Round-trip through the portable encoding
//! ```rust
//! # #[cfg(feature = "serde")] {
//! use win_security_descriptor::SecurityDescriptor;
//!
//! let model = SecurityDescriptor::from_sddl("O:SYD:(A;;FA;;;S-1-1-0)");
//! let json = model.to_json().unwrap();
//! assert_eq!(SecurityDescriptor::from_json(&json).unwrap(), model);
//! # }
//! ```
//!
//! ### (Windows) Apply a model to a file
//! ```no_run
//! # #[cfg(windows)]
//! # {
//! use std::path::Path;
//! use win_security_descriptor::{ObjectSecurityProvider, apply_descriptor, read_model};
//!
//! let provider = ObjectSecurityProvider;
//! let mut model = read_model(&provider, Path::new("C:\\data\\report.txt")).unwrap();
//! model.owner = Some("S-1-5-32-544".to_owned());
//! apply_descriptor(&provider, Path::new("C:\\data\\report.txt"), &model).unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

mod ace;
mod ace_type;
mod buckets;
mod descriptor;
mod provider;
mod render;
mod resolver;
#[cfg(feature = "serde")]
mod serde_impl;

pub use ace::AceToken;
pub use ace_type::AceType;
pub use buckets::AceBuckets;
pub use descriptor::SecurityDescriptor;
pub use provider::{ApplyError, ApplyFailure, ProviderError, SecurityProvider};
pub use provider::{apply_descriptor, read_model};
pub use resolver::{IdentityResolver, ResolveError, is_valid_identity};
#[cfg(feature = "serde")]
pub use serde_impl::EncodingError;

#[cfg(windows)]
pub use provider::ObjectSecurityProvider;
#[cfg(windows)]
pub use resolver::LocalAccountResolver;

/// Error for a clause that cannot be read as an ACE.
///
/// Re-exported from the tokenization crate; see [`AceToken`]'s `FromStr`
/// implementation and the strict portable decoder.
pub use parsing::MalformedClause;
