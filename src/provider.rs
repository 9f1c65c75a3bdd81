use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::SecurityDescriptor;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        pub use windows::ObjectSecurityProvider;
    }
}

/// Failure reported by a [`SecurityProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The path cannot be passed to the platform (interior NUL).
    #[error("path contains an interior NUL byte")]
    InvalidPath,
    /// A platform security API call failed.
    #[error("`{api}` failed with code {code}")]
    Api {
        /// The API that failed.
        api: &'static str,
        /// Raw platform error code.
        code: u32,
    },
    /// The provider rejected the descriptor text itself.
    #[error("descriptor was rejected: {reason}")]
    Rejected {
        /// Provider-supplied reason.
        reason: String,
    },
}

/// Reads and writes descriptor text for filesystem objects.
///
/// This is the boundary to the platform's security machinery: the crate only
/// consumes and produces SDDL text here and has no knowledge of how the
/// provider obtains or applies it. Both files and directories are addressed
/// by path; see [`ObjectSecurityProvider`] for the Windows implementation.
pub trait SecurityProvider {
    /// Reads the current descriptor of the object at `path` as SDDL text.
    ///
    /// # Errors
    /// A [`ProviderError`] when the object's descriptor cannot be read.
    fn read_descriptor(&self, path: &Path) -> Result<String, ProviderError>;

    /// Replaces the descriptor of the object at `path` with `sddl`.
    ///
    /// # Errors
    /// A [`ProviderError`] when the descriptor cannot be applied.
    fn write_descriptor(&self, path: &Path, sddl: &str) -> Result<(), ProviderError>;
}

/// One entry the provider refused during a partial apply.
#[derive(Debug, Error)]
#[error("entry `{clause}` for `{identity}` was rejected")]
pub struct ApplyFailure {
    /// The identity the rejected entry names.
    pub identity: String,
    /// The rejected clause, verbatim.
    pub clause: String,
    /// The provider's failure for this entry.
    #[source]
    pub source: ProviderError,
}

/// Outcome of [`apply_descriptor`] when not everything could be applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Nothing usable could be applied at all.
    #[error("descriptor could not be applied to `{}`", path.display())]
    Provider {
        /// Target object.
        path: PathBuf,
        /// The final provider failure.
        #[source]
        source: ProviderError,
    },
    /// Some entries were applied, some were rejected.
    #[error("applied {applied} entries to `{}`, {} rejected", path.display(), failures.len())]
    Partial {
        /// Target object.
        path: PathBuf,
        /// Number of entries the provider accepted.
        applied: usize,
        /// Per-entry failures, in model order.
        failures: Vec<ApplyFailure>,
    },
}

/// Reads the object's descriptor and parses it into a model.
///
/// # Errors
/// A [`ProviderError`] when the descriptor cannot be read; parsing itself
/// never fails.
#[inline]
pub fn read_model(
    provider: &dyn SecurityProvider,
    path: &Path,
) -> Result<SecurityDescriptor, ProviderError> {
    Ok(SecurityDescriptor::from_sddl(&provider.read_descriptor(path)?))
}

/// Renders `model` canonically and applies it to the object at `path`,
/// tolerating per-entry rejection.
///
/// The full descriptor is written first. If the provider rejects it, every
/// entry is probed in isolation (owner and group plus that single entry);
/// rejected entries are dropped with a warning and the accepted remainder is
/// written, so one unknown identity does not block the rest. The per-entry
/// outcomes are reported through [`ApplyError::Partial`].
///
/// # Errors
/// [`ApplyError::Provider`] when even the accepted remainder cannot be
/// written; [`ApplyError::Partial`] when at least one entry was rejected.
pub fn apply_descriptor(
    provider: &dyn SecurityProvider,
    path: &Path,
    model: &SecurityDescriptor,
) -> Result<(), ApplyError> {
    if let Err(error) = provider.write_descriptor(path, &model.to_sddl()) {
        tracing::warn!(
            path = %path.display(),
            %error,
            "full descriptor rejected, probing entries individually"
        );
    } else {
        return Ok(());
    }

    let base = SecurityDescriptor {
        owner: model.owner.clone(),
        group: model.group.clone(),
        ..SecurityDescriptor::default()
    };
    let mut accepted = base.clone();
    let mut failures = Vec::new();

    for token in model.dacl.tokens() {
        let mut probe = base.clone();
        probe.dacl.push(token.clone());
        match provider.write_descriptor(path, &probe.to_sddl()) {
            Ok(()) => accepted.dacl.push(token.clone()),
            Err(source) => failures.push(reject(token, source)),
        }
    }
    for token in model.sacl.tokens() {
        let mut probe = base.clone();
        probe.sacl.push(token.clone());
        match provider.write_descriptor(path, &probe.to_sddl()) {
            Ok(()) => accepted.sacl.push(token.clone()),
            Err(source) => failures.push(reject(token, source)),
        }
    }

    let applied = accepted.dacl.token_count() + accepted.sacl.token_count();
    provider
        .write_descriptor(path, &accepted.to_sddl())
        .map_err(|source| ApplyError::Provider {
            path: path.to_path_buf(),
            source,
        })?;
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ApplyError::Partial {
            path: path.to_path_buf(),
            applied,
            failures,
        })
    }
}

fn reject(token: &crate::AceToken, source: ProviderError) -> ApplyFailure {
    tracing::warn!(
        identity = token.identity(),
        clause = token.raw(),
        error = %source,
        "cannot apply entry, skipping"
    );
    ApplyFailure {
        identity: token.identity().to_owned(),
        clause: token.raw().to_owned(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[allow(clippy::panic, reason = "Panicking is how tests fail")]
mod test {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory provider that rejects any descriptor mentioning one of the
    /// configured identities, like a platform refusing unknown accounts.
    struct StubProvider {
        rejected_identities: Vec<&'static str>,
        stored: Mutex<HashMap<PathBuf, String>>,
    }

    impl StubProvider {
        fn rejecting(rejected_identities: Vec<&'static str>) -> Self {
            Self {
                rejected_identities,
                stored: Mutex::new(HashMap::new()),
            }
        }

        fn stored(&self, path: &Path) -> Option<String> {
            self.stored.lock().unwrap().get(path).cloned()
        }
    }

    impl SecurityProvider for StubProvider {
        fn read_descriptor(&self, path: &Path) -> Result<String, ProviderError> {
            self.stored(path).ok_or(ProviderError::Api {
                api: "read",
                code: 2,
            })
        }

        fn write_descriptor(&self, path: &Path, sddl: &str) -> Result<(), ProviderError> {
            if let Some(bad) = self
                .rejected_identities
                .iter()
                .find(|identity| sddl.contains(*identity))
            {
                return Err(ProviderError::Rejected {
                    reason: format!("unknown account {bad}"),
                });
            }
            self.stored
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), sddl.to_owned());
            Ok(())
        }
    }

    #[test]
    fn clean_apply_writes_once() {
        let provider = StubProvider::rejecting(vec![]);
        let model = SecurityDescriptor::from_sddl("O:BAD:(A;;FA;;;S-1-1-0)");
        let path = Path::new("object");
        apply_descriptor(&provider, path, &model).unwrap();
        assert_eq!(provider.stored(path).unwrap(), "O:BAD:(A;;FA;;;S-1-1-0)");
    }

    #[test]
    fn rejected_entry_is_skipped_and_reported() {
        let provider = StubProvider::rejecting(vec!["S-1-5-66"]);
        let model = SecurityDescriptor::from_sddl(
            "O:BAD:(A;;FA;;;S-1-1-0)(A;;FR;;;S-1-5-66)(D;;FW;;;S-1-5-18)",
        );
        let path = Path::new("object");
        let error = apply_descriptor(&provider, path, &model).unwrap_err();
        match error {
            ApplyError::Partial {
                applied, failures, ..
            } => {
                assert_eq!(applied, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].identity, "S-1-5-66");
            }
            ApplyError::Provider { .. } => panic!("expected a partial apply"),
        }
        let written = provider.stored(path).unwrap();
        assert!(!written.contains("S-1-5-66"), "rejected entry was written");
        assert!(written.contains("(A;;FA;;;S-1-1-0)"), "accepted entry lost");
        assert!(written.contains("(D;;FW;;;S-1-5-18)"), "accepted entry lost");
    }

    #[test]
    fn hopeless_object_reports_a_provider_error() {
        let provider = StubProvider::rejecting(vec!["D:"]);
        let model = SecurityDescriptor::from_sddl("O:BAD:(A;;FA;;;S-1-1-0)");
        let error = apply_descriptor(&provider, Path::new("object"), &model).unwrap_err();
        assert!(matches!(error, ApplyError::Provider { .. }));
    }

    #[test]
    fn read_model_parses_the_stored_descriptor() {
        let provider = StubProvider::rejecting(vec![]);
        let path = Path::new("object");
        provider
            .write_descriptor(path, "O:SYG:BAD:(D;;FA;;;WD)")
            .unwrap();
        let model = read_model(&provider, path).unwrap();
        assert_eq!(model.owner.as_deref(), Some("SY"));
        assert_eq!(model.dacl.token_count(), 1);
    }
}
