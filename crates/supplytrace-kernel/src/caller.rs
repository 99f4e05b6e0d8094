use std::collections::HashSet;

use supplytrace_types::{Identity, TrackerError, TrackerResult};
use tracing::warn;

/// Hook run before any state-changing operation, ahead of role checks.
pub trait CallerVerifier: Send + Sync {
    fn verify(&self, caller: &Identity) -> TrackerResult<()>;
}

/// The calling environment already authenticated the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustAll;

impl CallerVerifier for TrustAll {
    fn verify(&self, _caller: &Identity) -> TrackerResult<()> {
        Ok(())
    }
}

/// Only identities on an allow-list may write.
#[derive(Clone, Debug, Default)]
pub struct KnownCallers {
    allowed: HashSet<Identity>,
}

impl KnownCallers {
    pub fn new(allowed: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allow(&mut self, identity: Identity) {
        self.allowed.insert(identity);
    }
}

impl CallerVerifier for KnownCallers {
    fn verify(&self, caller: &Identity) -> TrackerResult<()> {
        if self.allowed.contains(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "Unknown caller rejected");
            Err(TrackerError::Authentication(format!(
                "{caller} is not a known caller"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_callers_allow_list() {
        let mut verifier = KnownCallers::new([Identity::new("deployer")]);
        assert!(verifier.verify(&Identity::new("deployer")).is_ok());
        assert!(matches!(
            verifier.verify(&Identity::new("mallory")),
            Err(TrackerError::Authentication(_))
        ));

        verifier.allow(Identity::new("mallory"));
        assert!(verifier.verify(&Identity::new("mallory")).is_ok());
    }

    #[test]
    fn trust_all_accepts_anyone() {
        assert!(TrustAll.verify(&Identity::new("")).is_ok());
    }
}
