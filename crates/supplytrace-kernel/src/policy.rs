use supplytrace_types::{TrackerError, TrackerResult};

/// Validation of the free-form strings a caller writes.
///
/// Runs after authorization and existence checks, so a policy rejection
/// never masks an authorization or not-found failure.
pub trait FieldPolicy: Send + Sync {
    fn check_status(&self, status: &str) -> TrackerResult<()>;
    fn check_action(&self, action: &str) -> TrackerResult<()>;
}

/// Accepts every value, including empty strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Permissive;

impl FieldPolicy for Permissive {
    fn check_status(&self, _status: &str) -> TrackerResult<()> {
        Ok(())
    }

    fn check_action(&self, _action: &str) -> TrackerResult<()> {
        Ok(())
    }
}

/// Accepts only configured values. An empty list leaves that field open.
#[derive(Clone, Debug, Default)]
pub struct EnumeratedPolicy {
    statuses: Vec<String>,
    actions: Vec<String>,
}

impl EnumeratedPolicy {
    pub fn new(statuses: Vec<String>, actions: Vec<String>) -> Self {
        Self { statuses, actions }
    }

    fn check(field: &str, allowed: &[String], value: &str) -> TrackerResult<()> {
        if allowed.is_empty() || allowed.iter().any(|a| a == value) {
            Ok(())
        } else {
            Err(TrackerError::Validation(format!(
                "{field} {value:?} is not one of {allowed:?}"
            )))
        }
    }
}

impl FieldPolicy for EnumeratedPolicy {
    fn check_status(&self, status: &str) -> TrackerResult<()> {
        Self::check("status", &self.statuses, status)
    }

    fn check_action(&self, action: &str) -> TrackerResult<()> {
        Self::check("action", &self.actions, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplytrace_types::ErrorKind;

    #[test]
    fn permissive_accepts_empty_strings() {
        assert!(Permissive.check_status("").is_ok());
        assert!(Permissive.check_action("").is_ok());
    }

    #[test]
    fn enumerated_rejects_unknown_status() {
        let policy = EnumeratedPolicy::new(
            vec!["RAW".into(), "IN_TRANSIT".into()],
            vec![],
        );
        assert!(policy.check_status("RAW").is_ok());
        let err = policy.check_status("LOST").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        // No actions configured: anything goes.
        assert!(policy.check_action("INSPECTED").is_ok());
    }
}
