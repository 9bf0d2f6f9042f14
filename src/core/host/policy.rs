use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every yes/no decision the package manager may need from its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// No local copy exists; fetching from the network is required.
    DownloadWithoutLocalCopy,
    /// A file or directory of the same name is already installed.
    OverwriteExistingFile,
    /// The activated file carries inline fast-load markers.
    GenerateFastLoadStub,
    /// Add the module to the list activated at startup.
    RegisterForAutostart,
    /// Uninstall: delete module files living directly in a search root.
    DeleteSiblingFiles,
    /// Uninstall: delete the module's own package directory.
    DeleteSubdirectory,
}

/// Caller-supplied confirmation capability.
///
/// Batch callers supply a fixed answer; interactive ones prompt.
pub trait Policy: Send + Sync {
    fn approve(&self, kind: PromptKind, context: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub bool);

impl FixedPolicy {
    pub fn approve_all() -> Self {
        Self(true)
    }

    pub fn decline_all() -> Self {
        Self(false)
    }
}

impl Policy for FixedPolicy {
    fn approve(&self, kind: PromptKind, context: &str) -> bool {
        debug!("Policy {:?} for {}: {}", kind, context, self.0);
        self.0
    }
}

/// Closure-backed policy, e.g. to approve only some prompt kinds.
pub struct PolicyFn<F>(pub F);

impl<F> Policy for PolicyFn<F>
where
    F: Fn(PromptKind, &str) -> bool + Send + Sync,
{
    fn approve(&self, kind: PromptKind, context: &str) -> bool {
        (self.0)(kind, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_answers_uniformly() {
        assert!(FixedPolicy::approve_all().approve(PromptKind::DeleteSubdirectory, "x"));
        assert!(!FixedPolicy::decline_all().approve(PromptKind::RegisterForAutostart, "x"));
    }

    #[test]
    fn closure_policy_can_discriminate_by_kind() {
        let policy = PolicyFn(|kind, _: &str| kind != PromptKind::OverwriteExistingFile);
        assert!(policy.approve(PromptKind::DownloadWithoutLocalCopy, "foo"));
        assert!(!policy.approve(PromptKind::OverwriteExistingFile, "foo.el"));
    }
}
