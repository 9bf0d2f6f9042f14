use std::sync::{Arc, Mutex, MutexGuard};

/// Modules whose install workflow is currently running, outermost first.
///
/// Used only to detect dependency cycles. Membership is held by an
/// [`InstallingGuard`] and released when the guard drops, on every exit path.
#[derive(Debug, Clone, Default)]
pub struct InstallingSet {
    stack: Arc<Mutex<Vec<String>>>,
}

impl InstallingSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // The stack holds plain names; a poisoned lock leaves them usable.
        self.stack.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.lock().iter().any(|name| name == module)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Mark `module` as installing until the returned guard is dropped.
    pub fn enter(&self, module: &str) -> InstallingGuard {
        self.lock().push(module.to_string());
        InstallingGuard {
            set: self.clone(),
            module: module.to_string(),
        }
    }

    /// Path from the in-flight `dependency` down to the innermost install,
    /// closed with `dependency` again. Empty if `dependency` is not in flight.
    pub fn cycle_through(&self, dependency: &str) -> Vec<String> {
        let stack = self.lock();
        let Some(start) = stack.iter().position(|name| name == dependency) else {
            return Vec::new();
        };
        let mut cycle: Vec<String> = stack[start..].to_vec();
        cycle.push(dependency.to_string());
        cycle
    }
}

/// Scoped membership in an [`InstallingSet`].
#[derive(Debug)]
pub struct InstallingGuard {
    set: InstallingSet,
    module: String,
}

impl Drop for InstallingGuard {
    fn drop(&mut self) {
        let mut stack = self.set.lock();
        if let Some(index) = stack.iter().rposition(|name| *name == self.module) {
            stack.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_membership() {
        let set = InstallingSet::new();
        {
            let _a = set.enter("a");
            assert!(set.contains("a"));
            {
                let _b = set.enter("b");
                assert_eq!(set.snapshot(), vec!["a", "b"]);
            }
            assert!(!set.contains("b"));
        }
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn guard_releases_on_early_error() {
        fn failing(set: &InstallingSet) -> Result<(), String> {
            let _guard = set.enter("x");
            Err("boom".into())
        }
        let set = InstallingSet::new();
        assert!(failing(&set).is_err());
        assert!(!set.contains("x"));
    }

    #[test]
    fn cycle_runs_from_the_repeated_module() {
        let set = InstallingSet::new();
        let _a = set.enter("a");
        let _b = set.enter("b");
        let _c = set.enter("c");
        assert_eq!(set.cycle_through("b"), vec!["b", "c", "b"]);
        assert_eq!(set.cycle_through("a"), vec!["a", "b", "c", "a"]);
        assert!(set.cycle_through("z").is_empty());
    }
}
