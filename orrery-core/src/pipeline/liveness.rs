use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set by the owner while it still wants the pipeline's result. The
/// pipeline checks it between stages and abandons the attempt once revoked.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_is_shared_by_clones() {
        let owner = Liveness::new();
        let worker = owner.clone();
        assert!(worker.is_alive());
        owner.revoke();
        assert!(!worker.is_alive());
    }
}
