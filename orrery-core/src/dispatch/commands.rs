//! Messages carried from producer threads to the engine thread.

/// An opaque unit of work for the engine thread.
pub type Task<E> = Box<dyn FnOnce(&mut E) + Send + 'static>;

pub(crate) enum EngineCmd<E> {
    Run(Task<E>),
    /// Wakes the engine thread so it notices the closed flag.
    Shutdown,
}

impl<E> std::fmt::Debug for EngineCmd<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCmd::Run(_) => f.write_str("Run(..)"),
            EngineCmd::Shutdown => f.write_str("Shutdown"),
        }
    }
}
