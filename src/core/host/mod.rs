// ─── Host Collaborators ───
// Contracts for the pieces owned by the embedding runtime: loading code,
// generating fast-load stubs and answering confirmation prompts.

pub mod loader;
pub mod policy;

pub use loader::{ActivationError, Loader, StubGenerator};
pub use policy::{FixedPolicy, Policy, PolicyFn, PromptKind};
