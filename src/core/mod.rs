// ─── modpkg Core ───
// Filename-convention module package manager.
//
// Architecture:
//   core/
//     version/    — Dot-delimited version vectors
//     locator/    — Naming convention, candidate scoring, root search
//     archive/    — Archive type detection + scratch-dir extraction
//     downloader/ — Streaming HTTP downloads
//     fetcher/    — Ordered download strategies for bare names
//     host/       — Loader, policy and stub generator contracts
//     registry/   — Modules activated at startup
//     installer/  — Install workflow, dependency recursion, uninstall
//     state/      — Settings, data directory, application state

pub mod archive;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod http;
pub mod installer;
pub mod locator;
pub mod registry;
pub mod state;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;
