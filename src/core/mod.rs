//! Core snapshot domain: change detection, version allocation, policies.

pub mod exclude;
pub mod fingerprint;
pub mod scan;
pub mod version;

pub use exclude::ExcludePolicy;
pub use fingerprint::{FingerprintCache, TreeDigest};
pub use scan::{ScanOutcome, ScanPolicy, SkipReason};
pub use version::VersionTag;
