//! vanguard-platform: host detection and workspace layout
//!
//! This crate answers two questions the rest of vanguard keeps asking:
//! - what operating system and CPU architecture are we running on, in the
//!   vocabulary each runtime distribution endpoint expects, and
//! - where on disk definitions, service checkouts, and toolchain caches
//!   live relative to the configured workspace root.

pub mod paths;
pub mod platform;

pub use paths::WorkspacePaths;
pub use platform::{Arch, Os, Platform};
