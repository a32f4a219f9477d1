//! vanguard-lib: core logic of the vanguard orchestrator
//!
//! The crate is organized along the boot pipeline:
//! - `defs`: decode Service/Environment manifests and resolve them into a
//!   definition store (imports, ports, secrets, overrides)
//! - `source`: materialize a git repository at a branch into the workspace
//! - `toolchain`: download and cache the language runtimes services declare
//! - `deployment`: install and supervise one child process per service
//! - `environment`: the manager that wires the above together
//!
//! External collaborators (the control-plane token endpoint, the secrets
//! backend) are reached only through the capabilities in `providers`.

pub mod defs;
pub mod deployment;
pub mod environment;
pub mod fetch;
pub mod providers;
pub mod source;
pub mod toolchain;
