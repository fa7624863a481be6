//! Cgroup discovery over the v1 and v2 filesystem layouts.
//!
//! This module turns the cgroup hierarchies found by [`crate::mounts`] into logical
//! [`Cgroup`] entities, each naming the directories its controllers live in.
//!
//! # Key Components
//!
//! - [`ReaderFilter`] — Decides which directories are cgroups and assigns identifiers.
//!   [`DefaultFilter`] accepts everything, [`ContainerFilter`] only container ids.
//! - [`V1Walker`] — Walks one base controller and mirrors paths onto the others.
//! - [`V2Walker`] — Walks the unified hierarchy.
//! - [`Walker`] — The version-specific walker selected once per reader.
//! - [`Snapshot`] — An immutable set of cgroups from one discovery pass.
//!
//! # Directory Walk
//!
//! Both walkers descend the tree until a directory is accepted by the filter or has no
//! subdirectories left. Directories that disappear while walking, e.g. because a
//! container exited, are treated as not matching.
mod error;
mod filter;
mod id;
mod model;
mod v1;
mod v2;
mod walk;

pub use error::{Error, RefreshError, Result};
pub use filter::{ContainerFilter, DefaultFilter, FilterError, FilterResult, ReaderFilter};
pub use id::CgroupID;
pub use model::{Cgroup, Snapshot};
pub use v1::V1Walker;
pub use v2::V2Walker;
pub use walk::{Cgroups, Walker};
