#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

pub mod analyze;
pub mod error;
pub mod lockfile;
pub mod manifest;
pub mod npmrc;
pub mod options;
pub mod pack;
pub mod registry;
pub mod size;
pub mod tree;
pub mod workspaces;

pub use analyze::{analyze, Analyzer};
pub use error::AnalyzeError;
pub use lockfile::{LockEntry, Lockfile, LOCKFILE_NAME};
pub use manifest::{PackageId, PackageJson};
pub use npmrc::default_registry;
pub use options::AnalyzeOptions;
pub use registry::{MetaFetcher, RegistryClient, DEFAULT_REGISTRY};
pub use size::{LocalSizeCache, SizeMode, SizeStrategy};
pub use tree::TreeNode;
pub use workspaces::{WorkspaceIndex, WorkspacePackage};
