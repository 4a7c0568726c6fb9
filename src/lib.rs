//! # git-rockstar
//!
//! A CLI tool and library that fabricates a believable, linear commit
//! history for a single file across a span of past days.
//!
//! This crate provides functionality to:
//! - Split the final file into growing, line-aligned snapshots
//! - Pick off days and spread commit times over the remaining days
//! - Commit each snapshot with its historical author and committer date
//!
//! ## Usage
//!
//! ```bash
//! # 365 days ending today, 20% of days without commits
//! git-rockstar --code newai.py --days 365 --off-fraction 0.2
//!
//! # Preview a reproducible plan without writing anything
//! git-rockstar --code newai.py --seed 7 --dry-run
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface and main entry point
//! - [`config`] - Flag and environment settings
//! - [`rockstar`] - Planning and running a fabrication
//! - [`segment`] - Snapshot segmentation
//! - [`schedule`] - Off days and commit times
//! - [`driver`] - Ordered application of commits
//! - [`repo`] - Version-control capability and in-memory backend
//! - [`git`] - Git command backend
//! - [`prompt`] - User input abstractions
//! - [`banner`] - Plan summary banner

pub mod banner;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod git;
pub mod prompt;
pub mod repo;
pub mod request;
pub mod rockstar;
pub mod schedule;
pub mod segment;

pub use error::{FabricationError, RepoError};
pub use rockstar::{FabricationPlan, FabricationSummary, RockStar};
