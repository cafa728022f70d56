//! Category image fetcher: pulls candidate images from remote sources, runs them through an
//! approval decision and stores the approved ones until each category reaches its quota.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![deny(warnings)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod candidate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod console;
pub mod constants;
pub mod decision;
pub mod error;
pub mod fetcher;
pub mod menu;
pub mod normalize;
pub mod progress;
pub mod retrieve;
pub mod sources;
pub mod storage;
pub mod web;
