//! Browser collaborator traits and tab identity for bridle.
//!
//! The guard layer never drives a browser directly. It talks to two small
//! async traits, [`Browser`] for the session and [`Page`] for one open
//! tab, that an embedding supplies (CDP, WebDriver, an in-memory fake in
//! tests). What this crate does own is **tab identity**: the
//! [`TabRegistry`] assigns each page a stable id for its lifetime and
//! resolves which page an unscoped action applies to.

pub mod driver;
pub mod tabs;

pub use driver::{Browser, BrowserError, BrowserResult, Page};
pub use tabs::{TabInfo, TabRegistry};
