//! Persistence: directory layout, image downloads and document files.
//!
//! # Submodules
//!
//! - [`layout`]: Maps an article to its document path and images directory
//! - [`images`]: Idempotent, per-run-deduplicated image downloads
//! - [`document`]: Directory creation and document writes
//!
//! # Output Structure
//!
//! ```text
//! dist/                            (flat layout)
//! ├── articles/
//! │   └── 2021-05-04-my-post.md
//! └── images/
//!     └── hero.png
//! ```

pub mod document;
pub mod images;
pub mod layout;
