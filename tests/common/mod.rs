//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Write `content` to `root/relative`, creating parent directories.
#[allow(dead_code)]
pub fn write_doc(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Create a small corpus under `<temp_dir>/notes/` and return its canonical path.
///
/// - `index.md`: frontmatter, two sections, a wiki link to `animals` and a relative link to
///   `./guides/setup.md`
/// - `animals.md`: mentions a dog and a cat in its first paragraph
/// - `dog.md`, `cat.md`: single-heading documents
/// - `guides/setup.md`: nested document
/// - `.obsidian/hidden.md` and `node_modules/pkg/readme.md`: never scanned by default
#[allow(dead_code)]
pub fn create_test_notes(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("notes");
    std::fs::create_dir(&root).unwrap();
    let root = root.canonicalize().unwrap();

    write_doc(
        &root,
        "index.md",
        r#"---
title: Home
tags:
  - start
---

# Home

Start with [[animals]] or read [the setup](./guides/setup.md).

## Getting Started

Some content here.
"#,
    );
    write_doc(
        &root,
        "animals.md",
        "# Animals\n\nThe dog chases the cat.\n",
    );
    write_doc(&root, "dog.md", "# Dog\n");
    write_doc(&root, "cat.md", "# Cat\n");
    write_doc(&root, "guides/setup.md", "# Setup\n\nInstall things.\n");
    write_doc(&root, ".obsidian/hidden.md", "# Hidden\n");
    write_doc(&root, "node_modules/pkg/readme.md", "# Readme\n");
    root
}
