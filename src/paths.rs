//! Deterministic output path derivation
//!
//! Path building is pure: the same (artist, post, file) always maps to the
//! same path, and entries identical in the path-relevant fields collide on
//! purpose: that collision is the idempotence mechanism that lets a re-run
//! skip everything already on disk.

use std::path::{Path, PathBuf};

use crate::types::{Artist, FileEntry, PostDetail};

/// Characters replaced during sanitization: whitespace plus shell- and
/// filesystem-hostile punctuation.
fn is_reserved(c: char) -> bool {
    c.is_whitespace() || matches!(c, '&' | '?' | '*' | ':' | '|' | '"' | '<' | '>' | '(' | ')')
}

/// Replace every maximal run of reserved characters with a single `_`.
///
/// Idempotent: sanitizing already-sanitized text is a no-op.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if is_reserved(c) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Derive the destination path for one file:
/// `<out_dir>/<artist>/<postId>-<postTitle>/<NN>-<timestamp>-<name>.<ext>`.
pub fn file_path(out_dir: &Path, artist: &Artist, post: &PostDetail, file: &FileEntry) -> PathBuf {
    out_dir
        .join(sanitize(&artist.name))
        .join(format!("{}-{}", post.id, sanitize(&post.title)))
        .join(format!("{}.{}", sanitize(&file.basename()), file.extension))
}
