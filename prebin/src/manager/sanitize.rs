//! Cleanup of build-store paths left inside downloaded artifacts.
//!
//! Some reproducible-build toolchains publish scripts whose interpreter
//! directive points into the build store, e.g.
//! `#!/nix/store/<hash>-bash/bin/bash`. Such scripts only run on a machine
//! with the same store, so the store prefix is stripped.
//!
//! Corrections are gated on the first line: unless it is an interpreter
//! directive into the store, no byte of the file is touched. This keeps
//! arbitrary binaries that merely contain similar byte sequences intact.

use std::fs;
use std::io;
use std::path::Path;

use regex::bytes::Regex;

/// Default build-store root.
pub const DEFAULT_STORE_ROOT: &str = "/nix/store";

/// Rewrites store paths inside downloaded artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactSanitizer {
    shebang: Regex,
    bin_path: Regex,
}

impl Default for ArtifactSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_ROOT)
    }
}

impl ArtifactSanitizer {
    /// Create a sanitizer for the given store root (no trailing slash).
    pub fn new(store_root: &str) -> Self {
        let root = regex::escape(store_root.trim_end_matches('/'));
        let shebang = Regex::new(&format!(r"^#!\s*{}/[^/]+/", root))
            .expect("store root is escaped");
        let bin_path =
            Regex::new(&format!(r"{}/[^/]+/bin/", root)).expect("store root is escaped");
        Self { shebang, bin_path }
    }

    /// Apply corrections to in-memory content.
    ///
    /// Returns `None` when the content needs no correction.
    pub fn sanitize_bytes(&self, content: &[u8]) -> Option<Vec<u8>> {
        let mut lines = content.split(|b| *b == b'\n');
        let first = lines.next()?;
        if !self.shebang.is_match(first) {
            return None;
        }

        let mut out = Vec::with_capacity(content.len());
        out.extend_from_slice(&self.shebang.replace(first, &b"#!/"[..]));
        for line in lines {
            out.push(b'\n');
            out.extend_from_slice(&self.bin_path.replace_all(line, &b""[..]));
        }
        Some(out)
    }

    /// Sanitize a file in place.
    ///
    /// Returns whether a correction was made. The file is rewritten only
    /// in that case.
    pub fn sanitize(&self, path: &Path) -> io::Result<bool> {
        let content = fs::read(path)?;
        match self.sanitize_bytes(&content) {
            Some(corrected) => {
                fs::write(path, corrected)?;
                tracing::info!(
                    path = %path.display(),
                    "Artifact referenced the build store, corrections have been made"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Sanitize a file with the default store root.
pub fn sanitize(path: &Path) -> io::Result<bool> {
    ArtifactSanitizer::default().sanitize(path)
}
