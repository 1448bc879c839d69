//! Per-step temp resources (spec §9 "Scoped process resources"). Backed
//! directly by `tempfile`'s RAII handles rather than a bespoke "step scope"
//! type — `NamedTempFile`/`TempDir` already guarantee removal on every exit
//! path, including early returns and panics, which is exactly the
//! discipline spec §5 calls for.

use std::io;
use std::path::Path;

use tempfile::{NamedTempFile, TempDir};

pub struct StepScope {
    pub output_file: NamedTempFile,
    pub output_dir: TempDir,
    pub wrapped_script: NamedTempFile,
    pub env_sidecar: NamedTempFile,
}

impl StepScope {
    pub fn acquire() -> io::Result<Self> {
        Ok(Self {
            output_file: NamedTempFile::new()?,
            output_dir: TempDir::new()?,
            wrapped_script: NamedTempFile::new()?,
            env_sidecar: NamedTempFile::new()?,
        })
    }

    pub fn output_file_path(&self) -> &Path {
        self.output_file.path()
    }

    pub fn output_dir_path(&self) -> &Path {
        self.output_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_are_removed_when_scope_drops() {
        let (file_path, dir_path) = {
            let scope = StepScope::acquire().unwrap();
            (
                scope.output_file_path().to_path_buf(),
                scope.output_dir_path().to_path_buf(),
            )
        };
        assert!(!file_path.exists());
        assert!(!dir_path.exists());
    }
}
