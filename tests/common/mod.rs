//! Common test utilities for integration tests.

pub mod assertions;
pub mod fixtures;

use orbital_cdn::config::SimulationConfig;
use std::path::PathBuf;
use tempfile::TempDir;

// Re-export common types
pub use assertions::*;
pub use fixtures::*;

/// Test environment that manages a temporary directory for config files
/// and reports.
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self { temp_dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes raw text to a file in the temp dir.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// Serializes a configuration to a file in the temp dir.
    pub fn write_config(&self, name: &str, config: &SimulationConfig) -> PathBuf {
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        self.write(name, &json)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_write_config() {
        let env = TestEnv::new();
        let path = env.write_config("sim.json", &SimulationConfig::development());
        assert!(path.exists());
    }
}
