//! Common test utilities and helpers

#![allow(dead_code)]

use assert_cmd::Command;
use distrib_exec::storage::{MemorySnapshot, OrderFlags, OrderId};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A seeded memory store file plus an isolated config directory
pub struct SeededRun {
    temp_dir: TempDir,
    seed_path: PathBuf,
}

impl SeededRun {
    pub fn new(snapshot: &MemorySnapshot) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let seed_path = temp_dir.path().join("store.json");
        fs::write(&seed_path, serde_json::to_string_pretty(snapshot).unwrap()).unwrap();
        Self {
            temp_dir,
            seed_path,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Binary wired to the seed file, with no ambient configuration
    pub fn command(&self) -> Command {
        let mut cmd = isolated_command(self.temp_dir.path());
        cmd.env("DISTRIB_STORAGE_TYPE", "memory")
            .env("DISTRIB_MEMORY_SEED", &self.seed_path);
        cmd
    }

    /// Store contents after the run
    pub fn snapshot(&self) -> MemorySnapshot {
        serde_json::from_str(&fs::read_to_string(&self.seed_path).unwrap()).unwrap()
    }

    pub fn config(&self, field: &str) -> Option<String> {
        self.snapshot().configs.get(field).cloned()
    }

    pub fn flags(&self, id: OrderId) -> OrderFlags {
        self.snapshot()
            .orders
            .iter()
            .find(|o| o.id == id.0)
            .map(|o| OrderFlags::from_bits_retain(o.flags))
            .unwrap()
    }
}

/// The binary with environment overrides cleared and the config dir moved
/// into `home`
pub fn isolated_command(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("distrib-exec").unwrap();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("DISTRIB_CONFIG")
        .env_remove("DISTRIB_STORAGE_TYPE")
        .env_remove("DISTRIB_DATABASE_URL")
        .env_remove("DISTRIB_MEMORY_SEED")
        .env_remove("DISTRIB_LOG_FILE")
        .env_remove("AUTOBAHN_ROUTER")
        .env_remove("AUTOBAHN_REALM");
    cmd
}
