//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

const ENV_VARS: &[&str] = &[
    "VAULTCACHE_CONFIG",
    "VAULTCACHE_CACHE_FILE",
    "VAULTCACHE_REFRESH_INTERVAL",
    "VAULTCACHE_CLIENT_ID",
    "VAULTCACHE_CLIENT_SECRET",
    "VAULTCACHE_LOG",
];

impl Test {
    /// Create a vaultcache command isolated from the caller's environment.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("vaultcache").expect("failed to find vaultcache binary");
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to run vaultcache {}: {}", args.join(" "), e))
    }

    pub fn status(&self) -> Output {
        self.run(&["status"])
    }

    pub fn status_json(&self) -> Output {
        self.run(&["status", "--json"])
    }

    pub fn refresh(&self) -> Output {
        self.run(&["refresh"])
    }

    pub fn get(&self, key: &str) -> Output {
        self.run(&["get", key])
    }

    pub fn list(&self) -> Output {
        self.run(&["list"])
    }

    pub fn list_json(&self) -> Output {
        self.run(&["list", "--json"])
    }

    pub fn clear(&self) -> Output {
        self.run(&["clear"])
    }
}
