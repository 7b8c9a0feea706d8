#![allow(dead_code)]
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Defaults loaded from an optional YAML file, overridden by whichever
/// flags the invocation actually passed.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub community: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("snmp-cli.yaml");
            if p.exists() {
                p.to_path_buf()
            } else {
                return None;
            }
        }
    };
    let s = fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&s).ok()
}
