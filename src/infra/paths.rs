// src/infra/paths.rs — Config path resolution
//
// BAMOT_HOME overrides everything. Otherwise the config lives under the
// platform config directory (XDG_CONFIG_HOME/bamot on Linux).

use std::path::PathBuf;

/// Returns the BAMOT_HOME override, if set.
fn bamot_home() -> Option<PathBuf> {
    std::env::var_os("BAMOT_HOME").map(PathBuf::from)
}

/// Configuration directory: $BAMOT_HOME/ or <config dir>/bamot/
pub fn config_dir() -> PathBuf {
    if let Some(home) = bamot_home() {
        return home;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bamot")
}

/// Path of the optional TOML config file.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_name() {
        let p = config_file_path();
        assert_eq!(p.file_name().and_then(|f| f.to_str()), Some("config.toml"));
    }
}
