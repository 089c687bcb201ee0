//! Configuration commands.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &CliConfig, path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_round_trips_through_toml() {
        let mut config = CliConfig::default();
        config.auth.client_id = Some("pass::google/id".into());
        config.calendar.time_zone = Some("Europe/Paris".into());

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[auth]"));
        assert!(text.contains("client_id = \"pass::google/id\""));

        let back = CliConfig::parse(&text).unwrap();
        assert_eq!(back.calendar.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(back.calendar.calendar_ids, ["primary"]);
    }
}
