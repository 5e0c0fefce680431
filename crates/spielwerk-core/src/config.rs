// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server and printer configuration.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpielwerkError};

/// IPP versions this server knows how to speak.
pub const KNOWN_IPP_VERSIONS: &[&str] = &["1.0", "1.1"];

/// Settings for the whole server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the IPP listener binds to.
    pub bind_address: IpAddr,
    /// Port for the IPP listener (default 631).
    pub port: u16,
    /// Host name used when building `printer-uri` / `job-uri` values.
    pub hostname: String,
    /// Directory that spooled documents are written to.
    pub spool_dir: PathBuf,
    /// Advertise every printer over mDNS / DNS-SD.
    pub advertise_mdns: bool,
    /// Largest request body accepted, in bytes.
    pub max_request_bytes: usize,
    /// Printer answering CUPS-Get-Default; its `ipp_versions` gate every request.
    pub default_printer: String,
    pub printers: Vec<PrinterConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 631,
            hostname: "localhost".into(),
            spool_dir: std::env::temp_dir().join("spielwerk-spool"),
            advertise_mdns: false,
            max_request_bytes: 256 * 1024 * 1024,
            default_printer: "jukebox".into(),
            printers: vec![PrinterConfig::default()],
        }
    }
}

impl ServerConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.printers.is_empty() {
            return Err(SpielwerkError::Config("no printers configured".into()));
        }
        let mut seen = HashSet::new();
        for printer in &self.printers {
            printer.validate()?;
            if !seen.insert(printer.name.as_str()) {
                return Err(SpielwerkError::Config(format!(
                    "printer {} configured twice",
                    printer.name
                )));
            }
        }
        if !seen.contains(self.default_printer.as_str()) {
            return Err(SpielwerkError::Config(format!(
                "default printer {} is not configured",
                self.default_printer
            )));
        }
        if self.max_request_bytes == 0 {
            return Err(SpielwerkError::Config("max_request_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn printer(&self, name: &str) -> Option<&PrinterConfig> {
        self.printers.iter().find(|p| p.name == name)
    }
}

/// Settings for one audio printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Queue name, used in `/printers/<name>` URIs.
    pub name: String,
    /// IPP versions accepted from clients, e.g. `["1.0", "1.1"]`.
    pub ipp_versions: Vec<String>,
    /// Sleep instead of launching the player.
    pub dry_run: bool,
    /// How long a dry-run "playback" lasts.
    pub dry_run_millis: u64,
    /// Player program and its leading arguments; the document path is
    /// appended.
    pub player_command: Vec<String>,
    /// `printer-info` text.
    pub info: String,
    /// `printer-location` text.
    pub location: String,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "jukebox".into(),
            ipp_versions: vec!["1.0".into(), "1.1".into()],
            dry_run: false,
            dry_run_millis: 1000,
            player_command: vec!["mplayer".into(), "-really-quiet".into(), "-slave".into()],
            info: "Spielwerk audio printer".into(),
            location: String::new(),
        }
    }
}

impl PrinterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(SpielwerkError::Config(format!(
                "invalid printer name {:?}",
                self.name
            )));
        }
        if self.ipp_versions.is_empty() {
            return Err(SpielwerkError::Config(format!(
                "printer {} has no ipp_versions",
                self.name
            )));
        }
        if let Some(bad) = self
            .ipp_versions
            .iter()
            .find(|v| !KNOWN_IPP_VERSIONS.contains(&v.as_str()))
        {
            return Err(SpielwerkError::Config(format!(
                "printer {}: unsupported IPP version {bad}",
                self.name
            )));
        }
        if !self.dry_run && self.player_command.is_empty() {
            return Err(SpielwerkError::Config(format!(
                "printer {} needs a player_command unless dry_run is set",
                self.name
            )));
        }
        Ok(())
    }

    /// Whether `major.minor` is one of the accepted versions.
    pub fn accepts_version(&self, major: u8, minor: u8) -> bool {
        let wanted = format!("{major}.{minor}");
        self.ipp_versions.iter().any(|v| *v == wanted)
    }

    /// A dry-run configuration, handy in tests.
    pub fn dry_run(name: &str, millis: u64) -> Self {
        Self {
            name: name.into(),
            dry_run: true,
            dry_run_millis: millis,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        ServerConfig::default().validate().expect("default config");
    }

    #[test]
    fn empty_ipp_versions_rejected() {
        let mut printer = PrinterConfig::dry_run("p", 10);
        printer.ipp_versions.clear();
        assert!(matches!(printer.validate(), Err(SpielwerkError::Config(_))));
    }

    #[test]
    fn unknown_ipp_version_rejected() {
        let mut printer = PrinterConfig::dry_run("p", 10);
        printer.ipp_versions = vec!["2.0".into()];
        assert!(printer.validate().is_err());
    }

    #[test]
    fn real_playback_needs_a_command() {
        let mut printer = PrinterConfig::default();
        printer.player_command.clear();
        assert!(printer.validate().is_err());
        printer.dry_run = true;
        printer.validate().expect("dry run needs no command");
    }

    #[test]
    fn duplicate_printer_names_rejected() {
        let config = ServerConfig {
            printers: vec![PrinterConfig::dry_run("jukebox", 1), PrinterConfig::dry_run("jukebox", 2)],
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_printer_must_exist() {
        let config = ServerConfig {
            default_printer: "nowhere".into(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_version_matches_configured_list() {
        let printer = PrinterConfig {
            ipp_versions: vec!["1.1".into()],
            ..PrinterConfig::dry_run("p", 1)
        };
        assert!(printer.accepts_version(1, 1));
        assert!(!printer.accepts_version(1, 0));
        assert!(!printer.accepts_version(2, 0));
    }

    #[test]
    fn load_reads_partial_json_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"port": 8631, "default_printer": "radio",
                "printers": [{{"name": "radio", "dry_run": true}}]}}"#
        )
        .expect("write config");

        let config = ServerConfig::load(file.path()).expect("load config");
        assert_eq!(config.port, 8631);
        assert_eq!(config.printers.len(), 1);
        assert_eq!(config.printers[0].ipp_versions, vec!["1.0", "1.1"]);
        assert!(config.printer("radio").is_some());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(SpielwerkError::Serialization(_))
        ));
    }
}
