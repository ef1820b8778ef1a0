//! Driver dispatch: one table maps driver names and file extensions to drivers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::env::EnvDriver;
use super::formats::{ArrayDriver, JsonDriver, ValueDriver, YamlDriver};
use super::xml::XmlDriver;
use super::{ConfigError, ConfigMap};

/// The closed set of configuration drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Value,
    Env,
    Array,
    Json,
    Xml,
    Yaml,
}

/// Extracts raw key/value data from one source format.
pub trait FormatDriver: std::fmt::Debug {
    fn kind(&self) -> DriverKind;

    /// File extensions this driver accepts. An empty list accepts any source.
    fn valid_file_types(&self) -> &'static [&'static str] {
        DriverKind::extensions(self.kind())
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError>;
}

struct DriverSpec {
    kind: DriverKind,
    name: &'static str,
    extensions: &'static [&'static str],
    build: fn() -> Box<dyn FormatDriver>,
}

static DRIVERS: &[DriverSpec] = &[
    DriverSpec {
        kind: DriverKind::Value,
        name: "value",
        extensions: &[],
        build: ValueDriver::boxed,
    },
    DriverSpec {
        kind: DriverKind::Env,
        name: "env",
        extensions: &["env"],
        build: EnvDriver::boxed,
    },
    DriverSpec {
        kind: DriverKind::Array,
        name: "array",
        extensions: &["toml"],
        build: ArrayDriver::boxed,
    },
    DriverSpec {
        kind: DriverKind::Json,
        name: "json",
        extensions: &["json"],
        build: JsonDriver::boxed,
    },
    DriverSpec {
        kind: DriverKind::Xml,
        name: "xml",
        extensions: &["xml"],
        build: XmlDriver::boxed,
    },
    DriverSpec {
        kind: DriverKind::Yaml,
        name: "yaml",
        extensions: &["yaml", "yml"],
        build: YamlDriver::boxed,
    },
];

impl DriverKind {
    pub const ALL: [DriverKind; 6] = [
        DriverKind::Value,
        DriverKind::Env,
        DriverKind::Array,
        DriverKind::Json,
        DriverKind::Xml,
        DriverKind::Yaml,
    ];

    // DRIVERS rows are declared in enum order.
    fn spec(self) -> &'static DriverSpec {
        &DRIVERS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn extensions(self) -> &'static [&'static str] {
        self.spec().extensions
    }

    /// Instantiates the driver for this kind.
    pub fn driver(self) -> Box<dyn FormatDriver> {
        (self.spec().build)()
    }

    /// Finds the driver that owns the given file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<DriverKind> {
        DRIVERS
            .iter()
            .find(|spec| spec.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .map(|spec| spec.kind)
    }

    /// Infers the driver from a file path's extension.
    pub fn from_path(path: &Path) -> Result<DriverKind, ConfigError> {
        file_extension(path)
            .and_then(|ext| Self::from_extension(&ext))
            .ok_or_else(|| ConfigError::UnsupportedFileType(path.to_path_buf()))
    }
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DRIVERS
            .iter()
            .find(|spec| spec.name == s)
            .map(|spec| spec.kind)
            .ok_or_else(|| ConfigError::UnsupportedDriver(s.to_string()))
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the extension of `path`, treating dotfiles such as `.env` as
/// extension-only names.
pub(crate) fn file_extension(path: &Path) -> Option<String> {
    if let Some(ext) = path.extension() {
        return Some(ext.to_string_lossy().into_owned());
    }
    let name = path.file_name()?.to_string_lossy();
    name.strip_prefix('.')
        .filter(|rest| !rest.is_empty() && !rest.contains('.'))
        .map(str::to_string)
}

/// Resolves the `file` setting and validates it against `valid_types`.
pub(crate) fn configured_file(
    settings: &ConfigMap,
    valid_types: &[&str],
) -> Result<PathBuf, ConfigError> {
    let path = settings
        .get("file")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::FileNotConfigured)?;

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path));
    }

    if !valid_types.is_empty() {
        let supported = file_extension(&path)
            .map(|ext| valid_types.iter().any(|t| t.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        if !supported {
            return Err(ConfigError::UnsupportedFileType(path));
        }
    }

    Ok(path)
}

/// Reads a whole config file, mapping I/O failures to [`ConfigError::ReadError`].
pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(file: &str) -> ConfigMap {
        json!({ "file": file }).as_object().cloned().unwrap()
    }

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in DriverKind::ALL {
            assert_eq!(kind.name().parse::<DriverKind>().unwrap(), kind);
            assert_eq!(kind.driver().kind(), kind);
        }
    }

    #[test]
    fn test_unknown_driver_name() {
        let result = "dd".parse::<DriverKind>();
        assert!(matches!(result, Err(ConfigError::UnsupportedDriver(name)) if name == "dd"));
    }

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(DriverKind::from_extension("env"), Some(DriverKind::Env));
        assert_eq!(DriverKind::from_extension("toml"), Some(DriverKind::Array));
        assert_eq!(DriverKind::from_extension("json"), Some(DriverKind::Json));
        assert_eq!(DriverKind::from_extension("xml"), Some(DriverKind::Xml));
        assert_eq!(DriverKind::from_extension("yml"), Some(DriverKind::Yaml));
        assert_eq!(DriverKind::from_extension("YAML"), Some(DriverKind::Yaml));
        assert_eq!(DriverKind::from_extension("txt"), None);
    }

    #[test]
    fn test_from_path_handles_dotfiles() {
        assert_eq!(DriverKind::from_path(Path::new("/app/.env")).unwrap(), DriverKind::Env);
        assert_eq!(
            DriverKind::from_path(Path::new("conf/app.yaml")).unwrap(),
            DriverKind::Yaml
        );
        assert!(matches!(
            DriverKind::from_path(Path::new("notes.txt")),
            Err(ConfigError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            DriverKind::from_path(Path::new("Makefile")),
            Err(ConfigError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_configured_file_not_configured() {
        let result = configured_file(&ConfigMap::new(), &["json"]);
        assert!(matches!(result, Err(ConfigError::FileNotConfigured)));
    }

    #[test]
    fn test_configured_file_missing() {
        let result = configured_file(&settings("/nonexistent/app.json"), &["json"]);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_configured_file_wrong_type() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let result = configured_file(&settings(&path), &["json"]);
        assert!(matches!(result, Err(ConfigError::UnsupportedFileType(_))));

        // No declared types accepts anything that exists.
        assert!(configured_file(&settings(&path), &[]).is_ok());
    }
}
