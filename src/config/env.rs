use serde_json::Value;

use super::driver::{configured_file, read_file, DriverKind, FormatDriver};
use super::{ConfigError, ConfigMap};

/// Reads `KEY=value` lines from an env file.
///
/// Blank lines are skipped, and so is any line containing `#` anywhere, not
/// only lines that start with it. Values are kept as unparsed strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvDriver;

impl EnvDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for EnvDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Env
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        let path = configured_file(settings, self.valid_file_types())?;
        Ok(parse_env(&read_file(&path)?))
    }
}

pub(crate) fn parse_env(contents: &str) -> ConfigMap {
    let mut data = ConfigMap::new();

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.contains('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) => {
                data.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => {
                data.insert(line.to_string(), Value::Null);
            }
        }
    }

    data
}

/// Load handler that exports scalar values into the process environment.
///
/// Nested arrays and objects are skipped.
pub fn export_env(data: &ConfigMap) {
    for (key, value) in data {
        let exported = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                tracing::trace!(key = %key, "skipping non-scalar value for env export");
                continue;
            }
        };
        std::env::set_var(key, exported);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let data = parse_env("\n \n#test\nKEY1=value1\nKEY2=value2\n");
        assert_eq!(
            Value::Object(data),
            json!({ "KEY1": "value1", "KEY2": "value2" })
        );
    }

    #[test]
    fn test_hash_anywhere_comments_out_the_line() {
        let data = parse_env("URL=http://host/#anchor\nNAME=app # trailing\nPORT=80\n");
        assert_eq!(Value::Object(data), json!({ "PORT": "80" }));
    }

    #[test]
    fn test_value_split_on_first_equals() {
        let data = parse_env("DSN=mysql://u:p@h/db?x=1\n");
        assert_eq!(data["DSN"], json!("mysql://u:p@h/db?x=1"));
    }

    #[test]
    fn test_values_are_unparsed() {
        let data = parse_env("DEBUG=true\nPORT=8080\nEMPTY=\n");
        assert_eq!(data["DEBUG"], json!("true"));
        assert_eq!(data["PORT"], json!("8080"));
        assert_eq!(data["EMPTY"], json!(""));
    }

    #[test]
    fn test_extract_reads_configured_file() {
        let mut file = tempfile::Builder::new().suffix(".env").tempfile().unwrap();
        writeln!(file, "APP_NAME=dragon").unwrap();

        let settings = json!({ "file": file.path() }).as_object().cloned().unwrap();
        let data = EnvDriver.extract(&settings).unwrap();
        assert_eq!(data["APP_NAME"], json!("dragon"));
    }

    #[test]
    fn test_extract_rejects_foreign_extension() {
        let file = NamedTempFile::new().unwrap();
        let settings = json!({ "file": file.path() }).as_object().cloned().unwrap();
        let result = EnvDriver.extract(&settings);
        assert!(matches!(result, Err(ConfigError::UnsupportedFileType(_))));
    }

    #[test]
    fn test_export_env_sets_scalars() {
        let data = json!({
            "DRAGON_LOADER_EXPORT_STR": "on",
            "DRAGON_LOADER_EXPORT_NUM": 3,
            "DRAGON_LOADER_EXPORT_NESTED": { "a": 1 }
        });
        export_env(data.as_object().unwrap());

        assert_eq!(std::env::var("DRAGON_LOADER_EXPORT_STR").unwrap(), "on");
        assert_eq!(std::env::var("DRAGON_LOADER_EXPORT_NUM").unwrap(), "3");
        assert!(std::env::var("DRAGON_LOADER_EXPORT_NESTED").is_err());
    }
}
