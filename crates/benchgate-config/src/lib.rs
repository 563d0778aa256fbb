//! Configuration loading and merging for benchgate.
//!
//! A `benchgate.toml` has a `[defaults]` table and any number of `[[subject]]`
//! tables. Loading resolves every subject against the defaults once, so the
//! rest of the workspace only ever sees [`SubjectConfig`].

use benchgate_error::ConfigError;
use benchgate_types::{ConfigFile, DEFAULT_MAX_RETRIES, SubjectConfig, SubjectConfigFile};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Upper bound on `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// A validated configuration with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub subjects: Vec<SubjectConfig>,
    pub max_retries: u32,
}

impl Config {
    /// Subjects matching any of `names` or any of `groups`, in file order.
    ///
    /// With no filters every subject is selected. Naming a subject that does
    /// not exist is an error rather than an empty selection.
    pub fn select(
        &self,
        names: &[String],
        groups: &[String],
    ) -> Result<Vec<&SubjectConfig>, ConfigError> {
        if let Some(missing) = names
            .iter()
            .find(|n| !self.subjects.iter().any(|s| &s.name == *n))
        {
            return Err(ConfigError::UnknownSubject(missing.clone()));
        }

        if names.is_empty() && groups.is_empty() {
            return Ok(self.subjects.iter().collect());
        }

        Ok(self
            .subjects
            .iter()
            .filter(|s| names.contains(&s.name) || s.in_groups(groups))
            .collect())
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectConfig> {
        self.subjects.iter().find(|s| s.name == name)
    }
}

/// Read and resolve a TOML config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    resolve_config(file)
}

/// Apply defaults to every subject and validate the result.
pub fn resolve_config(file: ConfigFile) -> Result<Config, ConfigError> {
    let max_retries = file.defaults.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
    if max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::TooManyRetries {
            got: max_retries,
            max: MAX_RETRIES_LIMIT,
        });
    }
    if let Some(threshold) = file.defaults.retry_threshold {
        validate_threshold(threshold)?;
    }

    let mut seen = BTreeSet::new();
    let mut subjects = Vec::with_capacity(file.subjects.len());
    for subject in file.subjects {
        if !seen.insert(subject.name.clone()) {
            return Err(ConfigError::DuplicateSubject(subject.name));
        }
        let resolved = merge_defaults(
            &file.defaults.assertions,
            file.defaults.retry_threshold,
            subject,
        );
        if let Some(threshold) = resolved.retry_threshold {
            validate_threshold(threshold)?;
        }
        subjects.push(resolved);
    }

    Ok(Config {
        subjects,
        max_retries,
    })
}

/// Default assertions come first; the subject's own threshold wins.
fn merge_defaults(
    default_assertions: &[String],
    default_threshold: Option<f64>,
    subject: SubjectConfigFile,
) -> SubjectConfig {
    let mut assertions = default_assertions.to_vec();
    assertions.extend(subject.assertions);

    SubjectConfig {
        name: subject.name,
        groups: subject.groups,
        skip: subject.skip,
        assertions,
        retry_threshold: subject.retry_threshold.or(default_threshold),
    }
}

fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRetryThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        resolve_config(toml::from_str(text).unwrap())
    }

    const SAMPLE: &str = r#"
[defaults]
assertions = ["mode.time < 1 second"]
retry_threshold = 5.0

[[subject]]
name = "parse_small"
groups = ["parser"]
assertions = ["mode.mem <= 10 megabytes"]

[[subject]]
name = "parse_large"
groups = ["parser", "slow"]
retry_threshold = 2.5

[[subject]]
name = "render"
skip = true
"#;

    #[test]
    fn defaults_are_merged_before_subject_assertions() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);

        let small = config.subject("parse_small").unwrap();
        assert_eq!(
            small.assertions,
            vec!["mode.time < 1 second", "mode.mem <= 10 megabytes"]
        );
        assert_eq!(small.retry_threshold, Some(5.0));

        let large = config.subject("parse_large").unwrap();
        assert_eq!(large.assertions, vec!["mode.time < 1 second"]);
        assert_eq!(large.retry_threshold, Some(2.5));

        assert!(config.subject("render").unwrap().skip);
    }

    #[test]
    fn empty_config_is_valid() {
        let config = parse("").unwrap();
        assert!(config.subjects.is_empty());
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn duplicate_subjects_are_rejected() {
        let err = parse(
            r#"
[[subject]]
name = "a"

[[subject]]
name = "a"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSubject(ref n) if n == "a"));
    }

    #[test]
    fn retry_settings_are_validated() {
        let err = parse("[defaults]\nmax_retries = 11\n").unwrap_err();
        assert!(matches!(err, ConfigError::TooManyRetries { got: 11, max: 10 }));

        let err = parse("[[subject]]\nname = \"a\"\nretry_threshold = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRetryThreshold(t) if t == 0.0));

        let err = parse("[defaults]\nretry_threshold = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRetryThreshold(_)));
    }

    fn names(selected: Vec<&SubjectConfig>) -> Vec<String> {
        selected.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn select_by_name_and_group() {
        let config = parse(SAMPLE).unwrap();

        assert_eq!(
            names(config.select(&[], &[]).unwrap()),
            vec!["parse_small", "parse_large", "render"]
        );
        assert_eq!(
            names(config.select(&[], &["slow".to_string()]).unwrap()),
            vec!["parse_large"]
        );
        assert_eq!(
            names(
                config
                    .select(&["render".to_string()], &["slow".to_string()])
                    .unwrap()
            ),
            vec!["parse_large", "render"]
        );
        assert!(config.select(&[], &["nope".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn selecting_an_unknown_subject_fails() {
        let config = parse(SAMPLE).unwrap();
        let err = config.select(&["missing".to_string()], &[]).unwrap_err();
        assert_eq!(err.to_string(), "unknown subject `missing`");
    }

    #[test]
    fn load_config_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.subjects.len(), 3);
    }

    #[test]
    fn load_config_reports_path_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.toml"));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[[subject]]\nname = 3\n").unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }
}
