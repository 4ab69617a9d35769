// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics that point at the
//! offending line of `livia.toml` and suggest the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(livia::config::unknown_key))]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        #[help]
        help: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` should be {expected}, found {found}")]
    #[diagnostic(code(livia::config::invalid_type))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type for this key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(livia::config::missing_key),
        help("set `{key}` in livia.toml or through a LIVIA_ environment variable")
    )]
    MissingKey { key: String },

    /// A value that parsed but breaks a rule (bad URL, zero timeout...).
    #[error("validation error: {message}")]
    #[diagnostic(code(livia::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(livia::config::other))]
    Other(String),
}

/// Where a diagnostic points: the span of a key and the file holding it.
type Located = (Option<SourceSpan>, Option<NamedSource<String>>);

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `toml_sources` are `(path, content)` pairs of the files that were merged.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let suggestion = suggest_key(field, expected);
                    let help = match &suggestion {
                        Some(s) => format!("did you mean `{s}`? Valid keys: {}", expected.join(", ")),
                        None => format!("valid keys: {}", expected.join(", ")),
                    };
                    // Unknown fields report the enclosing table as their path.
                    let (span, src) = locate(&error, &path, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion,
                        help,
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: qualified(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, section)) => locate(&error, section, field, toml_sources),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: actual.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn qualified(section: &[String], field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", section.join("."))
    }
}

fn locate(
    error: &figment::error::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> Located {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        // Inline strings carry no file metadata; fall back to the only source.
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, section, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the table `[a.b]` named by `section`
/// (or from the top of the file for top-level keys).
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let start = if section.is_empty() {
        0
    } else {
        let header = format!("[{}]", section.join("."));
        content.find(&header)? + header.len()
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, above the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// One diagnostic rendered the way the CLI prints it.
pub fn render_report(error: &ConfigError) -> String {
    let mut out = String::new();
    if GraphicalReportHandler::new()
        .render_report(&mut out, error as &dyn Diagnostic)
        .is_err()
    {
        out = format!("Error: {error}\n");
    }
    out
}

/// Render diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprint!("{}", render_report(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_and_validate_str;

    #[test]
    fn suggests_close_key() {
        let valid = &["webhook_url", "timeout_secs"];
        assert_eq!(
            suggest_key("webhok_url", valid),
            Some("webhook_url".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port", "log_level"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn finds_key_inside_section() {
        let content = "[server]\nhost = \"0.0.0.0\"\n\n[workflow]\ntimeout_sec = 3\n";
        let offset = find_key_offset(content, &["workflow".to_string()], "timeout_sec").unwrap();
        assert_eq!(&content[offset..offset + 11], "timeout_sec");
    }

    #[test]
    fn key_lookup_stops_at_next_table() {
        let content = "[server]\nhost = \"h\"\n\n[workflow]\nport = 1\n";
        assert!(find_key_offset(content, &["server".to_string()], "port").is_none());
        assert!(find_key_offset(content, &["billing".to_string()], "port").is_none());
    }

    #[test]
    fn wrong_type_points_at_the_value_key() {
        let toml = "[server]\nport = \"eighty\"\n";
        let errors = load_and_validate_str(toml).unwrap_err();
        let (key, span) = errors
            .iter()
            .find_map(|e| match e {
                ConfigError::InvalidType { key, span, .. } => Some((key.clone(), *span)),
                _ => None,
            })
            .expect("should produce an InvalidType diagnostic");
        assert_eq!(key, "server.port");
        let span = span.expect("span into the inline source");
        assert_eq!(&toml[span.offset()..span.offset() + span.len()], "port");
    }

    #[test]
    fn rendered_unknown_key_carries_suggestion() {
        let errors = load_and_validate_str("[workflow]\nwebhok_url = \"x\"\n").unwrap_err();
        let rendered = render_report(&errors[0]);
        assert!(rendered.contains("webhok_url"), "{rendered}");
        assert!(rendered.contains("did you mean `webhook_url`?"), "{rendered}");
    }
}
