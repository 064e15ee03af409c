//! Per-field validation rules
//!
//! [`validate`] turns one raw answer into a [`Value`]. It only touches the
//! filesystem for path fields: input paths are opened, output directories
//! are created and probed with a temporary file.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use labflow_sdk::{FieldSchema, FieldType};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::{Parameters, Value};
use crate::error::{CollectionError, FieldError, ValidationError};
use crate::prompt::parse_yes_no;

/// Validate one raw answer against its field schema
pub fn validate(field: &FieldSchema, raw: &str) -> Result<Value, FieldError> {
    let trimmed = raw.trim();

    let value = match &field.field_type {
        FieldType::Text => Value::Text(non_empty(field, trimmed)?.to_string()),
        FieldType::Number { min, max } => {
            let number: i64 = trimmed.parse().map_err(|_| ValidationError::InvalidNumber {
                value: trimmed.to_string(),
                expected: "whole number",
            })?;
            let (lo, hi) = (min.unwrap_or(i64::MIN), max.unwrap_or(i64::MAX));
            if number < lo || number > hi {
                return Err(ValidationError::OutOfRange {
                    value: number,
                    min: lo,
                    max: hi,
                }
                .into());
            }
            Value::Integer(number)
        }
        FieldType::Float => Value::Float(parse_float(trimmed)?),
        FieldType::Bool => Value::Bool(parse_yes_no(trimmed).ok_or_else(|| {
            ValidationError::InvalidBool {
                value: trimmed.to_string(),
            }
        })?),
        FieldType::Identifiers { max_digits } => {
            let tokens = split_list(field, trimmed)?;
            match max_digits {
                Some(max_digits) => {
                    for token in &tokens {
                        if token.len() > *max_digits || !token.chars().all(|c| c.is_ascii_digit()) {
                            return Err(ValidationError::InvalidCode {
                                value: token.clone(),
                                max_digits: *max_digits,
                            }
                            .into());
                        }
                    }
                    // "1" and "01" name the same code
                    reject_duplicates_by(&tokens, |t| t.trim_start_matches('0'))?;
                }
                None => reject_duplicates(&tokens)?,
            }
            Value::List(tokens)
        }
        FieldType::FloatList { .. } => {
            let numbers = split_list(field, trimmed)?
                .iter()
                .map(|token| parse_float(token))
                .collect::<Result<Vec<_>, _>>()?;
            Value::FloatList(numbers)
        }
        FieldType::Select { options, .. } => Value::Text(match_option(trimmed, options)?),
        FieldType::MultiSelect { options } => {
            let chosen = split_list(field, trimmed)?
                .iter()
                .map(|token| match_option(token, options))
                .collect::<Result<Vec<_>, _>>()?;
            reject_duplicates(&chosen)?;
            Value::List(chosen)
        }
        FieldType::InputPath { directory } => {
            let path = PathBuf::from(non_empty(field, trimmed)?);
            check_input_path(&path, *directory)?;
            Value::Path(path)
        }
        FieldType::OutputDir => {
            let path = PathBuf::from(non_empty(field, trimmed)?);
            prepare_output_dir(&path)?;
            Value::Path(path)
        }
        FieldType::Repeated { .. } => {
            return Err(ValidationError::Grouped {
                field: field.label.clone(),
            }
            .into())
        }
    };

    Ok(value)
}

/// Checks that depend on answers given earlier
///
/// `scopes` are searched in order, innermost first.
pub fn check_relations(
    field: &FieldSchema,
    value: &Value,
    scopes: &[&Parameters],
) -> Result<(), ValidationError> {
    match &field.field_type {
        FieldType::Select {
            distinct_from: Some(other),
            ..
        } => {
            if let Some(other_value) = lookup(scopes, other) {
                if other_value.to_answer() == value.to_answer() {
                    return Err(ValidationError::SameAs {
                        field: field.label.clone(),
                        other: other.replace('_', " "),
                        value: value.to_answer(),
                    });
                }
            }
        }
        FieldType::FloatList {
            len_matches: Some(other),
        } => {
            let expected = lookup(scopes, other).and_then(Value::len);
            let actual = value.len().unwrap_or(0);
            if let Some(expected) = expected {
                if actual != expected && actual != 1 {
                    return Err(ValidationError::LengthMismatch {
                        field: field.label.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn lookup<'a>(scopes: &[&'a Parameters], name: &str) -> Option<&'a Value> {
    scopes.iter().find_map(|scope| scope.get(name))
}

fn non_empty<'a>(field: &FieldSchema, trimmed: &'a str) -> Result<&'a str, ValidationError> {
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: field.label.clone(),
        });
    }
    Ok(trimmed)
}

fn parse_float(token: &str) -> Result<f64, ValidationError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            value: token.to_string(),
            expected: "decimal number",
        })
}

/// Comma and/or whitespace separated tokens
fn split_list(field: &FieldSchema, raw: &str) -> Result<Vec<String>, ValidationError> {
    let tokens: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        return Err(ValidationError::EmptyList {
            field: field.label.clone(),
        });
    }
    Ok(tokens)
}

fn reject_duplicates(tokens: &[String]) -> Result<(), ValidationError> {
    reject_duplicates_by(tokens, |t| t)
}

fn reject_duplicates_by<'a>(
    tokens: &'a [String],
    key: impl Fn(&'a str) -> &'a str,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for token in tokens {
        if !seen.insert(key(token.as_str())) {
            return Err(ValidationError::Duplicate {
                value: token.clone(),
            });
        }
    }
    Ok(())
}

/// Case-insensitive option match, with a fuzzy suggestion on failure
fn match_option(value: &str, options: &[String]) -> Result<String, ValidationError> {
    if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(value)) {
        return Ok(option.clone());
    }

    let matcher = SkimMatcherV2::default();
    let suggestion = options
        .iter()
        .filter_map(|o| matcher.fuzzy_match(o, value).map(|score| (score, o)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, o)| o.clone());

    Err(ValidationError::UnknownOption {
        value: value.to_string(),
        options: options.to_vec(),
        suggestion,
    })
}

/// A name used as a file name inside the output directory
pub fn check_file_name(field: &FieldSchema, name: &str) -> Result<(), ValidationError> {
    let escapes = name.contains(['/', '\\']) || name == "." || name == "..";
    if escapes {
        return Err(ValidationError::NotAFileName {
            field: field.label.clone(),
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Input must exist, be of the declared kind, and open for reading
pub fn check_input_path(path: &Path, directory: bool) -> Result<(), ValidationError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ValidationError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ValidationError::NotReadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let not_readable = |e: std::io::Error| ValidationError::NotReadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if directory {
        if !metadata.is_dir() {
            return Err(ValidationError::WrongKind {
                path: path.to_path_buf(),
                expected: "directory",
            });
        }
        fs::read_dir(path).map_err(not_readable)?;
    } else {
        if !metadata.is_file() {
            return Err(ValidationError::WrongKind {
                path: path.to_path_buf(),
                expected: "file",
            });
        }
        fs::File::open(path).map_err(not_readable)?;
    }

    Ok(())
}

/// Make sure the output directory exists and accepts writes
///
/// Creates the directory (and parents) when absent. Failures are fatal.
pub fn prepare_output_dir(path: &Path) -> Result<(), CollectionError> {
    let not_writable = |source: std::io::Error| CollectionError::OutputNotWritable {
        path: path.to_path_buf(),
        source,
    };

    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(CollectionError::OutputNotDirectory {
                path: path.to_path_buf(),
            })
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(not_writable)?;
            tracing::info!(path = %path.display(), "created output directory");
        }
        Err(e) => return Err(not_writable(e)),
    }

    // Dropped (and removed) immediately
    tempfile::Builder::new()
        .prefix(".labflow-probe")
        .tempfile_in(path)
        .map_err(not_writable)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: FieldType) -> FieldSchema {
        FieldSchema::new("f", "Field", field_type)
    }

    fn invalid(result: Result<Value, FieldError>) -> ValidationError {
        match result {
            Err(FieldError::Invalid(e)) => e,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn text_rejects_whitespace_only() {
        let err = invalid(validate(&field(FieldType::Text), "   \t"));
        assert_eq!(
            err,
            ValidationError::Empty {
                field: "Field".into()
            }
        );
    }

    #[test]
    fn text_is_trimmed() {
        let value = validate(&field(FieldType::Text), "  run_1 ").unwrap();
        assert_eq!(value, Value::Text("run_1".into()));
    }

    #[test]
    fn identifiers_reject_duplicates() {
        let f = field(FieldType::Identifiers { max_digits: None });
        let err = invalid(validate(&f, "S1, S1"));
        assert_eq!(err, ValidationError::Duplicate { value: "S1".into() });
    }

    #[test]
    fn identifiers_reject_empty_list() {
        let f = field(FieldType::Identifiers { max_digits: None });
        assert!(matches!(
            invalid(validate(&f, " , ")),
            ValidationError::EmptyList { .. }
        ));
    }

    #[test]
    fn identifiers_keep_order() {
        let f = field(FieldType::Identifiers { max_digits: None });
        let value = validate(&f, "S2 S1,S3").unwrap();
        assert_eq!(
            value,
            Value::List(vec!["S2".into(), "S1".into(), "S3".into()])
        );
    }

    #[test]
    fn numeric_codes_are_checked() {
        let f = field(FieldType::Identifiers {
            max_digits: Some(2),
        });
        assert!(validate(&f, "0, 2, 15").is_ok());
        assert!(matches!(
            invalid(validate(&f, "123")),
            ValidationError::InvalidCode { .. }
        ));
        assert!(matches!(
            invalid(validate(&f, "a1")),
            ValidationError::InvalidCode { .. }
        ));
    }

    #[test]
    fn numeric_codes_are_compared_by_value() {
        let f = field(FieldType::Identifiers {
            max_digits: Some(2),
        });
        assert_eq!(
            invalid(validate(&f, "1, 01")),
            ValidationError::Duplicate { value: "01".into() }
        );
        assert_eq!(
            invalid(validate(&f, "0 00")),
            ValidationError::Duplicate { value: "00".into() }
        );
        assert!(validate(&f, "1, 10").is_ok());
    }

    #[test]
    fn file_names_stay_in_place() {
        let f = field(FieldType::Text);
        for name in ["../escaped", "a/b", "a\\b", ".", ".."] {
            assert!(
                matches!(
                    check_file_name(&f, name),
                    Err(ValidationError::NotAFileName { .. })
                ),
                "{} was accepted",
                name
            );
        }
        assert!(check_file_name(&f, "run..2").is_ok());
        assert!(check_file_name(&f, "protein_isolation_2025_07_20").is_ok());
    }

    #[test]
    fn number_parse_failure_is_not_a_crash() {
        let f = field(FieldType::Number {
            min: Some(1),
            max: Some(10),
        });
        assert!(matches!(
            invalid(validate(&f, "three")),
            ValidationError::InvalidNumber { .. }
        ));
        assert!(matches!(
            invalid(validate(&f, "11")),
            ValidationError::OutOfRange { .. }
        ));
        assert_eq!(validate(&f, "2").unwrap(), Value::Integer(2));
    }

    #[test]
    fn float_rejects_nan() {
        assert!(matches!(
            invalid(validate(&field(FieldType::Float), "NaN")),
            ValidationError::InvalidNumber { .. }
        ));
        assert_eq!(
            validate(&field(FieldType::Float), "-0.25").unwrap(),
            Value::Float(-0.25)
        );
    }

    #[test]
    fn select_is_case_insensitive_and_suggests() {
        let f = field(FieldType::Select {
            options: vec!["eDensity".into(), "hDensity".into()],
            distinct_from: None,
        });
        assert_eq!(
            validate(&f, "EDENSITY").unwrap(),
            Value::Text("eDensity".into())
        );
        match invalid(validate(&f, "hDnsity")) {
            ValidationError::UnknownOption { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("hDensity"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn input_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let f = field(FieldType::InputPath { directory: false });
        assert!(matches!(
            invalid(validate(&f, missing.to_str().unwrap())),
            ValidationError::NotFound { .. }
        ));

        let present = dir.path().join("in.csv");
        fs::write(&present, "a,b\n").unwrap();
        assert_eq!(
            validate(&f, present.to_str().unwrap()).unwrap(),
            Value::Path(present)
        );
    }

    #[test]
    fn input_path_kind_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let f = field(FieldType::InputPath { directory: false });
        assert!(matches!(
            invalid(validate(&f, dir.path().to_str().unwrap())),
            ValidationError::WrongKind { .. }
        ));
        let d = field(FieldType::InputPath { directory: true });
        assert!(validate(&d, dir.path().to_str().unwrap()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_input_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked.csv");
        fs::write(&locked, "a,b\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind root
        if fs::File::open(&locked).is_ok() {
            return;
        }

        let f = field(FieldType::InputPath { directory: false });
        assert!(matches!(
            invalid(validate(&f, locked.to_str().unwrap())),
            ValidationError::NotReadable { .. }
        ));
    }

    #[test]
    fn output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        validate(&field(FieldType::OutputDir), out.to_str().unwrap()).unwrap();
        assert!(out.is_dir());
        // Probe file is cleaned up
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn output_dir_over_a_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "").unwrap();
        let result = validate(&field(FieldType::OutputDir), file.to_str().unwrap());
        assert!(matches!(
            result,
            Err(FieldError::Fatal(CollectionError::OutputNotDirectory { .. }))
        ));
    }

    #[test]
    fn distinct_axes_are_enforced() {
        let f = FieldSchema::new(
            "cutline_axis",
            "Cutline axis",
            FieldType::Select {
                options: vec!["x".into(), "y".into(), "z".into()],
                distinct_from: Some("cutplane_axis".into()),
            },
        );
        let mut scope = Parameters::new();
        scope.insert("cutplane_axis".into(), Value::Text("z".into()));

        let err = check_relations(&f, &Value::Text("z".into()), &[&scope]).unwrap_err();
        assert!(matches!(err, ValidationError::SameAs { .. }));
        assert!(check_relations(&f, &Value::Text("x".into()), &[&scope]).is_ok());
    }

    #[test]
    fn list_length_must_match_or_be_single() {
        let f = FieldSchema::new(
            "cutline_positions",
            "Cutline positions",
            FieldType::FloatList {
                len_matches: Some("tdr_codes".into()),
            },
        );
        let mut outer = Parameters::new();
        outer.insert(
            "tdr_codes".into(),
            Value::List(vec!["0001".into(), "0002".into(), "0003".into()]),
        );
        let inner = Parameters::new();
        let scopes = [&inner, &outer];

        assert!(check_relations(&f, &Value::FloatList(vec![0.1, 0.2, 0.3]), &scopes).is_ok());
        assert!(check_relations(&f, &Value::FloatList(vec![0.1]), &scopes).is_ok());
        assert_eq!(
            check_relations(&f, &Value::FloatList(vec![0.1, 0.2]), &scopes).unwrap_err(),
            ValidationError::LengthMismatch {
                field: "Cutline positions".into(),
                expected: 3,
                actual: 2,
            }
        );
    }
}
