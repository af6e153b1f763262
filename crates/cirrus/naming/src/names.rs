//! Server group name rendering and parsing
//!
//! A server group name is `<cluster>[-v<NNN>]`, where the cluster is
//! derived from an application, an optional stack and an optional detail:
//!
//! | application | stack | detail | cluster            |
//! |-------------|-------|--------|--------------------|
//! | `app`       |       |        | `app`              |
//! | `app`       | `st`  |        | `app-st`           |
//! | `app`       | `st`  | `d`    | `app-st-d`         |
//! | `app`       |       | `d`    | `app--d`           |

use serde::{Deserialize, Serialize};

use crate::error::{NamingError, Result};

/// Marker between a cluster and its sequence number.
const SEQUENCE_MARKER: &str = "-v";

/// Sequence width names are rendered with unless configured otherwise.
pub const DEFAULT_SEQUENCE_DIGITS: usize = 3;

/// Render the cluster (family) name for an application/stack/detail triple.
pub fn cluster_name(application: &str, stack: Option<&str>, detail: Option<&str>) -> String {
    let stack = stack.unwrap_or_default();
    match detail {
        Some(detail) if !detail.is_empty() => format!("{application}-{stack}-{detail}"),
        _ if !stack.is_empty() => format!("{application}-{stack}"),
        _ => application.to_string(),
    }
}

/// Render a sequenced server group name.
pub fn sequenced_name(cluster: &str, sequence: u32, digits: usize) -> String {
    format!("{cluster}{SEQUENCE_MARKER}{sequence:0digits$}")
}

/// Validate the components of a name before anything is sent remotely.
pub fn validate_components(
    application: &str,
    stack: Option<&str>,
    detail: Option<&str>,
) -> Result<()> {
    if application.trim().is_empty() {
        return Err(NamingError::InvalidName {
            component: "application",
            value: application.to_string(),
            reason: "must not be blank".to_string(),
        });
    }
    check_charset("application", application, false)?;
    if let Some(stack) = stack {
        check_charset("stack", stack, false)?;
    }
    if let Some(detail) = detail {
        check_charset("detail", detail, true)?;
    }
    Ok(())
}

fn check_charset(component: &'static str, value: &str, allow_hyphen: bool) -> Result<()> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || (allow_hyphen && c == '-'));
    if valid {
        Ok(())
    } else {
        let allowed = if allow_hyphen {
            "letters, digits, '.', '_' and '-'"
        } else {
            "letters, digits, '.' and '_'"
        };
        Err(NamingError::InvalidName {
            component,
            value: value.to_string(),
            reason: format!("may only contain {allowed}"),
        })
    }
}

/// The structure recovered from a server group name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub cluster: String,
    pub application: String,
    pub stack: Option<String>,
    pub detail: Option<String>,
    pub sequence: Option<u32>,
}

impl NameParts {
    /// Parse a server group name rendered with the default sequence width.
    pub fn parse(name: &str) -> Self {
        Self::parse_with_digits(name, DEFAULT_SEQUENCE_DIGITS)
    }

    /// Parse a server group name whose sequence has at least `digits` digits.
    pub fn parse_with_digits(name: &str, digits: usize) -> Self {
        let (cluster, sequence) = split_sequence(name, digits.max(1));

        let mut segments = cluster.splitn(3, '-');
        let application = segments.next().unwrap_or_default().to_string();
        let stack = segments
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let detail = segments
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            cluster: cluster.to_string(),
            application,
            stack,
            detail,
            sequence,
        }
    }
}

/// Split `<cluster>-vNNN` into the cluster and its sequence.
fn split_sequence(name: &str, min_digits: usize) -> (&str, Option<u32>) {
    if let Some(index) = name.rfind(SEQUENCE_MARKER) {
        let digits = &name[index + SEQUENCE_MARKER.len()..];
        if digits.len() >= min_digits && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(sequence) = digits.parse::<u32>() {
                return (&name[..index], Some(sequence));
            }
        }
    }
    (name, None)
}

/// Task family of a server group: everything before the last `-`.
pub fn family_name(server_group_name: &str) -> Option<&str> {
    server_group_name
        .rfind('-')
        .map(|index| &server_group_name[..index])
}

/// Container name of a server group: everything after the last `-`.
pub fn container_name(server_group_name: &str) -> Option<&str> {
    server_group_name
        .rfind('-')
        .map(|index| &server_group_name[index + 1..])
}
