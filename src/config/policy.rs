use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the dispatcher does when the converter exits with a non-zero status.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    #[serde(rename = "abort")]
    Abort,
    #[serde(rename = "continue")]
    Continue,
    #[serde(rename = "ignore")]
    Ignore,
}

/// How measurement files are located after extraction.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    #[serde(rename = "glob")]
    Glob,
    #[serde(rename = "strict")]
    Strict,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PolicyParseError(String);

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid value '{}'", self.0)
    }
}

impl std::error::Error for PolicyParseError {}

impl FromStr for FailurePolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            "ignore" => Ok(FailurePolicy::Ignore),
            other => Err(PolicyParseError(other.to_string())),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::Ignore => write!(f, "ignore"),
        }
    }
}
