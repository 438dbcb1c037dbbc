use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EfilingError, Result};

/// Organisational variant that selects the rule schema, the template and the
/// failure policy used for a job.
///
/// `General` is tolerant: a missing subfolder or control degrades one entry
/// and processing continues. `Ppt` is strict: a missing subfolder or control
/// aborts the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Team {
    General,
    Ppt,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::General => "general",
            Team::Ppt => "ppt",
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Team::General => "general_template",
            Team::Ppt => "ppt_template",
        }
    }

    pub fn template_file_name(&self) -> String {
        format!("{}.docx", self.template_name())
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Team::Ppt)
    }
}

impl FromStr for Team {
    type Err = EfilingError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "general" => Ok(Team::General),
            "ppt" => Ok(Team::Ppt),
            _ => Err(EfilingError::UnknownTeam(raw.to_string())),
        }
    }
}

impl TryFrom<String> for Team {
    type Error = EfilingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Team> for String {
    fn from(value: Team) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
