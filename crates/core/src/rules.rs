use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::slice;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EfilingError, Result};
use crate::team::Team;

pub type FileMap = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Date,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCellRef", into = "RawCellRef")]
pub struct FieldCellRef {
    pub row: u32,
    pub column: u32,
    pub kind: FieldKind,
}

#[derive(Serialize, Deserialize)]
struct RawCellRef {
    indexes: [u32; 2],
    #[serde(rename = "type", default)]
    kind: FieldKind,
}

impl From<RawCellRef> for FieldCellRef {
    fn from(raw: RawCellRef) -> Self {
        Self {
            row: raw.indexes[0],
            column: raw.indexes[1],
            kind: raw.kind,
        }
    }
}

impl From<FieldCellRef> for RawCellRef {
    fn from(value: FieldCellRef) -> Self {
        Self {
            indexes: [value.row, value.column],
            kind: value.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    One(FieldCellRef),
    Many(Vec<FieldCellRef>),
}

impl FieldSpec {
    pub fn refs(&self) -> &[FieldCellRef] {
        match self {
            FieldSpec::One(cell) => slice::from_ref(cell),
            FieldSpec::Many(cells) => cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionSpec {
    Presence(u32),
    Rules(IndexMap<String, u32>),
}

impl OptionSpec {
    pub fn rows(&self) -> Vec<u32> {
        match self {
            OptionSpec::Presence(row) => vec![*row],
            OptionSpec::Rules(rules) => rules.values().copied().collect(),
        }
    }
}

pub type FieldsSpec = IndexMap<String, Option<FieldSpec>>;
pub type OptionsSpec = IndexMap<String, OptionSpec>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub fields: Option<FieldsSpec>,
    #[serde(default)]
    pub options: Option<OptionsSpec>,
}

#[derive(Deserialize)]
struct RawRuleConfig {
    #[serde(rename = "subFolderConfig")]
    sub_folder_config: IndexMap<String, Vec<TableSpec>>,
    #[serde(default)]
    file_map: FileMap,
}

#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    teams: BTreeMap<Team, Vec<TableSpec>>,
    file_map: FileMap,
}

impl RuleConfig {
    pub fn new(teams: BTreeMap<Team, Vec<TableSpec>>, file_map: FileMap) -> Result<Self> {
        let config = Self { teams, file_map };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: RawRuleConfig = serde_json::from_str(raw)
            .map_err(|err| EfilingError::InvalidConfig(format!("rule config: {err}")))?;
        let mut teams = BTreeMap::new();
        for (name, tables) in parsed.sub_folder_config {
            let team: Team = name.parse()?;
            if teams.insert(team, tables).is_some() {
                return Err(EfilingError::InvalidConfig(format!(
                    "team {team} is configured more than once"
                )));
            }
        }
        Self::new(teams, parsed.file_map)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn tables(&self, team: Team) -> Result<&[TableSpec]> {
        self.teams
            .get(&team)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                EfilingError::InvalidConfig(format!("no subFolderConfig for team {team}"))
            })
    }

    pub fn file_map(&self) -> &FileMap {
        &self.file_map
    }

    fn validate(&self) -> Result<()> {
        for (team, tables) in &self.teams {
            for (index, table) in tables.iter().enumerate() {
                validate_table(*team, index, table)?;
            }
        }
        Ok(())
    }
}

fn validate_table(team: Team, index: usize, table: &TableSpec) -> Result<()> {
    let invalid = |detail: String| {
        EfilingError::InvalidConfig(format!("team {team} table {index}: {detail}"))
    };
    if let Some(fields) = &table.fields {
        for (name, spec) in fields {
            let Some(spec) = spec else { continue };
            for cell in spec.refs() {
                if cell.row == 0 || cell.column == 0 {
                    return Err(invalid(format!(
                        "field {name:?} uses a zero coordinate; cells are 1-based"
                    )));
                }
            }
        }
    }
    if let Some(options) = &table.options {
        for (folder, spec) in options {
            if team.is_strict() && matches!(spec, OptionSpec::Rules(_)) {
                return Err(invalid(format!(
                    "option {folder:?} must be a row number for this team"
                )));
            }
            if spec.rows().contains(&0) {
                return Err(invalid(format!(
                    "option {folder:?} uses row 0; rows are 1-based"
                )));
            }
        }
    }
    Ok(())
}
