use std::path::Path;

use tracing::{info, warn};

use crate::rules::TableSpec;
use crate::status::subfolder_path;
use crate::team::Team;

pub fn precheck(working_dir: &Path, team: Team, tables: &[TableSpec]) -> bool {
    if !working_dir.is_dir() {
        warn!(dir = %working_dir.display(), "working folder is not a directory");
        return false;
    }
    let mut missing = 0usize;
    for folder in tables
        .iter()
        .filter_map(|table| table.options.as_ref())
        .flat_map(|options| options.keys())
    {
        let path = subfolder_path(working_dir, folder);
        if !path.is_dir() {
            missing += 1;
            warn!(folder = %folder, path = %path.display(), "configured subfolder missing");
        }
    }
    if missing > 0 && team.is_strict() {
        warn!(team = %team, missing, "precheck failed");
        return false;
    }
    info!(dir = %working_dir.display(), team = %team, missing, "precheck passed");
    true
}
