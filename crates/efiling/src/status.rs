use std::path::Path;

use anyhow::{anyhow, Result};
use efiling_core::{EfilingError, FileMap, TableSpec, Team};
use serde_json::{Map, Value};

use crate::AppContext;

pub fn run(ctx: &AppContext, job_dir: &Path) -> Result<()> {
    if !job_dir.is_dir() {
        return Err(anyhow!("job folder {} does not exist", job_dir.display()));
    }
    let team = ctx.user.team;
    let tables = ctx.system.rules.tables(team)?;
    let status = evaluate_tables(team, tables, ctx.system.rules.file_map(), job_dir)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Folder status of every table that carries options, keyed `table_<i>`.
pub fn evaluate_tables(
    team: Team,
    tables: &[TableSpec],
    file_map: &FileMap,
    working_dir: &Path,
) -> Result<Value, EfilingError> {
    let mut out = Map::new();
    for (index, table) in tables.iter().enumerate() {
        let Some(options) = &table.options else {
            continue;
        };
        let status = team.evaluate(working_dir, options, file_map)?;
        out.insert(format!("table_{index}"), serde_json::to_value(&status)?);
    }
    Ok(Value::Object(out))
}
