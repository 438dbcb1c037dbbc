use std::io::Write;

use anyhow::{anyhow, Context, Result};
use efiling_core::CoordinateCache;

use crate::AppContext;

pub fn run(ctx: &AppContext, template: Option<&str>) -> Result<()> {
    let path = &ctx.user.activex_cache;
    let cache = CoordinateCache::load(path)
        .with_context(|| format!("failed to load coordinate cache {}", path.display()))?;
    let stdout = std::io::stdout();
    list(&cache, template, &mut stdout.lock())
}

fn list<W: Write>(cache: &CoordinateCache, template: Option<&str>, out: &mut W) -> Result<()> {
    if let Some(name) = template {
        if cache.template(name).is_none() {
            return Err(anyhow!("template {name} is not cached"));
        }
    }
    for (name, coords) in cache.templates() {
        if template.is_some_and(|wanted| wanted != name) {
            continue;
        }
        writeln!(out, "{name}: {} controls", coords.len())?;
        for (table, rows) in coords.tables() {
            for (row, at) in rows {
                writeln!(out, "  table {table} row {row} -> ({}, {})", at.row, at.column)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = r#"{
        "general_template": {"table_0": {"9": {"row": 9, "column": 3}}},
        "ppt_template": {"table_1": {"4": {"row": 4, "column": 5}}}
    }"#;

    #[test]
    fn lists_one_template() {
        let cache = CoordinateCache::from_json_str(CACHE).unwrap();
        let mut out = Vec::new();
        list(&cache, Some("ppt_template"), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "ppt_template: 1 controls\n  table 1 row 4 -> (4, 5)\n");
    }

    #[test]
    fn unknown_template_is_an_error() {
        let cache = CoordinateCache::from_json_str(CACHE).unwrap();
        assert!(list(&cache, Some("lighting"), &mut Vec::new()).is_err());
    }
}
