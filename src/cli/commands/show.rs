//! show command - Print the catalog tree of a snapshot dump

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::catalog::dump::SnapshotDump;
use crate::catalog::{Collection, DocPart, Snapshot};
use crate::cli::Context;

use super::load_snapshot;

/// Print a snapshot dump as a tree, or as canonical JSON.
pub fn show(_ctx: &Context, dump: &Path, json: bool) -> Result<()> {
    let snapshot = load_snapshot(dump)?;
    if json {
        let canonical = SnapshotDump::from(&snapshot)
            .to_json_pretty()
            .context("Failed to render snapshot dump")?;
        println!("{canonical}");
    } else {
        print!("{}", render_tree(&snapshot));
    }
    Ok(())
}

/// Indented, one element per line.
///
/// ```text
/// database dbName1 (dbId1)
///   collection colName1 (colId1)
///     doc part $root (docPartId1)
///       field fieldName1:INTEGER (fieldId1)
///       doc part index docPartIndexId1 [fieldId1 ASC]
///     index idxName1 [$root/fieldName1 ASC]
/// ```
pub fn render_tree(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if snapshot.is_empty() {
        out.push_str("(empty catalog)\n");
        return out;
    }
    for db in snapshot.databases() {
        let _ = writeln!(out, "database {} ({})", db.name(), db.identifier());
        for col in db.collections() {
            render_collection(&mut out, col);
        }
    }
    out
}

fn render_collection(out: &mut String, col: &Collection) {
    let _ = writeln!(out, "  collection {} ({})", col.name(), col.identifier());
    let mut doc_parts: Vec<&DocPart> = col.doc_parts().collect();
    doc_parts.sort_by(|a, b| a.table_ref().cmp(b.table_ref()));
    for dp in doc_parts {
        render_doc_part(out, dp);
    }
    for index in col.indexes() {
        let fields: Vec<String> = index.fields().iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "    index {} [{}]{}",
            index.name(),
            fields.join(", "),
            unique_suffix(index.is_unique())
        );
    }
}

fn render_doc_part(out: &mut String, dp: &DocPart) {
    let _ = writeln!(out, "    doc part {} ({})", dp.table_ref(), dp.identifier());
    for field in dp.fields() {
        let _ = writeln!(out, "      field {} ({})", field, field.identifier());
    }
    for scalar in dp.scalars() {
        let _ = writeln!(out, "      scalar {} ({})", scalar.field_type(), scalar.identifier());
    }
    for dpi in dp.doc_part_indexes() {
        let columns: Vec<String> = dpi
            .columns()
            .iter()
            .map(|c| format!("{} {}", c.identifier, c.ordering))
            .collect();
        let _ = writeln!(
            out,
            "      doc part index {} [{}]{}",
            dpi.identifier(),
            columns.join(", "),
            unique_suffix(dpi.is_unique())
        );
    }
}

fn unique_suffix(unique: bool) -> &'static str {
    if unique {
        " unique"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_renders_placeholder() {
        assert_eq!(render_tree(&Snapshot::empty()), "(empty catalog)\n");
    }

    #[test]
    fn tree_lists_every_level() {
        let json = r#"{"databases":[{"name":"d","identifier":"d_id","collections":[
            {"name":"c","identifier":"c_id",
             "doc_parts":[{"table_ref":"$root","identifier":"c_root",
                "fields":[{"name":"a","identifier":"a_i","type":"INTEGER"}],
                "indexes":[{"identifier":"c_root_a","unique":true,
                    "columns":[{"identifier":"a_i","ordering":"ASC"}]}]}],
             "indexes":[{"name":"a_1","unique":true,
                "fields":[{"table_ref":"$root","name":"a","ordering":"ASC"}]}]}]}]}"#;
        let snapshot = SnapshotDump::from_json(json).unwrap().into_snapshot().unwrap();
        let tree = render_tree(&snapshot);

        assert!(tree.contains("database d (d_id)\n"));
        assert!(tree.contains("  collection c (c_id)\n"));
        assert!(tree.contains("    doc part $root (c_root)\n"));
        assert!(tree.contains("      field a:INTEGER (a_i)\n"));
        assert!(tree.contains("      doc part index c_root_a [a_i ASC] unique\n"));
        assert!(tree.contains("    index a_1 [$root/a ASC] unique\n"));
    }
}
