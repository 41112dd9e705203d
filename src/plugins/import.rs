//! Tabular import: CSV rows of `dex,class,script_hash` into the registry.
//!
//! Rows from every source are classified in order, grouped per canonical
//! project, and merged into `<registry_dir>/<file>`. The metadata side-table
//! is extended for unseen projects and classes and saved before merging.

use crate::core::config::RegistryConfig;
use crate::core::error::RegistryError;
use crate::core::flatten;
use crate::core::metadata::{AliasTable, MetadataTable};
use crate::core::model::SourceRow;
use crate::core::pipeline::{self, Batches, IdSeed, RunCounters, RunReport};
use crate::core::resolver::{ClassificationResolver, ResolverSession, SqliteResolver};
use crate::core::store::RegistryStore;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

const REQUIRED_COLUMNS: [&str; 3] = ["dex", "class", "script_hash"];

#[derive(Args, Debug, Clone)]
pub struct ImportCli {
    /// CSV files to import (defaults to `import.sources` from the config).
    pub sources: Vec<PathBuf>,
    /// Registry directory to merge into (defaults to `paths.registry_dir`).
    #[clap(long)]
    pub target: Option<PathBuf>,
}

/// Parsed rows of one CSV source plus the count of malformed lines.
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub rows: Vec<SourceRow>,
    pub malformed: Vec<String>,
}

/// Split a CSV line on commas, trimming fields and surrounding quotes.
fn split_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|f| f.trim().trim_matches('"').trim().to_string())
        .collect()
}

/// Parse CSV text with a header row naming at least `dex, class, script_hash`.
///
/// Rows with an empty `dex` or `script_hash` are skipped; rows missing
/// columns are reported in `malformed`.
pub fn parse_rows(source: &str, content: &str) -> Result<ParsedSource, RegistryError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(ParsedSource::default());
    };
    let header = split_fields(header);
    let mut columns = [0usize; 3];
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                RegistryError::InvalidInput(format!("{}: header is missing column '{}'", source, name))
            })?;
    }
    let [dex_col, class_col, hash_col] = columns;
    let width = columns.iter().copied().max().unwrap_or(0) + 1;

    let mut parsed = ParsedSource::default();
    for (line_no, line) in lines {
        let fields = split_fields(line);
        if fields.len() < width {
            parsed
                .malformed
                .push(format!("{}:{}: expected {} columns, found {}", source, line_no, width, fields.len()));
            continue;
        }
        let row = SourceRow {
            source: source.to_string(),
            line: line_no,
            dex: fields[dex_col].clone(),
            class: fields[class_col].clone(),
            script_hash: fields[hash_col].clone(),
        };
        if row.dex.is_empty() || row.script_hash.is_empty() {
            tracing::debug!(source = source, line = line_no, "skipping row without dex or script_hash");
            continue;
        }
        parsed.rows.push(row);
    }
    Ok(parsed)
}

fn source_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every source. Unreadable or header-less files are counted as rejected.
pub fn read_sources(paths: &[PathBuf], counters: &mut RunCounters) -> Vec<SourceRow> {
    let mut rows = Vec::new();
    for path in paths {
        let label = source_label(path);
        let parsed = fs::read_to_string(path)
            .map_err(RegistryError::IoError)
            .and_then(|content| parse_rows(&label, &content));
        match parsed {
            Ok(parsed) => {
                tracing::info!(source = %label, rows = parsed.rows.len(), "source read");
                for msg in &parsed.malformed {
                    counters.record_rejected(&label, &RegistryError::InvalidInput(msg.clone()));
                }
                rows.extend(parsed.rows);
            }
            Err(e) => counters.record_rejected(&path.display().to_string(), &e),
        }
    }
    rows
}

/// Import `rows` with an already-open resolver and loaded metadata.
///
/// Resolver failures abort the run; row-level problems are counted.
pub fn import_rows<R: ClassificationResolver + ?Sized>(
    rows: &[SourceRow],
    resolver: &R,
    metadata: &mut MetadataTable,
    metadata_path: &Path,
    store: &RegistryStore,
    report: &mut RunReport,
) -> Result<(), RegistryError> {
    report.inputs += rows.len();
    let mut batches = Batches::default();

    for row in rows {
        let origin = format!("{}:{} {}", row.source, row.line, row.dex);
        match flatten::flatten_row(row, resolver, metadata) {
            Ok(outcome) => {
                pipeline::record_outcome(outcome, &origin, &mut report.counters, &mut batches)
            }
            Err(e) if e.is_row_level() => report.counters.record_rejected(&origin, &e),
            Err(e) => return Err(e),
        }
        pipeline::log_progress(&report.counters, rows.len());
    }

    report.metadata_saved = metadata.save_if_modified(metadata_path)?;

    pipeline::commit_batches(
        batches.into_vec(),
        store,
        IdSeed::CanonicalKey,
        |batch| metadata.get(&batch.key).map(|m| m.profile()),
        report,
    );
    if report.is_suspicious() {
        tracing::warn!(inputs = report.inputs, "no rows were accepted");
    }
    Ok(())
}

/// Full import run: setup, sequential processing, merge, resolver teardown.
pub fn run_import<R: ClassificationResolver>(
    config: &RegistryConfig,
    sources: &[PathBuf],
    target: &Path,
    session: ResolverSession<R>,
) -> Result<RunReport, RegistryError> {
    pipeline::with_session(session, |resolver| {
        let aliases = AliasTable::with_overrides(&config.aliases);
        let mut metadata = MetadataTable::load(&config.paths.metadata, aliases)?;
        let store = RegistryStore::new(target);

        let mut report = RunReport::new("import");
        let rows = read_sources(sources, &mut report.counters);
        tracing::info!(rows = rows.len(), sources = sources.len(), "contracts to process");

        import_rows(
            &rows,
            resolver,
            &mut metadata,
            &config.paths.metadata,
            &store,
            &mut report,
        )?;
        Ok(report)
    })
}

/// CLI entry: open the configured resolver and run the import.
pub fn run_import_cli(cli: &ImportCli, config: &RegistryConfig) -> Result<RunReport, RegistryError> {
    let db = config.require_resolver_database()?;
    let sources = if cli.sources.is_empty() {
        config.import.sources.clone()
    } else {
        cli.sources.clone()
    };
    let target = cli
        .target
        .clone()
        .unwrap_or_else(|| config.paths.registry_dir.clone());
    let session = ResolverSession::new(SqliteResolver::open(db)?);
    run_import(config, &sources, &target, session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_by_header_and_skips_blank_keys() {
        let csv = "dex,class,script_hash,extra\r\n\
                   Minswap,OrderContract,aa,x\r\n\
                   ,Pool,bb,y\n\
                   MinswapV2,Pool,,z\n\
                   \n\
                   \"Splash\",Pool,cc,w\n";
        let parsed = parse_rows("orders", csv).unwrap();
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].dex, "Minswap");
        assert_eq!(parsed.rows[0].class, "OrderContract");
        assert_eq!(parsed.rows[0].script_hash, "aa");
        assert_eq!(parsed.rows[0].line, 2);
        assert_eq!(parsed.rows[1].dex, "Splash");
        assert_eq!(parsed.rows[1].source, "orders");
    }

    #[test]
    fn parse_rows_handles_reordered_columns() {
        let parsed = parse_rows("pools", "script_hash,dex,class\naa,VyFi,Pool\n").unwrap();
        assert_eq!(parsed.rows[0].dex, "VyFi");
        assert_eq!(parsed.rows[0].class, "Pool");
        assert_eq!(parsed.rows[0].script_hash, "aa");
    }

    #[test]
    fn short_rows_are_malformed() {
        let parsed = parse_rows("orders", "dex,class,script_hash\nMinswap,Pool\n").unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.malformed.len(), 1);
        assert!(parsed.malformed[0].starts_with("orders:2"));
    }

    #[test]
    fn missing_header_column_is_rejected() {
        let err = parse_rows("orders", "dex,hash\nMinswap,aa\n").unwrap_err();
        assert!(err.is_row_level());
        assert!(err.to_string().contains("class"));
    }

    #[test]
    fn empty_source_has_no_rows() {
        let parsed = parse_rows("orders", "").unwrap();
        assert!(parsed.rows.is_empty());
    }
}
