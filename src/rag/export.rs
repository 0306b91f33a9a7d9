//! CSV export of query citations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::answer::Citation;
use super::persist::write_atomically;

const HEADER: &str = "rank,score,text,source_url";

/// Write `citations` to `<dir>/query_results_<6 hex>.csv` and return the path.
pub fn export_citations(dir: &Path, citations: &[Citation]) -> io::Result<PathBuf> {
    let suffix = Uuid::new_v4().simple().to_string();
    let path = dir.join(format!("query_results_{}.csv", &suffix[..6]));

    write_atomically(&path, |writer| {
        writeln!(writer, "{}", HEADER)?;
        for (rank, citation) in citations.iter().enumerate() {
            writeln!(
                writer,
                "{},{:.4},{},{}",
                rank + 1,
                citation.score,
                escape_field(&citation.snippet),
                escape_field(&citation.source_url)
            )?;
        }
        Ok(())
    })?;

    tracing::info!("Exported {} citations to {}", citations.len(), path.display());
    Ok(path)
}

/// Quote a field when it contains a delimiter, quote or line break,
/// doubling embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
