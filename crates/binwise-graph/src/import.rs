use binwise_core::{BinwiseError, BinwiseResult};
use serde::Deserialize;
use std::io::Read;

/// One `item,bin` row of a facts file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FactRecord {
    #[serde(alias = "item_name")]
    pub item: String,
    #[serde(alias = "bin_type")]
    pub bin: String,
    /// 1-based line in the source file.
    #[serde(skip)]
    pub line: u64,
}

/// Parse a CSV facts file with an `item,bin` (or `item_name,bin_type`) header.
///
/// Header names are trimmed; field values are kept exactly as written, since
/// item names are matched whitespace-sensitively. Extra columns are ignored. The whole file is validated
/// before anything is returned, so a bad row never leaves a partial import.
pub fn read_facts<R: Read>(reader: R) -> BinwiseResult<Vec<FactRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| BinwiseError::Validation(format!("Unreadable facts header: {e}")))?
        .clone();

    let mut facts = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        let more = rdr
            .read_record(&mut record)
            .map_err(|e| BinwiseError::Validation(format!("Unreadable facts row: {e}")))?;
        if !more {
            break;
        }
        let line = record.position().map_or(0, csv::Position::line);
        let mut fact: FactRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| BinwiseError::Validation(format!("line {line}: {e}")))?;
        if fact.item.is_empty() || fact.bin.is_empty() {
            return Err(BinwiseError::Validation(format!(
                "line {line}: item and bin must not be empty"
            )));
        }
        fact.line = line;
        facts.push(fact);
    }
    Ok(facts)
}
