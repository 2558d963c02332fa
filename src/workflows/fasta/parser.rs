use super::normalizer::{normalize_header, normalize_sequence_line};
use super::{FastaRecord, InputError};
use bio::io::fasta;
use std::collections::HashSet;

const NUCLEOTIDE_CODES: &str = "ACGTURYKMSWBDHVN";

/// Rewrites upload text into plain FASTA for the record reader: blank and
/// `;` comment lines dropped, headers trimmed, sequence lines compacted.
/// The reader ends iteration at a record with an empty id, so blank
/// identifiers are rejected here.
fn clean_content(content: &str) -> Result<String, InputError> {
    let mut cleaned = String::with_capacity(content.len());
    let mut headers = 0;

    for (index, raw_line) in content.lines().enumerate() {
        let line = normalize_header(raw_line);
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            headers += 1;
            let header = header.trim_start();
            if header.is_empty() {
                return Err(InputError::MissingIdentifier { record: headers });
            }
            cleaned.push('>');
            cleaned.push_str(header);
        } else if headers > 0 {
            cleaned.push_str(&normalize_sequence_line(&line));
        } else {
            return Err(InputError::MissingHeader { line: index + 1 });
        }
        cleaned.push('\n');
    }

    Ok(cleaned)
}

pub(crate) fn parse_records(content: &str) -> Result<Vec<FastaRecord>, InputError> {
    let cleaned = clean_content(content)?;
    if cleaned.is_empty() {
        return Err(InputError::Empty);
    }

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for result in fasta::Reader::new(cleaned.as_bytes()).records() {
        let record = result?;
        let id = record.id();
        if !seen.insert(id.to_string()) {
            return Err(InputError::DuplicateContig { id: id.to_string() });
        }

        let sequence = String::from_utf8_lossy(record.seq()).into_owned();
        if sequence.is_empty() {
            return Err(InputError::EmptySequence { id: id.to_string() });
        }
        if let Some((offset, residue)) = sequence
            .chars()
            .enumerate()
            .find(|(_, ch)| !NUCLEOTIDE_CODES.contains(*ch))
        {
            return Err(InputError::InvalidResidue {
                id: id.to_string(),
                residue,
                position: offset + 1,
            });
        }

        let description = record
            .desc()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        records.push(FastaRecord {
            id: id.to_string(),
            description,
            sequence,
        });
    }

    Ok(records)
}
