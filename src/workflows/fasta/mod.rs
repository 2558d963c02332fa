//! Raw genome input: file-name checks and FASTA parsing. Everything here runs
//! before the first pipeline stage, so a rejected file never creates a run.

mod normalizer;
mod parser;

use serde::Serialize;
use std::io::Read;
use std::path::Path;

const ACCEPTED_EXTENSIONS: [&str; 3] = ["fasta", "fa", "fna"];

/// Validation errors for submitted sequence files.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unsupported file '{filename}': expected a .fasta, .fa or .fna file")]
    UnsupportedExtension { filename: String },
    #[error("sequence file is empty")]
    Empty,
    #[error("line {line}: sequence data appears before any '>' header")]
    MissingHeader { line: usize },
    #[error("record {record}: header has no sequence identifier")]
    MissingIdentifier { record: usize },
    #[error("contig '{id}' has no sequence data")]
    EmptySequence { id: String },
    #[error("contig '{id}' contains invalid nucleotide '{residue}' at position {position}")]
    InvalidResidue {
        id: String,
        residue: char,
        position: usize,
    },
    #[error("contig '{id}' appears more than once")]
    DuplicateContig { id: String },
    #[error("failed to read sequence file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub sequence: String,
}

/// Figures reported back to callers once an upload is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub filename: String,
    pub contigs: usize,
    pub total_bases: usize,
}

/// A validated genome submission.
#[derive(Debug, Clone)]
pub struct SequenceInput {
    filename: String,
    records: Vec<FastaRecord>,
}

impl SequenceInput {
    pub fn parse(filename: &str, content: &str) -> Result<Self, InputError> {
        ensure_extension(filename)?;
        let records = parser::parse_records(content)?;
        Ok(Self {
            filename: filename.to_string(),
            records,
        })
    }

    pub fn from_reader<R: Read>(filename: &str, mut reader: R) -> Result<Self, InputError> {
        ensure_extension(filename)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::parse(filename, &content)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        ensure_extension(&filename)?;
        let file = std::fs::File::open(path)?;
        Self::from_reader(&filename, file)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn records(&self) -> &[FastaRecord] {
        &self.records
    }

    pub fn contig_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    pub fn total_bases(&self) -> usize {
        self.records.iter().map(|record| record.sequence.len()).sum()
    }

    pub fn summary(&self) -> InputSummary {
        InputSummary {
            filename: self.filename.clone(),
            contigs: self.records.len(),
            total_bases: self.total_bases(),
        }
    }
}

fn ensure_extension(filename: &str) -> Result<(), InputError> {
    let accepted = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(InputError::UnsupportedExtension {
            filename: filename.to_string(),
        })
    }
}
