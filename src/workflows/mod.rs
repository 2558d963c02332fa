pub mod analysis;
pub mod fasta;
pub mod manifest;
