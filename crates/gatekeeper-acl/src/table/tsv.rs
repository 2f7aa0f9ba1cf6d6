//! Tab-separated rendering.

use super::{DuplicatePolicy, Parsed, Table, make_table, parse_table};
use crate::{AclError, Result};
use gatekeeper_core::{Acl, Device};
use std::io::{Read, Write};

impl Table {
    /// Read a table from tab-separated text; the first line is the header.
    ///
    /// Blank lines are skipped. Rows may be shorter or longer than the
    /// header; short rows are reported when the table is parsed.
    ///
    /// # Errors
    ///
    /// Returns `AclError::EmptyTable` if there is no header line, or
    /// `AclError::Tsv` for malformed input.
    pub fn read_tsv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record?.iter().map(ToString::to_string).collect(),
            None => return Err(AclError::EmptyTable),
        };

        let records = records
            .map(|record| -> Result<Vec<String>> {
                Ok(record?.iter().map(ToString::to_string).collect())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, records })
    }

    /// Write the table as tab-separated text, one line per row.
    ///
    /// # Errors
    ///
    /// Returns `AclError::Tsv` or `AclError::Io` if writing fails.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(writer);

        writer.write_record(&self.header)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Parse tab-separated text straight into an ACL.
///
/// # Errors
///
/// See [`Table::read_tsv`] and [`parse_table`].
pub fn parse_tsv<R: Read>(reader: R, devices: &[Device], policy: DuplicatePolicy) -> Result<Parsed> {
    let table = Table::read_tsv(reader)?;
    parse_table(&table, devices, policy)
}

/// Write an ACL as tab-separated text.
///
/// # Errors
///
/// See [`make_table`] and [`Table::write_tsv`].
pub fn make_tsv<W: Write>(acl: &Acl, devices: &[Device], writer: W) -> Result<()> {
    make_table(acl, devices)?.write_tsv(writer)
}
