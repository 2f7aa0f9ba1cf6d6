//! Fixed-width text rendering.

use super::{Table, make_table};
use crate::Result;
use gatekeeper_core::{Acl, Device};
use std::fmt;
use std::io::Write;

impl Table {
    /// Render as left-aligned fixed-width columns.
    ///
    /// Every line starts with `indent`. Each column is as wide as its widest
    /// cell, and columns are separated by `gap`. Every cell is padded,
    /// including the last one on the line.
    pub fn render(&self, indent: &str, gap: &str) -> String {
        let columns = self
            .records
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        for line in std::iter::once(&self.header).chain(self.records.iter()) {
            for (ix, cell) in line.iter().enumerate() {
                widths[ix] = widths[ix].max(cell.chars().count());
            }
        }

        let gap_width = gap.chars().count();
        for width in widths.iter_mut().take(columns.saturating_sub(1)) {
            *width += gap_width;
        }

        let mut out = String::new();
        for line in std::iter::once(&self.header).chain(self.records.iter()) {
            out.push_str(indent);
            for (cell, width) in line.iter().zip(widths.iter().copied()) {
                out.push_str(&format!("{cell:<width$}"));
            }
            out.push('\n');
        }
        out
    }
}

/// Single-space gap, no indent.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render("", " "))
    }
}

/// Write an ACL as a fixed-width text table with two-space column gaps.
///
/// # Errors
///
/// Returns the errors of [`make_table`], or `AclError::Io` if writing fails.
pub fn make_flat_file<W: Write>(acl: &Acl, devices: &[Device], mut writer: W) -> Result<()> {
    let table = make_table(acl, devices)?;
    writer.write_all(table.render("", "  ").as_bytes())?;
    writer.flush()?;
    Ok(())
}
