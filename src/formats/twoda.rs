//! `2DA`: a named-column, numbered-row table used throughout the engine's
//! rulebook data (feats, classes, appearance rows, ...).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "2DA ";
const VERSION: &str = "V2.b";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TwoDa {
    pub columns: Vec<String>,
    pub row_labels: Vec<String>,
    /// `rows[row][column]`; empty cell is `None`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl TwoDa {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            row_labels: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: &str, cells: Vec<Option<String>>) {
        self.row_labels.push(label.to_string());
        self.rows.push(cells);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let column_index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(column_index)?.as_deref()
    }

    pub fn read(data: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(data);
        let magic = reader.string(4)?;
        if magic != MAGIC {
            return Err(Error::BadMagic {
                expected: MAGIC.to_string(),
                found: magic,
            });
        }
        let version = reader.string(4)?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        // The header is followed by a newline-terminated column name line.
        let column_line = reader.terminated_string(b'\n', 4096)?;
        let columns: Vec<String> = column_line
            .trim_end_matches('\r')
            .split('\t')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let row_count = reader.u32()? as usize;
        let column_count = columns.len();

        let mut row_labels = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            row_labels.push(reader.terminated_string(b'\t', 64)?);
        }

        let cell_count = row_count * column_count;
        let mut cell_offsets = Vec::with_capacity(cell_count);
        for _ in 0..cell_count {
            cell_offsets.push(reader.u16()?);
        }
        let _data_size = reader.u16()?;

        let pool = reader.bytes(reader.remaining() as usize)?;

        let mut rows = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let mut cells = Vec::with_capacity(column_count);
            for column in 0..column_count {
                let offset = cell_offsets[row * column_count + column] as usize;
                let text = read_pool_string(&pool, offset)?;
                cells.push(if text.is_empty() { None } else { Some(text) });
            }
            rows.push(cells);
        }

        Ok(Self {
            columns,
            row_labels,
            rows,
        })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();

        let column_line = self.columns.join("\t");
        writer.bytes(column_line.as_bytes()).unwrap();
        writer.u8(b'\n').unwrap();

        writer.u32(self.rows.len() as u32).unwrap();
        for label in &self.row_labels {
            writer.bytes(label.as_bytes()).unwrap();
            writer.u8(b'\t').unwrap();
        }

        let mut pool = Vec::new();
        pool.push(0u8); // offset 0 is always the empty string
        let mut offsets = Vec::with_capacity(self.rows.len() * self.columns.len());
        for row in &self.rows {
            for cell in row {
                match cell.as_deref() {
                    None | Some("") => offsets.push(0u16),
                    Some(text) => {
                        offsets.push(pool.len() as u16);
                        pool.extend_from_slice(text.as_bytes());
                        pool.push(0);
                    }
                }
            }
        }

        for offset in &offsets {
            writer.u16(*offset).unwrap();
        }
        writer.u16(pool.len() as u16).unwrap();
        writer.bytes(&pool).unwrap();

        writer.into_bytes()
    }

    /// CSV bridge: row labels are preserved verbatim in the first column.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&csv_row(std::iter::once("").chain(self.columns.iter().map(String::as_str))));
        for (label, row) in self.row_labels.iter().zip(&self.rows) {
            out.push_str(&csv_row(
                std::iter::once(label.as_str()).chain(row.iter().map(|c| c.as_deref().unwrap_or(""))),
            ));
        }
        out
    }
}

fn csv_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut line: String = cells
        .map(|cell| {
            if cell.contains(',') || cell.contains('"') {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn read_pool_string(pool: &[u8], offset: usize) -> Result<String, Error> {
    if offset > pool.len() {
        return Err(Error::StructuralError(String::from("2DA cell offset out of range")));
    }
    let end = pool[offset..].iter().position(|&b| b == 0).map(|i| offset + i).unwrap_or(pool.len());
    Ok(pool[offset..end].iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_empty_cells() {
        let mut table = TwoDa::new(vec![String::from("label"), String::from("value")]);
        table.push_row("0", vec![Some(String::from("feat")), None]);
        table.push_row("1", vec![Some(String::from("other")), Some(String::from("42"))]);

        let bytes = table.write();
        let read_back = TwoDa::read(&bytes).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_get_by_column_name() {
        let mut table = TwoDa::new(vec![String::from("name")]);
        table.push_row("0", vec![Some(String::from("bastila"))]);
        assert_eq!(table.get(0, "name"), Some("bastila"));
        assert_eq!(table.get(0, "missing"), None);
    }

    #[test]
    fn test_csv_preserves_row_labels() {
        let mut table = TwoDa::new(vec![String::from("name")]);
        table.push_row("0", vec![Some(String::from("bastila"))]);
        let csv = table.to_csv();
        assert!(csv.contains("0,bastila"));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = TwoDa::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
