//! GFF: the Aurora engine's generic hierarchical struct format, used by
//! ~20 resource subtypes (`UTC`, `IFO`, `ARE`, `GIT`, `DLG`, ...).

pub mod field;
pub mod json;
pub mod reader;
pub mod validator;
pub mod writer;
pub mod xml;

pub use field::{GffField, GffFieldValue, GffList, GffStruct, LocalizedString, LocalizedSubstring};
pub use reader::GffReader;
pub use writer::GffWriter;

use kotor_common::error::Error;

/// Reads a GFF-family resource, running [`validator::validate`] afterward
/// so structurally-valid-but-engine-hostile files are surfaced as an error
/// rather than silently accepted.
pub fn read(data: &[u8], expected_type: Option<&str>) -> Result<(GffStruct, String), Error> {
    let (root, file_type) = GffReader::read(data, expected_type)?;
    validator::validate(&root)?;
    Ok((root, file_type))
}

pub fn write(root: &GffStruct, file_type: &str) -> Result<Vec<u8>, Error> {
    GffWriter::write(root, file_type)
}
