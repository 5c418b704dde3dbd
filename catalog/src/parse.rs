//! Catalog file parser: reads the per-child data-structure discovery file into a [`Catalog`].
//!
//! Mirrors `SimulatorRun::read_data_structures` in the original source, which `fscanf`s
//! `"%d %s %d %p\n"` records out of the discovery file one at a time and stops at the first
//! record that doesn't parse. The Rust version makes that stop-on-malformed-line behavior an
//! explicit error instead of a silent truncation.

use crate::{Catalog, DataStructureDescriptor, DataStructureType};
use fault_injector_error::Error;
use std::path::Path;

/// Parse a catalog file of the form:
///
/// ```text
/// ID Name Type Address
/// 0 MessageBuffer_TaskEchoServer1 0 0x7f...
/// ```
///
/// The first line is a header and is always skipped, even if it happens to parse as a record.
pub fn parse_catalog(path: &Path) -> Result<Catalog, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::MalformedCatalog {
        path: path.to_owned(),
        reason: format!("could not read file: {source}"),
    })?;

    let mut entries = Vec::new();
    for line in contents.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let descriptor = parse_record(path, line)?;
        if entries
            .iter()
            .any(|d: &DataStructureDescriptor| d.id == descriptor.id)
        {
            return Err(Error::DuplicateCatalogId {
                path: path.to_owned(),
                id: descriptor.id,
            });
        }
        entries.push(descriptor);
    }

    entries.sort_by_key(|d| d.id);
    Ok(Catalog::new(entries))
}

fn parse_record(path: &Path, line: &str) -> Result<DataStructureDescriptor, Error> {
    let malformed = |reason: String| Error::MalformedCatalog {
        path: path.to_owned(),
        reason,
    };

    let mut fields = line.split_whitespace();
    let id: u32 = fields
        .next()
        .ok_or_else(|| malformed(format!("line {line:?} is missing the id field")))?
        .parse()
        .map_err(|_| malformed(format!("line {line:?} has a non-numeric id field")))?;
    let name = fields
        .next()
        .ok_or_else(|| malformed(format!("line {line:?} is missing the name field")))?
        .to_owned();
    let tag: u32 = fields
        .next()
        .ok_or_else(|| malformed(format!("line {line:?} is missing the type field")))?
        .parse()
        .map_err(|_| malformed(format!("line {line:?} has a non-numeric type field")))?;
    let address_field = fields
        .next()
        .ok_or_else(|| malformed(format!("line {line:?} is missing the address field")))?;
    let address = parse_address(address_field)
        .ok_or_else(|| malformed(format!("line {line:?} has an unparsable address field")))?;

    let ty = DataStructureType::from_tag(tag).ok_or_else(|| Error::UnknownTypeTag {
        id,
        name: name.clone(),
        tag,
    })?;

    Ok(DataStructureDescriptor::new(id, name, ty, address))
}

fn parse_address(field: &str) -> Option<usize> {
    let hex = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X"))?;
    usize::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp catalog file");
        file.write_all(contents.as_bytes())
            .expect("write catalog contents");
        file
    }

    #[test]
    fn parses_a_well_formed_catalog() {
        let file = write_catalog(
            "ID Name Type Address\n\
             0 MessageBuffer_TaskEchoServer1 6 0x7f0000000010\n\
             1 BlockQ_Queue1-2 1 0x7f0000000020\n",
        );
        let catalog = parse_catalog(file.path()).expect("catalog should parse");
        assert_eq!(catalog.len(), 2);
        let first = catalog.get_by_id(0).unwrap();
        assert_eq!(first.name, "MessageBuffer_TaskEchoServer1");
        assert_eq!(first.ty, DataStructureType::MessageBuffer);
        assert_eq!(first.address, 0x7f0000000010);
    }

    #[test]
    fn header_line_is_always_skipped() {
        let file = write_catalog("0 NotAHeader 0 0x10\n0 Task1 0 0x20\n");
        let catalog = parse_catalog(file.path()).expect("catalog should parse");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get_by_id(0).unwrap().name, "Task1");
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = parse_catalog(Path::new("/nonexistent/catalog.txt"));
        assert!(matches!(err, Err(Error::MalformedCatalog { .. })));
    }

    #[test]
    fn unknown_type_tag_is_fatal() {
        let file = write_catalog("header\n0 Thing 99 0x10\n");
        let err = parse_catalog(file.path());
        assert!(matches!(err, Err(Error::UnknownTypeTag { tag: 99, .. })));
    }

    #[test]
    fn duplicate_id_is_fatal() {
        let file = write_catalog("header\n0 Thing1 0 0x10\n0 Thing2 1 0x20\n");
        let err = parse_catalog(file.path());
        assert!(matches!(err, Err(Error::DuplicateCatalogId { id: 0, .. })));
    }

    #[test]
    fn malformed_record_is_fatal() {
        let file = write_catalog("header\nnot a valid record\n");
        let err = parse_catalog(file.path());
        assert!(matches!(err, Err(Error::MalformedCatalog { .. })));
    }
}
