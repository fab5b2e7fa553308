//! `serde::Serialize` for documents, sections, and strings.
//!
//! Strings serialize as UTF-8 text (lossily, since LSML strings are byte
//! strings), tables as maps, arrays as sequences of row sequences, and a
//! document as a map from section name to section.

use crate::section::{Section, SectionKind};
use crate::str::Str;
use crate::Document;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

impl Serialize for Str<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Serialize for Section<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.kind() {
            SectionKind::Table => {
                let mut map = serializer.serialize_map(Some(self.len()))?;
                for (key, value) in self.table_entries() {
                    map.serialize_entry(&key, &value)?;
                }
                map.end()
            }
            SectionKind::Array => {
                let mut rows: Vec<Vec<Str<'_>>> = Vec::new();
                for (value, row, _) in self.array_cells() {
                    if row == rows.len() {
                        rows.push(Vec::new());
                    }
                    rows[row].push(value);
                }
                let mut seq = serializer.serialize_seq(Some(rows.len()))?;
                for row in &rows {
                    seq.serialize_element(row)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.section_count()))?;
        for section in self.sections() {
            map.serialize_entry(&section.name(), &section)?;
        }
        map.end()
    }
}
