use tracing::debug;

use crate::error::{Error, Result};
use crate::powerdns::types::{ChangeType, CommentWire, DEFAULT_TTL, RRSetWire, RecordWire};
use crate::validation::require_canonical;

/// One content entry of an RRSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content: String,
    pub disabled: bool,
}

impl Record {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            disabled: false,
        }
    }

    pub fn disabled(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            disabled: true,
        }
    }
}

impl From<RecordWire> for Record {
    fn from(wire: RecordWire) -> Self {
        Self {
            content: wire.content,
            disabled: wire.disabled,
        }
    }
}

impl From<&Record> for RecordWire {
    fn from(record: &Record) -> Self {
        Self {
            content: record.content.clone(),
            disabled: record.disabled,
        }
    }
}

/// All records sharing a name and type.
///
/// `zone` is the name of the owning zone once the set has been attached to
/// one; it is what allows a delete to be propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct RRSet {
    zone: Option<String>,
    name: String,
    rtype: String,
    records: Vec<Record>,
    deleted_records: Vec<Record>,
    ttl: u32,
    changetype: ChangeType,
    comments: Vec<CommentWire>,
}

impl Default for RRSet {
    fn default() -> Self {
        Self {
            zone: None,
            name: String::new(),
            rtype: String::new(),
            records: Vec::new(),
            deleted_records: Vec::new(),
            ttl: DEFAULT_TTL,
            changetype: ChangeType::Replace,
            comments: Vec::new(),
        }
    }
}

impl RRSet {
    pub fn new(name: impl Into<String>, rtype: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            rtype: rtype.into(),
            records,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builds an RRSet from a server document. Parsed sets always start as
    /// `REPLACE`, whatever the document says.
    pub fn from_wire(zone: Option<&str>, wire: RRSetWire) -> Self {
        Self {
            zone: zone.map(str::to_string),
            name: wire.name,
            rtype: wire.rrtype,
            records: wire.records.into_iter().map(Record::from).collect(),
            deleted_records: Vec::new(),
            ttl: wire.ttl,
            changetype: ChangeType::Replace,
            comments: wire.comments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the owner name. Only allowed while the name is still empty: to
    /// rename, create a new RRSet and delete this one.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if !self.name.is_empty() {
            return Err(Error::ImmutableField("name"));
        }
        self.name = name.into();
        Ok(())
    }

    pub fn rtype(&self) -> &str {
        &self.rtype
    }

    pub fn set_rtype(&mut self, rtype: impl Into<String>) {
        self.rtype = rtype.into();
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }

    pub fn changetype(&self) -> ChangeType {
        self.changetype
    }

    pub(crate) fn set_changetype(&mut self, changetype: ChangeType) {
        self.changetype = changetype;
    }

    pub fn comments(&self) -> &[CommentWire] {
        &self.comments
    }

    /// Name of the owning zone, if attached.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub(crate) fn attach(&mut self, zone: &str) {
        self.zone = Some(zone.to_string());
    }

    /// Removes the record with this content. The record is still sent,
    /// disabled, until the set is persisted.
    pub fn delete_record(&mut self, content: &str) -> bool {
        let Some(idx) = self.records.iter().position(|r| r.content == content) else {
            return false;
        };
        let mut record = self.records.remove(idx);
        record.disabled = true;
        self.deleted_records.push(record);
        true
    }

    pub fn deleted_records(&self) -> &[Record] {
        &self.deleted_records
    }

    /// Qualifies the name (and CNAME targets) with `zone` unless already
    /// dot-terminated. Cannot be undone.
    pub fn ensure_canonical(&mut self, zone: &str) -> Result<()> {
        debug!("ensuring rrset {} is canonical", self.name);
        require_canonical(zone)?;

        if !self.name.ends_with('.') {
            debug!("transforming {} with {}", self.name, zone);
            self.name = qualify(&self.name, zone);
        }
        if self.rtype == "CNAME" {
            for record in self.records.iter_mut().chain(self.deleted_records.iter_mut()) {
                if !record.content.ends_with('.') {
                    debug!("transforming {} with {}", record.content, zone);
                    record.content = qualify(&record.content, zone);
                }
            }
        }
        Ok(())
    }

    /// Marks the set for deletion on the next persist.
    pub fn mark_deleted(&mut self) -> Result<()> {
        if self.zone.is_none() {
            return Err(Error::DetachedRRSet(self.name.clone()));
        }
        self.changetype = ChangeType::Delete;
        Ok(())
    }

    /// Wire representation, deleted records appended after the live ones.
    pub fn json(&self) -> RRSetWire {
        RRSetWire {
            name: self.name.clone(),
            rrtype: self.rtype.clone(),
            ttl: self.ttl,
            changetype: Some(self.changetype),
            records: self
                .records
                .iter()
                .chain(&self.deleted_records)
                .map(RecordWire::from)
                .collect(),
            comments: self.comments.clone(),
        }
    }
}

fn qualify(name: &str, zone: &str) -> String {
    if name.is_empty() || name == "@" {
        zone.to_string()
    } else {
        format!("{name}.{zone}")
    }
}
