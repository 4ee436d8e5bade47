//! Bidirectional name tables
//!
//! Qualified names and container names are interned to `u16` identifiers.
//! Singleton document types are mapped to identifiers in the singleton
//! range of the record identifier space.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::appdef::QName;
use crate::ids::RecordId;

use super::errors::{NamesError, NamesResult};

pub const NULL_QNAME_ID: u16 = 0;
pub const ERROR_QNAME_ID: u16 = 1;
pub const CUD_QNAME_ID: u16 = 2;
pub const CORRUPTED_QNAME_ID: u16 = 3;
pub const PLOG_QNAME_ID: u16 = 4;
pub const WLOG_QNAME_ID: u16 = 5;
pub const RECORDS_QNAME_ID: u16 = 6;

/// First identifier assigned to application names.
pub const FIRST_USER_QNAME_ID: u16 = 256;

pub const NULL_CONTAINER_ID: u16 = 0;
pub const FIRST_USER_CONTAINER_ID: u16 = 1;

/// System view holding the partition log.
pub fn plog_view() -> QName {
    QName::sys("PLog")
}

/// System view holding the workspace log.
pub fn wlog_view() -> QName {
    QName::sys("WLog")
}

/// System view holding materialized records.
pub fn records_view() -> QName {
    QName::sys("Records")
}

/// Generic u16 interner with a reserved prefix.
#[derive(Debug, Clone)]
struct Interner<K> {
    table: &'static str,
    ids: HashMap<K, u16>,
    keys: BTreeMap<u16, K>,
    first_user: u16,
}

impl<K: Clone + Eq + Hash> Interner<K> {
    fn new(table: &'static str, first_user: u16) -> Self {
        Self {
            table,
            ids: HashMap::new(),
            keys: BTreeMap::new(),
            first_user,
        }
    }

    fn reserve(&mut self, key: K, id: u16) {
        self.ids.insert(key.clone(), id);
        self.keys.insert(id, key);
    }

    fn id(&self, key: &K) -> Option<u16> {
        self.ids.get(key).copied()
    }

    fn key(&self, id: u16) -> Option<&K> {
        self.keys.get(&id)
    }

    /// Restores a persisted assignment.
    fn restore(&mut self, key: K, id: u16) -> NamesResult<()>
    where
        K: std::fmt::Display,
    {
        if id < self.first_user {
            return Err(NamesError::Conflict {
                table: self.table,
                reason: format!("'{}' uses reserved id {}", key, id),
            });
        }
        if let Some(existing) = self.keys.get(&id) {
            if *existing != key {
                return Err(NamesError::Conflict {
                    table: self.table,
                    reason: format!("id {} assigned to both '{}' and '{}'", id, existing, key),
                });
            }
        }
        if let Some(existing) = self.ids.get(&key) {
            if *existing != id {
                return Err(NamesError::Conflict {
                    table: self.table,
                    reason: format!("'{}' assigned to both {} and {}", key, existing, id),
                });
            }
        }
        self.reserve(key, id);
        Ok(())
    }

    /// Assigns the lowest free user id, or returns the existing one.
    fn add(&mut self, key: K) -> NamesResult<u16> {
        if let Some(id) = self.ids.get(&key) {
            return Ok(*id);
        }
        let next = match self.keys.range(self.first_user..).next_back() {
            Some((last, _)) => last.checked_add(1).ok_or(NamesError::Overflow { table: self.table })?,
            None => self.first_user,
        };
        self.reserve(key, next);
        Ok(next)
    }

    fn user_entries(&self) -> impl Iterator<Item = (&K, u16)> {
        self.keys.range(self.first_user..).map(|(id, key)| (key, *id))
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Qualified name to `u16` identifier table.
#[derive(Debug, Clone)]
pub struct QNameTable {
    inner: Interner<QName>,
}

impl QNameTable {
    /// Creates a table holding only the reserved system names.
    pub fn new() -> Self {
        let mut inner = Interner::new("qname", FIRST_USER_QNAME_ID);
        inner.reserve(QName::null(), NULL_QNAME_ID);
        inner.reserve(QName::error(), ERROR_QNAME_ID);
        inner.reserve(QName::command_cud(), CUD_QNAME_ID);
        inner.reserve(QName::corrupted(), CORRUPTED_QNAME_ID);
        inner.reserve(plog_view(), PLOG_QNAME_ID);
        inner.reserve(wlog_view(), WLOG_QNAME_ID);
        inner.reserve(records_view(), RECORDS_QNAME_ID);
        Self { inner }
    }

    pub fn id(&self, qname: &QName) -> NamesResult<u16> {
        self.inner
            .id(qname)
            .ok_or_else(|| NamesError::UnknownQName(qname.clone()))
    }

    pub fn qname(&self, id: u16) -> NamesResult<&QName> {
        self.inner.key(id).ok_or(NamesError::UnknownQNameId(id))
    }

    pub(crate) fn add(&mut self, qname: QName) -> NamesResult<u16> {
        self.inner.add(qname)
    }

    pub(crate) fn restore(&mut self, qname: QName, id: u16) -> NamesResult<()> {
        self.inner.restore(qname, id)
    }

    /// Iterates over application names and their identifiers.
    pub fn user_entries(&self) -> impl Iterator<Item = (&QName, u16)> {
        self.inner.user_entries()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }
}

impl Default for QNameTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Container name to `u16` identifier table. The empty name is id 0.
#[derive(Debug, Clone)]
pub struct ContainerTable {
    inner: Interner<String>,
}

impl ContainerTable {
    pub fn new() -> Self {
        let mut inner = Interner::new("container", FIRST_USER_CONTAINER_ID);
        inner.reserve(String::new(), NULL_CONTAINER_ID);
        Self { inner }
    }

    pub fn id(&self, name: &str) -> NamesResult<u16> {
        self.inner
            .id(&name.to_string())
            .ok_or_else(|| NamesError::UnknownContainer(name.to_string()))
    }

    pub fn name(&self, id: u16) -> NamesResult<&str> {
        self.inner
            .key(id)
            .map(String::as_str)
            .ok_or(NamesError::UnknownContainerId(id))
    }

    pub(crate) fn add(&mut self, name: String) -> NamesResult<u16> {
        self.inner.add(name)
    }

    pub(crate) fn restore(&mut self, name: String, id: u16) -> NamesResult<()> {
        self.inner.restore(name, id)
    }

    pub fn user_entries(&self) -> impl Iterator<Item = (&String, u16)> {
        self.inner.user_entries()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }
}

impl Default for ContainerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Singleton document type to record identifier table.
#[derive(Debug, Clone, Default)]
pub struct SingletonTable {
    ids: HashMap<QName, RecordId>,
    types: BTreeMap<RecordId, QName>,
}

impl SingletonTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self, qname: &QName) -> NamesResult<RecordId> {
        self.ids
            .get(qname)
            .copied()
            .ok_or_else(|| NamesError::UnknownSingleton(qname.clone()))
    }

    pub fn qname(&self, id: RecordId) -> Option<&QName> {
        self.types.get(&id)
    }

    pub(crate) fn add(&mut self, qname: QName) -> NamesResult<RecordId> {
        if let Some(id) = self.ids.get(&qname) {
            return Ok(*id);
        }
        let next = match self.types.keys().next_back() {
            Some(last) => RecordId::new(last.value() + 1),
            None => RecordId::FIRST_SINGLETON,
        };
        if !next.is_singleton() {
            return Err(NamesError::Overflow { table: "singleton" });
        }
        self.ids.insert(qname.clone(), next);
        self.types.insert(next, qname);
        Ok(next)
    }

    pub(crate) fn restore(&mut self, qname: QName, id: RecordId) -> NamesResult<()> {
        if !id.is_singleton() {
            return Err(NamesError::Conflict {
                table: "singleton",
                reason: format!("'{}' uses id {} outside the singleton range", qname, id),
            });
        }
        if let Some(existing) = self.types.get(&id) {
            if *existing != qname {
                return Err(NamesError::Conflict {
                    table: "singleton",
                    reason: format!("id {} assigned to both '{}' and '{}'", id, existing, qname),
                });
            }
        }
        self.ids.insert(qname.clone(), id);
        self.types.insert(id, qname);
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&QName, RecordId)> {
        self.types.iter().map(|(id, qname)| (qname, *id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_qnames() {
        let table = QNameTable::new();
        assert_eq!(table.id(&QName::null()).unwrap(), NULL_QNAME_ID);
        assert_eq!(table.id(&QName::error()).unwrap(), ERROR_QNAME_ID);
        assert_eq!(table.qname(CORRUPTED_QNAME_ID).unwrap(), &QName::corrupted());
        assert_eq!(table.user_entries().count(), 0);
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut table = QNameTable::new();
        let a = table.add(QName::new("test", "A")).unwrap();
        let b = table.add(QName::new("test", "B")).unwrap();
        assert_eq!(a, FIRST_USER_QNAME_ID);
        assert_eq!(b, FIRST_USER_QNAME_ID + 1);
        assert_eq!(table.add(QName::new("test", "A")).unwrap(), a);
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let table = QNameTable::new();
        assert!(matches!(
            table.id(&QName::new("test", "Missing")),
            Err(NamesError::UnknownQName(_))
        ));
        assert!(matches!(table.qname(999), Err(NamesError::UnknownQNameId(999))));

        let containers = ContainerTable::new();
        assert_eq!(containers.id("").unwrap(), NULL_CONTAINER_ID);
        assert!(matches!(containers.name(7), Err(NamesError::UnknownContainerId(7))));
    }

    #[test]
    fn test_restore_rejects_reserved_and_clashing_ids() {
        let mut table = QNameTable::new();
        assert!(table.restore(QName::new("test", "A"), 3).is_err());

        table.restore(QName::new("test", "A"), 300).unwrap();
        assert!(table.restore(QName::new("test", "B"), 300).is_err());
        assert!(table.restore(QName::new("test", "A"), 301).is_err());

        // new names continue after the highest restored id
        assert_eq!(table.add(QName::new("test", "C")).unwrap(), 301);
    }

    #[test]
    fn test_singleton_ids_in_range() {
        let mut table = SingletonTable::new();
        let a = table.add(QName::new("test", "Config")).unwrap();
        let b = table.add(QName::new("test", "Settings")).unwrap();
        assert_eq!(a, RecordId::FIRST_SINGLETON);
        assert!(b.is_singleton());
        assert_eq!(table.qname(b), Some(&QName::new("test", "Settings")));
        assert!(table.restore(QName::new("test", "X"), RecordId::FIRST_USER).is_err());
    }
}
