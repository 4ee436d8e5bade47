//! Record: a row with creation/modification semantics

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::appdef::{AppDef, QName};
use crate::row::Row;

/// A row plus a flag distinguishing creation from modification.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    row: Row,
    is_new: bool,
}

impl Record {
    pub fn new(appdef: &Arc<AppDef>, qname: &QName) -> Self {
        Self {
            row: Row::new(appdef, qname),
            is_new: false,
        }
    }

    /// Record with the null type name, returned for missing records.
    pub fn null(appdef: &Arc<AppDef>) -> Self {
        Self {
            row: Row::null(appdef),
            is_new: false,
        }
    }

    pub fn from_row(row: Row, is_new: bool) -> Self {
        Self { row, is_new }
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

impl Deref for Record {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.row
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Row {
        &mut self.row
    }
}
