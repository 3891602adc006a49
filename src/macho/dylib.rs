//! Dylib load-command references (`LC_LOAD_DYLIB` and its weak/reexport/lazy/upward variants)
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct DylibRef {
    pub name: String,
    pub timestamp: u32,
    pub current_version: String,
    pub compatibility_version: String,
}
