//! Data module: typed columns and the named-field datastore

pub mod datastore;
pub mod field;
pub mod storage;

pub use datastore::{Datastore, DsHandle};
pub use field::{Column, FieldElement, FieldType, Idx, IdxLists};
pub use storage::{Storage, VecStorage};
