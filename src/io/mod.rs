//! Binary checkpoint encoding.
//!
//! Stores, entities and meshes serialize themselves through the helpers in
//! [`wire`]; this crate defines no container file format beyond the fixed
//! field and entity ordering.

pub mod wire;
