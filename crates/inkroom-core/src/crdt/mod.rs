//! CRDT-backed room using Loro.
//!
//! Peers exchange Loro snapshots or update blobs and converge on the same
//! document regardless of delivery order.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "layers": LoroMap<LayerId, LoroMap> (layer records)
//! └── "layer_ids": LoroList<String> (layer ids in z-order, back to front)
//! ```
//!
//! Each record holds "type", "x", "y", "width", "height", the fill channels and
//! variant fields ("value" for text and notes, "points" for paths).

mod convert;
mod schema;

pub use convert::{layer_from_loro, layer_to_loro};
pub use schema::{CrdtRoom, LAYER_IDS_KEY, LAYERS_KEY};

pub use loro::VersionVector;
