//! # flatdb - Embedded Flat-File Record Store
//!
//! flatdb is a small embedded record store: a fixed-layout flat file holding
//! an opaque header, a record count, and a sequence of fixed-size records,
//! paired with an in-memory height-balanced search index that makes lookup,
//! insertion, deletion, and editing by integer key logarithmic.
//!
//! ## Key Features
//!
//! - **Embedded**: a single data file, no separate server process
//! - **Indexed**: every live record is cached in an AVL index keyed by an
//!   integer derived from the record's own content
//! - **Compacting**: deleting a non-last record relocates the file's last
//!   record into the freed slot, so the record region never holds holes
//! - **Thread-Safe**: store and index handles are cloneable and internally
//!   locked; clones share one underlying instance
//! - **Reconstructing**: reopening an existing file rebuilds the index from
//!   the stored records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flatdb::common::Keyed;
//! use flatdb::errors::FlatdbResult;
//! use flatdb::store::{FixedRecord, RecordStore};
//!
//! #[derive(Clone)]
//! struct User { id: i32, name: [u8; 60] }
//!
//! impl Keyed for User {
//!     fn key(&self) -> i64 { self.id as i64 }
//! }
//!
//! impl FixedRecord for User {
//!     fn encoded_len() -> usize { 64 }
//!     fn encode(&self, buf: &mut [u8]) {
//!         buf[0..4].copy_from_slice(&self.id.to_le_bytes());
//!         buf[4..].copy_from_slice(&self.name);
//!     }
//!     fn decode(buf: &[u8]) -> FlatdbResult<Self> {
//!         // ... mirror of encode ...
//!         # unimplemented!()
//!     }
//! }
//!
//! # fn main() -> FlatdbResult<()> {
//! let header = 1u32.to_le_bytes();
//! let store: RecordStore<User> = RecordStore::open("users.db", 4, &header)?;
//! store.add(User { id: 7, name: [0; 60] })?;
//! if let Some(user) = store.query(7)? {
//!     println!("found user {}", user.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Shared types and constants ([`common::Keyed`])
//! - [`errors`] - Error types and result definitions
//! - [`index`] - The balanced in-memory search index
//! - [`store`] - The flat-file persistence layer

pub mod common;
pub mod errors;
pub mod index;
pub mod store;
