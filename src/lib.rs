#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # mdf3-rs
//!
//! A Rust library for the block container layer of ASAM MDF 3 (Measurement
//! Data Format) files.
//!
//! An MDF3 file is a 64-byte identification preamble followed by a graph of
//! typed, length-prefixed blocks that point at each other through absolute
//! file offsets. The root header block always sits at offset 64. This crate
//! reads and writes that graph; it does not interpret channel data.
//!
//! ## Features
//!
//! - **Block envelope**: header, link table, fixed record and variable part
//!   for every block kind, with unknown kinds preserved as raw bytes
//! - **Typed records**: [`TypedBlock`](blocks::TypedBlock) binds a packed
//!   record layout to the envelope
//! - **Lazy graph loading**: the root header and its chain load eagerly,
//!   everything else on demand
//! - **Record counting**: per-record-kind counts for interleaved data regions
//!
//! ## Quick Start
//!
//! ### Creating a file
//!
//! ```no_run
//! use mdf3_rs::blocks::{ChannelGroupBlock, ChannelGroupRecord, DataGroupBlock, DataGroupRecord};
//! use mdf3_rs::{Mdf3File, RecordKey, Result};
//!
//! fn main() -> Result<()> {
//!     let mut file = Mdf3File::create("recording.dat", "logger", 330)?;
//!     file.header_mut().record.set_author("Jane Doe");
//!     file.set_comment("bench run 4")?;
//!
//!     let mut dg = DataGroupBlock::with_record(DataGroupRecord {
//!         channel_group_count: 1,
//!         record_id_count: 1,
//!         ..Default::default()
//!     });
//!     let dg_offset = file.add_data_group(&mut dg)?;
//!
//!     let mut cg = ChannelGroupBlock::with_record(ChannelGroupRecord {
//!         record_id: 1,
//!         record_size: 4,
//!         ..Default::default()
//!     });
//!     let cg_offset = file.write_block(&mut cg)?;
//!     file.update_link(dg_offset, DataGroupRecord::LINK_FIRST_CG, cg_offset)?;
//!
//!     let key = RecordKey::new(0, 1);
//!     file.bind_channel_group(key, cg_offset)?;
//!     for value in [1u32, 2, 3] {
//!         let mut row = vec![1u8];
//!         row.extend_from_slice(&value.to_le_bytes());
//!         file.append_record(key, &row)?;
//!     }
//!     file.close()
//! }
//! ```
//!
//! ### Walking the block graph
//!
//! ```no_run
//! use mdf3_rs::blocks::HeaderRecord;
//! use mdf3_rs::{Mdf3File, Result};
//!
//! fn main() -> Result<()> {
//!     let mut file = Mdf3File::open("recording.dat", false)?;
//!     let header = file.header().clone();
//!     println!("{} / {}", header.record.author(), header.record.project());
//!
//!     if let Some(block) = file.load_link(&header, HeaderRecord::LINK_FIRST_DG, None)? {
//!         println!("{} block, {} links", block.id(), block.links().len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`blocks`] | Block envelope, record layouts, factory |
//! | [`container`] | [`Mdf3File`]: open, create, load and write blocks |
//! | [`record_count`] | Record counting for interleaved data regions |
//! | [`file`] | Random-access file handles |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Cargo Features
//!
//! - `std` (default): disk files and the system clock. Without it the crate
//!   is `no_std` + `alloc` and works on [`MemoryFile`]s.
//! - `serde`: `Serialize`/`Deserialize` for records and record counts.
//!
//! ## Logging
//!
//! Diagnostics are emitted through [`tracing`]; install a subscriber to see
//! them. The library never installs one.

extern crate alloc;

pub mod blocks;
pub mod container;
pub mod error;
pub mod file;
pub mod record_count;

// Re-export commonly used types at the crate root
pub use blocks::{Block, BlockFactory, BlockId, LinkTable, Record, TypedBlock};
pub use container::{Mdf3File, OpenOptions, RootChain};
pub use error::{Error, Result};
#[cfg(feature = "std")]
pub use file::DiskFile;
pub use file::{MemoryFile, RandomAccessFile};
pub use record_count::{RecordCount, RecordCountTable, RecordKey, RecordLayout, ScanSummary};
