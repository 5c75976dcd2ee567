// blocks/mod.rs
//! Block envelope, record layouts and the block factory.
//!
//! Every MDF3 block is a 20-byte [`BlockHeader`], a [`LinkTable`] of absolute
//! file offsets, a fixed record and a variable tail. The kinds below bind a
//! [`Record`] to that envelope through [`TypedBlock`]; [`BlockFactory`] picks
//! the kind from the type code when a block is loaded.

/// File offset of the root header block.
pub const HEADER_BLOCK_OFFSET: u64 = 64;

// ============================================================================
// Submodules
// ============================================================================

mod block;
mod channel_block;
mod channel_group_block;
pub(crate) mod common;
mod conversion_block;
mod data_group_block;
mod dependency_block;
mod extension_block;
mod factory;
mod header_block;
mod identification_block;
mod link_table;
mod program_block;
mod record;
mod sample_reduction_block;
mod text_block;
mod trigger_block;
mod typed_block;

// Envelope and generic binding
pub use block::{Block, Envelope, RawBlock};
pub use common::{
    BLOCK_HEADER_SIZE, BLOCK_MARKER, BlockHeader, BlockId, LINK_SIZE, decode_fixed_string,
    encode_fixed_string, u64_to_usize,
};
pub use factory::{BlockConstructor, BlockFactory};
pub use link_table::LinkTable;
pub use record::{Record, VarElement};
pub use typed_block::TypedBlock;

// Block kinds
pub use channel_block::{ChannelBlock, ChannelRecord};
pub use channel_group_block::{ChannelGroupBlock, ChannelGroupRecord};
pub use conversion_block::{ConversionBlock, ConversionRecord};
pub use data_group_block::{DataGroupBlock, DataGroupRecord};
pub use dependency_block::{ChannelRef, DependencyBlock, DependencyRecord};
pub use extension_block::{ExtensionBlock, ExtensionRecord, ExtensionType};
pub use header_block::{HeaderBlock, HeaderRecord};
pub use identification_block::{ID_BLOCK_SIZE, IdentificationBlock};
pub use program_block::{ProgramBlock, ProgramRecord};
pub use sample_reduction_block::{SampleReductionBlock, SampleReductionRecord};
pub use text_block::{TextBlock, TextRecord};
pub use trigger_block::{TriggerBlock, TriggerEvent, TriggerRecord};
