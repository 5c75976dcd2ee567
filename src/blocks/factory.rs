use super::block::{Block, RawBlock};
use super::common::BlockId;
use super::record::Record;
use super::typed_block::TypedBlock;
use super::{
    ChannelGroupRecord, ChannelRecord, ConversionRecord, DataGroupRecord, DependencyRecord,
    ExtensionRecord, HeaderRecord, ProgramRecord, SampleReductionRecord, TextRecord,
    TriggerRecord,
};
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;

/// Constructor for an empty block of one kind.
pub type BlockConstructor = fn() -> Box<dyn Block>;

fn construct<R: Record>() -> Box<dyn Block> {
    Box::new(TypedBlock::<R>::new())
}

/// Maps type codes to block constructors.
///
/// Codes without a constructor become [`RawBlock`]s, or an
/// [`Error::UnknownBlockType`] when the factory is strict.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    constructors: BTreeMap<BlockId, BlockConstructor>,
    strict: bool,
}

impl Default for BlockFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register_record::<HeaderRecord>();
        factory.register_record::<TextRecord>();
        factory.register_record::<ProgramRecord>();
        factory.register_record::<DataGroupRecord>();
        factory.register_record::<ChannelGroupRecord>();
        factory.register_record::<ChannelRecord>();
        factory.register_record::<ConversionRecord>();
        factory.register_record::<TriggerRecord>();
        factory.register_record::<DependencyRecord>();
        factory.register_record::<ExtensionRecord>();
        factory.register_record::<SampleReductionRecord>();
        factory
    }
}

impl BlockFactory {
    /// A factory without any registered kinds.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
            strict: false,
        }
    }

    /// Fail on unknown type codes instead of falling back to [`RawBlock`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register (or replace) the constructor for `id`.
    pub fn register(&mut self, id: BlockId, constructor: BlockConstructor) {
        self.constructors.insert(id, constructor);
    }

    /// Register the typed block for record `R` under `R::ID`.
    pub fn register_record<R: Record>(&mut self) {
        self.register(R::ID, construct::<R>);
    }

    /// An empty block for `id`, ready to be read from `offset`.
    pub fn create(&self, id: BlockId, offset: u64) -> Result<Box<dyn Block>> {
        if let Some(constructor) = self.constructors.get(&id) {
            return Ok(constructor());
        }
        if self.strict {
            return Err(Error::UnknownBlockType { offset, id });
        }
        tracing::warn!(offset, id = %id, "unknown block type, keeping raw bytes");
        Ok(Box::new(RawBlock::new(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{ChannelBlock, HeaderBlock, TextBlock};

    #[test]
    fn dispatches_on_type_code() {
        let factory = BlockFactory::default();
        let block = factory.create(BlockId::HD, 64).unwrap();
        assert!(block.is::<HeaderBlock>());
        assert_eq!(block.links().len(), 3);
        let block = factory.create(BlockId::TX, 64).unwrap();
        assert!(block.downcast_ref::<TextBlock>().is_some());
    }

    #[test]
    fn unknown_codes_follow_policy() {
        let id = BlockId::new(b"QQ");
        let lenient = BlockFactory::default();
        let block = lenient.create(id, 200).unwrap();
        assert!(block.is::<RawBlock>());
        assert_eq!(block.id(), id);

        let strict = BlockFactory::default().strict(true);
        match strict.create(id, 200) {
            Err(Error::UnknownBlockType { offset, id: got }) => {
                assert_eq!(offset, 200);
                assert_eq!(got, id);
            }
            other => panic!("unexpected {:?}", other.map(|b| b.id())),
        }
    }

    #[test]
    fn registration_overrides() {
        let mut factory = BlockFactory::default();
        assert!(factory.create(BlockId::CN, 8).unwrap().is::<ChannelBlock>());
        factory.register(BlockId::CN, || -> Box<dyn Block> {
            Box::new(RawBlock::new(BlockId::CN))
        });
        assert!(factory.create(BlockId::CN, 8).unwrap().is::<RawBlock>());
        assert!(BlockFactory::empty().create(BlockId::HD, 8).unwrap().is::<RawBlock>());
    }
}
