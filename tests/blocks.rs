use mdf3_rs::blocks::{
    BlockHeader, ChannelBlock, ChannelGroupBlock, ChannelGroupRecord, ChannelRecord, ChannelRef,
    ConversionBlock, ConversionRecord, DataGroupBlock, DataGroupRecord, DependencyBlock,
    ExtensionBlock, ExtensionType, HeaderBlock, HeaderRecord, IdentificationBlock, ProgramBlock,
    SampleReductionBlock, SampleReductionRecord, TextBlock, TriggerBlock, TriggerEvent,
};
use mdf3_rs::{Block, BlockId, Error, LinkTable, Record, Result, TypedBlock};

fn roundtrip<R: Record + PartialEq>(block: &TypedBlock<R>) -> Result<TypedBlock<R>> {
    let bytes = block.to_bytes();
    assert_eq!(bytes.len() as u64, block.header().length);
    TypedBlock::<R>::from_bytes(&bytes)
}

fn assert_consistent(block: &dyn Block) {
    let header = block.header();
    let expected = 20 + 8 * header.link_count + block.fixed_size() as u64 + block.size();
    assert_eq!(header.length, expected, "{} length", block.id());
    assert_eq!(block.links().len() as u64, header.link_count);
}

#[test]
fn block_header_roundtrip() -> Result<()> {
    let header = BlockHeader {
        id: BlockId::CG,
        length: 74,
        link_count: 4,
    };
    let bytes = header.to_bytes();
    assert_eq!(&bytes[0..4], b"##CG");
    let parsed = BlockHeader::from_bytes(&bytes, 0)?;
    assert_eq!(parsed, header);
    assert_eq!(parsed.links_end(), 52);
    Ok(())
}

#[test]
fn header_block_roundtrip() -> Result<()> {
    let mut record = HeaderRecord::default();
    record.set_author("UnitTest");
    record.set_organization("Measurement Lab");
    record.set_project("P-17");
    record.timestamp = 1_700_000_000_000_000_000;
    let mut block = HeaderBlock::with_record(record);
    block.set_link(HeaderRecord::LINK_COMMENT, 0x1000)?;

    let parsed = roundtrip(&block)?;
    assert_eq!(parsed, block);
    assert_eq!(parsed.header().length, 20 + 3 * 8 + 159);
    assert_eq!(parsed.record.author(), "UnitTest");
    assert_eq!(parsed.record.organization(), "Measurement Lab");
    assert_eq!(parsed.link(HeaderRecord::LINK_COMMENT), 0x1000);
    assert!(!parsed.has_link(HeaderRecord::LINK_FIRST_DG));
    assert_consistent(&parsed);
    Ok(())
}

#[test]
fn text_and_program_blocks_roundtrip() -> Result<()> {
    let text = roundtrip(&TextBlock::from_text("engine warm-up"))?;
    assert_eq!(text.text(), "engine warm-up");
    assert_eq!(text.links().len(), 0);
    assert_consistent(&text);

    let program = roundtrip(&ProgramBlock::with_data(vec![9, 8, 7]))?;
    assert_eq!(program.data(0)?, Some(&[9u8, 8, 7][..]));
    assert_consistent(&program);
    Ok(())
}

#[test]
fn group_blocks_roundtrip() -> Result<()> {
    let mut dg = DataGroupBlock::with_record(DataGroupRecord {
        channel_group_count: 2,
        record_id_count: 1,
        reserved: 0,
    });
    dg.set_link(DataGroupRecord::LINK_DATA, 0x2000)?;
    let parsed = roundtrip(&dg)?;
    assert_eq!(parsed, dg);
    assert_consistent(&parsed);

    let mut cg = ChannelGroupBlock::with_record(ChannelGroupRecord {
        record_id: 2,
        channel_count: 3,
        record_size: 12,
        record_count: 99,
    });
    cg.set_link(ChannelGroupRecord::LINK_FIRST_CN, 0x300)?;
    let parsed = roundtrip(&cg)?;
    assert_eq!(parsed.record.record_count, 99);
    assert_eq!(parsed.link(ChannelGroupRecord::LINK_FIRST_CN), 0x300);
    assert_consistent(&parsed);
    Ok(())
}

#[test]
fn channel_block_roundtrip() -> Result<()> {
    let mut record = ChannelRecord::default();
    record.set_short_name("rpm");
    record.set_description("crank shaft speed");
    record.bit_count = 16;
    record.start_bit = 8;
    record.max = 8000.0;
    let mut block = ChannelBlock::with_record(record);
    block.set_link(ChannelRecord::LINK_DISPLAY_NAME, 0x48)?;

    let parsed = roundtrip(&block)?;
    assert_eq!(parsed, block);
    assert_eq!(parsed.record.short_name(), "rpm");
    assert_eq!(parsed.record.description(), "crank shaft speed");
    assert_eq!(parsed.links().len(), 7);
    assert_consistent(&parsed);
    Ok(())
}

#[test]
fn conversion_parameters_roundtrip() -> Result<()> {
    let mut record = ConversionRecord::default();
    record.set_unit("km/h");
    let mut block = ConversionBlock::with_record(record);
    block.set_parameters(&[0.5, 2.0])?;

    let parsed = roundtrip(&block)?;
    assert_eq!(parsed.record.unit(), "km/h");
    assert_eq!(parsed.record.parameter_count, 2);
    assert_eq!(parsed.elements(), vec![0.5, 2.0]);
    assert_eq!(parsed.element(1), Some(2.0));
    assert_eq!(parsed.element(2), None);
    assert_consistent(&parsed);
    Ok(())
}

#[test]
fn trigger_dependency_extension_and_reduction_roundtrip() -> Result<()> {
    let events = [
        TriggerEvent {
            time: 1.5,
            pre_time: 0.25,
            post_time: 0.75,
        },
        TriggerEvent {
            time: 9.0,
            pre_time: 0.0,
            post_time: 1.0,
        },
    ];
    let mut trigger = TriggerBlock::new();
    trigger.set_events(&events)?;
    let parsed = roundtrip(&trigger)?;
    assert_eq!(parsed.record.trigger_count, 2);
    assert_eq!(parsed.events(), events.to_vec());

    let refs = [ChannelRef {
        data_group: 0x100,
        channel_group: 0x200,
        channel: 0x300,
    }];
    let mut dependency = DependencyBlock::new();
    dependency.set_dependencies(&refs)?;
    let parsed = roundtrip(&dependency)?;
    assert_eq!(parsed.record.dependency_count, 1);
    assert_eq!(parsed.dependencies(), refs.to_vec());

    let extension = ExtensionBlock::new_with_type(ExtensionType::VectorCan, vec![1, 2, 3, 4]);
    let parsed = roundtrip(&extension)?;
    assert_eq!(parsed.extension_type(), ExtensionType::VectorCan);
    assert_eq!(parsed.size(), 4);

    let reduction = SampleReductionBlock::with_record(SampleReductionRecord {
        reduced_count: 12,
        interval: 0.1,
    });
    let parsed = roundtrip(&reduction)?;
    assert_eq!(parsed, reduction);
    assert_consistent(&parsed);
    Ok(())
}

#[test]
fn link_writes_are_bounds_checked() -> Result<()> {
    let mut block = HeaderBlock::new();
    assert!(matches!(
        block.set_link(3, 0x40),
        Err(Error::LinkSlotOutOfRange { index: 3, len: 3 })
    ));
    assert_eq!(block.link(7), 0);
    assert!(!block.has_link(7));

    let mut table = LinkTable::new(2);
    table.set(1, 0x80)?;
    assert!(table.has(1));
    assert!(!table.has(0));
    assert!(table.set(2, 1).is_err());
    assert_eq!(table.as_slice(), &[0, 0x80]);
    Ok(())
}

#[test]
fn data_segment_zero_is_the_only_segment() -> Result<()> {
    let empty = DataGroupBlock::new();
    assert_eq!(empty.size(), 0);
    assert_eq!(empty.data(0)?, None);

    let text = TextBlock::from_text("abc");
    assert_eq!(text.data(0)?.map(|d| d.len() as u64), Some(text.size()));
    assert!(matches!(
        text.data(1),
        Err(Error::InvalidDataSegment { index: 1 })
    ));
    Ok(())
}

#[test]
fn surplus_links_are_dropped_on_read() -> Result<()> {
    let header = BlockHeader {
        id: BlockId::TX,
        length: 20 + 8 + 3,
        link_count: 1,
    };
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(&0x4242u64.to_le_bytes());
    bytes.extend_from_slice(b"hi\0");

    let block = TextBlock::from_bytes(&bytes)?;
    assert_eq!(block.links().len(), 0);
    assert_eq!(block.text(), "hi");
    assert_eq!(block.header().link_count, 1);
    assert_eq!(block.encoded_header().length, 20 + 3);
    Ok(())
}

#[test]
fn short_fixed_record_reads_as_zero_tail() -> Result<()> {
    let header = BlockHeader {
        id: BlockId::DG,
        length: 20 + 4 * 8 + 4,
        link_count: 4,
    };
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 32]);
    bytes.extend_from_slice(&3u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());

    let block = DataGroupBlock::from_bytes(&bytes)?;
    assert_eq!(block.record.channel_group_count, 3);
    assert_eq!(block.record.record_id_count, 1);
    assert_eq!(block.record.reserved, 0);
    assert_eq!(block.size(), 0);
    Ok(())
}

#[test]
fn malformed_blocks_are_rejected() {
    let mut bytes = TextBlock::from_text("x").to_bytes();
    bytes[0] = b'$';
    assert!(matches!(
        TextBlock::from_bytes(&bytes),
        Err(Error::MalformedHeader { offset: 0, marker }) if marker == *b"$#"
    ));

    let header = BlockHeader {
        id: BlockId::CG,
        length: 30,
        link_count: 4,
    };
    assert!(matches!(
        ChannelGroupBlock::from_bytes(&header.to_bytes()),
        Err(Error::InvalidBlockLength { length: 30, minimum: 52, .. })
    ));

    let truncated = &TextBlock::from_text("long enough").to_bytes()[..24];
    assert!(matches!(
        TextBlock::from_bytes(truncated),
        Err(Error::TruncatedRead { .. })
    ));

    let text = TextBlock::from_text("not a group").to_bytes();
    assert!(matches!(
        DataGroupBlock::from_bytes(&text),
        Err(Error::TypeMismatch { expected: BlockId::DG, actual: BlockId::TX })
    ));
}

#[test]
fn identification_block_roundtrip() -> Result<()> {
    let id = IdentificationBlock::new("UnitTest", 330);
    let bytes = id.to_bytes();
    assert_eq!(bytes.len(), 64);
    assert_eq!(&bytes[0..8], b"MDF     ");
    assert_eq!(&bytes[8..16], b"3.30    ");
    let parsed = IdentificationBlock::from_bytes(&bytes)?;
    assert_eq!(parsed, id);
    assert_eq!(IdentificationBlock::parse_block_version(b"3.00    ")?, (3, 0));
    Ok(())
}

#[test]
fn count_fields_reject_overflow() -> Result<()> {
    let mut trigger = TriggerBlock::new();
    let events = vec![TriggerEvent::default(); usize::from(u16::MAX) + 1];
    assert!(matches!(
        trigger.set_events(&events),
        Err(Error::BlockSerializationError(_))
    ));
    assert_eq!(trigger.record.trigger_count, 0);
    assert_eq!(trigger.size(), 0);

    let mut conversion = ConversionBlock::new();
    conversion.set_parameters(&vec![1.0; usize::from(u16::MAX)])?;
    assert_eq!(conversion.record.parameter_count, u16::MAX);
    assert!(conversion.set_parameters(&vec![1.0; 70_000]).is_err());
    assert_eq!(conversion.record.parameter_count, u16::MAX);

    let mut dependency = DependencyBlock::new();
    let refs = vec![ChannelRef::default(); usize::from(u16::MAX) + 1];
    assert!(dependency.set_dependencies(&refs).is_err());
    assert_eq!(dependency.record.dependency_count, 0);
    Ok(())
}
