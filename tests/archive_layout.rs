use ziplode::{
    generate_to_writer, read_archive, read_archive_deep, ArchiveConfig, CentralDirectoryHeader,
    EndOfCentralDirectory, LocalFileHeader, MethodTagPolicy,
};

fn cfg(target_size_mb: u32, pattern_size: u32) -> ArchiveConfig {
    ArchiveConfig {
        target_size_mb,
        pattern_size,
        ..ArchiveConfig::default()
    }
}

fn build(config: &ArchiveConfig) -> (Vec<u8>, ziplode::ArchiveLayout) {
    generate_to_writer(Vec::new(), config, |_| {}).unwrap()
}

#[test]
fn five_entries_with_increasing_offsets() {
    let (bytes, layout) = build(&cfg(5, 1024 * 1024));
    assert_eq!(layout.entries.len(), 5);
    assert!(layout.entries.windows(2).all(|w| w[0].offset < w[1].offset));
    assert_eq!(layout.entries[0].offset, 0);

    let listing = read_archive(&bytes).unwrap();
    assert!(listing.is_consistent(), "{:?}", listing.issues);
    assert_eq!(listing.total_entries, 5);
    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "bomb_data_0.txt",
            "bomb_data_1.txt",
            "bomb_data_2.txt",
            "bomb_data_3.txt",
            "bomb_data_4.txt"
        ]
    );
}

#[test]
fn central_offsets_point_at_local_headers() {
    let (bytes, layout) = build(&cfg(3, 512 * 1024));
    let mut pos = layout.directory.offset as usize;
    for entry in &layout.entries {
        let central = CentralDirectoryHeader::parse(&bytes[pos..]).unwrap();
        assert_eq!(central.local_header_offset.get(), entry.offset);
        let local = LocalFileHeader::parse(&bytes[entry.offset as usize..]).unwrap();
        assert_eq!(local.crc32, central.crc32);
        assert_eq!(local.compressed_size, central.compressed_size);
        assert_eq!(local.uncompressed_size, central.uncompressed_size);
        pos += CentralDirectoryHeader::SIZE + central.file_name_length.get() as usize;
    }
    assert_eq!(pos + EndOfCentralDirectory::SIZE, bytes.len());
}

#[test]
fn directory_starts_right_after_last_payload() {
    let (bytes, layout) = build(&cfg(2, 1024 * 1024));
    let last = layout.entries.last().unwrap();
    let end_of_last = last.offset as usize
        + LocalFileHeader::SIZE
        + last.name.len()
        + last.compressed_size as usize;
    assert_eq!(layout.directory.offset as usize, end_of_last);

    let end = EndOfCentralDirectory::parse(&bytes[bytes.len() - EndOfCentralDirectory::SIZE..])
        .unwrap();
    assert_eq!(end.central_dir_offset.get() as usize, end_of_last);
    assert_eq!(end.total_entries.get() as usize, layout.entries.len());
    assert_eq!(end.entries_on_disk, end.total_entries);
    assert_eq!(
        end.central_dir_size.get() as usize,
        bytes.len() - EndOfCentralDirectory::SIZE - end_of_last
    );
}

#[test]
fn clamp_keeps_entry_count_bounded() {
    let config = cfg(2, 1024);
    let (bytes, layout) = build(&config);
    assert!(layout.plan.clamped);
    assert_eq!(layout.entries.len(), 1000);
    assert_eq!(layout.plan.pattern_size, 2 * 1024 * 1024 / 1000);
    assert!(layout
        .entries
        .iter()
        .all(|e| e.uncompressed_size as usize == 2 * 1024 * 1024 / 1000));

    let listing = read_archive(&bytes).unwrap();
    assert_eq!(listing.total_entries, 1000);
    assert!(listing.is_consistent(), "{:?}", listing.issues);
}

#[test]
fn generation_is_deterministic() {
    let config = cfg(1, 300 * 1024);
    let (a, la) = build(&config);
    let (b, lb) = build(&config);
    assert_eq!(a, b);
    let crcs_a: Vec<_> = la.entries.iter().map(|e| e.crc32).collect();
    let crcs_b: Vec<_> = lb.entries.iter().map(|e| e.crc32).collect();
    assert_eq!(crcs_a, crcs_b);
    assert!(crcs_a.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn payloads_expand_back_to_the_pattern() {
    let config = ArchiveConfig {
        pattern_char: b'q',
        ..cfg(1, 200 * 1024)
    };
    let (bytes, _) = build(&config);
    let listing = read_archive_deep(&bytes).unwrap();
    assert!(listing.is_consistent(), "{:?}", listing.issues);
    assert_eq!(listing.uncompressed_total(), 5 * 200 * 1024);
}

#[test]
fn archive_is_much_smaller_than_target() {
    let config = cfg(8, 1024 * 1024);
    let (bytes, layout) = build(&config);
    assert_eq!(layout.archive_bytes, bytes.len() as u64);
    assert!((bytes.len() as u64) * 50 < config.target_bytes());
}

#[test]
fn method_tag_policies() {
    let stored = build(&cfg(1, 1024 * 1024)).1;
    assert!(stored.entries.iter().all(|e| e.compression_method == 0));

    let legacy = ArchiveConfig {
        method_tag: MethodTagPolicy::Legacy,
        ..cfg(1, 1024 * 1024)
    };
    let (bytes, layout) = build(&legacy);
    assert!(layout.entries.iter().all(|e| e.compression_method == 8));
    let listing = read_archive(&bytes).unwrap();
    assert!(listing.entries.iter().all(|e| e.compression_method == 8));
}

#[test]
fn ff_pattern_is_unverifiable_but_consistent() {
    let config = ArchiveConfig {
        pattern_char: 0xFF,
        ..cfg(1, 1024 * 1024)
    };
    let (bytes, layout) = build(&config);
    assert_eq!(layout.entries.len(), 1);

    let shallow = read_archive(&bytes).unwrap();
    assert!(shallow.is_consistent(), "{:?}", shallow.issues);
    assert!(shallow.unverifiable.is_empty());

    let deep = read_archive_deep(&bytes).unwrap();
    assert!(deep.is_consistent(), "{:?}", deep.issues);
    assert_eq!(deep.unverifiable.len(), 1);
    assert!(deep.unverifiable[0].starts_with("bomb_data_0.txt: "));
}
