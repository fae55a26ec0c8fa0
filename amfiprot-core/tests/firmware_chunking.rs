use amfiprot_core::firmware::chunk_firmware;

#[test]
fn a_1000_byte_binary_chunks_into_20_firmware_data_packets() {
    let firmware = vec![0x5Au8; 1000];
    let chunks = chunk_firmware(&firmware, 54);
    assert_eq!(chunks.len(), 20);
    assert!(chunks[..19].iter().all(|c| c.len() == 52));
    assert_eq!(chunks[19].len(), 12);
    assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 1000);
}
