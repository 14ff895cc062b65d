//! Protocol-unit scenarios: FEC behaviour through the public API, P25 PDU
//! assembly and TSBK round-trips.

use fnelink::coding::{Crc32, ReedSolomon, Trellis};
use fnelink::p25::data::{
    DataAssembler, DataBlock, DataHeader, PDU_FEC_LENGTH, PDU_FRAME_OFFSET,
};
use fnelink::p25::{PduFormat, Tsbk};
use fnelink::util::bits::{bin_to_hex, hex_to_bin};

#[test]
fn test_rs_corrects_to_bound_and_reports_beyond() {
    let rs = ReedSolomon::RS_24_12_13;
    let mut codeword = vec![0u8; 18];
    for i in 0..rs.k() {
        hex_to_bin((i as u8 * 5 + 1) & 0x3F, &mut codeword, i * 6);
    }
    rs.encode(&mut codeword).unwrap();
    let clean = codeword.clone();

    // Six errors (the bound for this code) correct fully.
    let mut corrupt = clean.clone();
    for idx in [0usize, 4, 8, 12, 16, 20] {
        let sym = bin_to_hex(&corrupt, idx * 6) ^ 0x0D;
        hex_to_bin(sym, &mut corrupt, idx * 6);
    }
    assert_eq!(rs.decode(&mut corrupt).unwrap(), 6);
    assert_eq!(corrupt, clean);

    // Seven errors cannot come back to the transmitted codeword.
    let mut corrupt = clean.clone();
    for idx in [0usize, 3, 6, 9, 12, 15, 18] {
        let sym = bin_to_hex(&corrupt, idx * 6) ^ 0x2B;
        hex_to_bin(sym & 0x3F, &mut corrupt, idx * 6);
    }
    match rs.decode(&mut corrupt) {
        Err(_) => {}
        Ok(_) => assert_ne!(corrupt, clean),
    }
}

#[test]
fn test_trellis_rates_round_trip() {
    let payload34: Vec<u8> = (0u8..18).map(|i| i.wrapping_mul(41).wrapping_add(3)).collect();
    let mut coded = [0u8; 25];
    Trellis::encode_3_4(&payload34, &mut coded);
    let mut decoded = [0u8; 18];
    Trellis::decode_3_4(&coded, &mut decoded).unwrap();
    assert_eq!(decoded.as_slice(), payload34.as_slice());

    let payload12: Vec<u8> = (0u8..12).map(|i| i.wrapping_mul(89).wrapping_add(1)).collect();
    let mut coded = [0u8; 25];
    Trellis::encode_1_2(&payload12, &mut coded);
    let mut decoded = [0u8; 12];
    Trellis::decode_1_2(&coded, &mut decoded).unwrap();
    assert_eq!(decoded.as_slice(), payload12.as_slice());
}

/// Confirmed-format PDU: header frame, two data blocks, 32 bytes of user
/// data passing the CRC-32 check with blocks in order.
#[test]
fn test_pdu_confirmed_assembly_scenario() {
    let mut assembler = DataAssembler::new();

    let mut header = DataHeader::new(PduFormat::Confirmed, 0x00, 0x000001);
    header.blocks_to_follow = 2;

    let mut frame = vec![0u8; PDU_FRAME_OFFSET + PDU_FEC_LENGTH];
    header.encode_fec(&mut frame[PDU_FRAME_OFFSET..]);
    assert!(assembler.assemble(&frame).unwrap().is_none());

    // 32 bytes of user data, CRC-32 in the trailer.
    let mut user_data = vec![0u8; 32];
    for (i, b) in user_data.iter_mut().enumerate().take(28) {
        *b = (i as u8) * 3 + 1;
    }
    Crc32::add_trailer(&mut user_data);

    let block0 = DataBlock::confirmed(0, &user_data[..16]);
    let mut frame0 = vec![0u8; PDU_FRAME_OFFSET + PDU_FEC_LENGTH];
    block0.encode_confirmed(&mut frame0[PDU_FRAME_OFFSET..]);
    assert!(assembler.assemble(&frame0).unwrap().is_none());

    let block1 = DataBlock::confirmed(1, &user_data[16..]);
    let mut frame1 = vec![0u8; PDU_FRAME_OFFSET + PDU_FEC_LENGTH];
    block1.encode_confirmed(&mut frame1[PDU_FRAME_OFFSET..]);

    let pdu = assembler.assemble(&frame1).unwrap().expect("completed PDU");
    assert_eq!(pdu.user_data.len(), 32);
    assert_eq!(pdu.user_data, user_data);
    assert_eq!(pdu.header.blocks_to_follow, 2);
}

/// Extended-function TSBK in raw mode: encode, decode, CRC verification.
#[test]
fn test_tsbk_ext_fnct_scenario() {
    let tsbk = Tsbk::ExtFnct {
        function: 0x0200,
        src_id: 0xABCDEF,
        dst_id: 0x123456,
    };

    let raw = tsbk.encode_raw(true);
    assert_eq!(raw.len(), 12);

    let (decoded, last_block) = Tsbk::decode_raw(&raw).unwrap();
    assert!(last_block);
    match decoded {
        Tsbk::ExtFnct {
            function,
            src_id,
            dst_id,
        } => {
            assert_eq!(function, 0x0200);
            assert_eq!(src_id, 0xABCDEF);
            assert_eq!(dst_id, 0x123456);
        }
        other => panic!("wrong variant: {other:?}"),
    }

    // A corrupted trailer must not verify.
    let mut bad = raw;
    bad[11] ^= 0x01;
    assert!(Tsbk::decode_raw(&bad).is_err());
}
