use super::*;

fn baseline_record() -> AvcDecoderConfig {
    AvcDecoderConfig {
        configuration_version: 1,
        profile_indication: 0x42,
        profile_compatibility: 0x00,
        level_indication: 0x1E,
        length_size_minus_one: 3,
        sps: vec![vec![0x67, 0x42]],
        pps: vec![vec![0x68, 0xCE]],
    }
}

#[test]
fn record_layout_is_bit_exact() {
    let bytes = baseline_record().to_bytes().unwrap();
    assert_eq!(
        bytes,
        vec![
            0x01, 0x42, 0x00, 0x1E, // version, profile, compat, level
            0xFF, // 0b111111 | lengthSizeMinusOne(3)
            0xE1, // 0b111 | numSPS(1)
            0x00, 0x02, 0x67, 0x42, // SPS
            0x01, // numPPS
            0x00, 0x02, 0x68, 0xCE, // PPS
        ]
    );
    assert_eq!(bytes.len(), baseline_record().encoded_len());
}

#[test]
fn record_reparses_to_the_same_parameter_sets() {
    let rec = baseline_record();
    let parsed = AvcDecoderConfig::parse(&rec.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed, rec);
    assert_eq!(parsed.sps, vec![vec![0x67, 0x42]]);
    assert_eq!(parsed.pps, vec![vec![0x68, 0xCE]]);
}

#[test]
fn parse_ignores_high_profile_trailer() {
    let mut bytes = baseline_record().to_bytes().unwrap();
    bytes.extend_from_slice(&[0xFC, 0xF8, 0xF8, 0x00]);
    assert_eq!(AvcDecoderConfig::parse(&bytes).unwrap(), baseline_record());
}

#[test]
fn parse_rejects_truncated_record() {
    let bytes = baseline_record().to_bytes().unwrap();
    assert!(AvcDecoderConfig::parse(&bytes[..8]).is_err());
}

#[test]
fn too_many_sps_is_rejected() {
    let mut rec = baseline_record();
    rec.sps = vec![vec![0x67]; 32];
    assert!(rec.to_bytes().is_err());
}

#[test]
fn codec_string_is_lower_hex() {
    let mut rec = baseline_record();
    rec.profile_compatibility = 0xC0;
    assert_eq!(rec.codec_string(FourCc::AVC1), "avc1.42c01e");
}

#[test]
fn annex_b_rewrites_prefixes_and_injects_parameter_sets() {
    let rec = baseline_record();
    let sample = [0, 0, 0, 3, 0x65, 0xAA, 0xBB, 0, 0, 0, 1, 0x06];

    let mut key = Vec::new();
    avcc_to_annex_b(&sample, &rec, true, &mut key).unwrap();
    assert_eq!(
        key,
        vec![
            0, 0, 0, 1, 0x67, 0x42, //
            0, 0, 0, 1, 0x68, 0xCE, //
            0, 0, 0, 1, 0x65, 0xAA, 0xBB, //
            0, 0, 0, 1, 0x06,
        ]
    );

    let mut delta = Vec::new();
    avcc_to_annex_b(&sample, &rec, false, &mut delta).unwrap();
    assert_eq!(delta, vec![0, 0, 0, 1, 0x65, 0xAA, 0xBB, 0, 0, 0, 1, 0x06]);
}

#[test]
fn annex_b_honours_short_length_prefixes_and_detects_overrun() {
    let mut rec = baseline_record();
    rec.length_size_minus_one = 1;
    let mut out = Vec::new();
    avcc_to_annex_b(&[0, 2, 0x41, 0x9A], &rec, false, &mut out).unwrap();
    assert_eq!(out, vec![0, 0, 0, 1, 0x41, 0x9A]);

    let mut out = Vec::new();
    assert!(avcc_to_annex_b(&[0, 9, 0x41], &rec, false, &mut out).is_err());
}
