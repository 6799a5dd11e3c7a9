use super::*;
use crate::crypto::Secp256k1Crypto;

fn setup() -> (Secp256k1Crypto, Keys) {
    let crypto = Secp256k1Crypto::new();
    let keys = Keys::generate(&crypto);
    (crypto, keys)
}

// ===== Keyed Hash Prefix =====

#[test]
fn test_hash_prefix_round_trip() {
    let (crypto, keys) = setup();
    let payload = b"session update payload".to_vec();

    let packet = hash_packet(&crypto, &keys, &payload).unwrap();
    assert_eq!(packet.len(), PACKET_HASH_BYTES + payload.len());
    assert_eq!(&packet[PACKET_HASH_BYTES..], &payload[..]);
    assert!(is_network_next_packet(&crypto, &keys, &packet));
    assert_eq!(strip_packet_hash(&crypto, &keys, &packet).unwrap(), &payload[..]);
}

#[test]
fn test_hash_covers_first_32_bytes_only() {
    let (crypto, keys) = setup();
    let payload: Vec<u8> = (0..100u8).collect();
    let mut packet = hash_packet(&crypto, &keys, &payload).unwrap();

    // Bytes past the covered prefix are not authenticated by the filter.
    packet[PACKET_HASH_BYTES + 50] ^= 0xff;
    assert!(is_network_next_packet(&crypto, &keys, &packet));

    packet[PACKET_HASH_BYTES + 5] ^= 0xff;
    assert!(!is_network_next_packet(&crypto, &keys, &packet));
    assert_eq!(
        strip_packet_hash(&crypto, &keys, &packet),
        Err(PacketError::HashMismatch)
    );
}

#[test]
fn test_hash_rejects_wrong_key() {
    let (crypto, keys) = setup();
    let other_keys = Keys::generate(&crypto);
    let packet = hash_packet(&crypto, &keys, b"hello relay").unwrap();
    assert!(!is_network_next_packet(&crypto, &other_keys, &packet));
}

#[test]
fn test_hash_rejects_tampered_prefix() {
    let (crypto, keys) = setup();
    let packet = hash_packet(&crypto, &keys, b"hello relay").unwrap();

    for i in 0..PACKET_HASH_BYTES {
        let mut bad = packet.clone();
        bad[i] ^= 0x01;
        assert_eq!(
            strip_packet_hash(&crypto, &keys, &bad),
            Err(PacketError::HashMismatch)
        );
    }
}

#[test]
fn test_hash_size_limits() {
    let (crypto, keys) = setup();

    assert_eq!(
        hash_packet(&crypto, &keys, &[]),
        Err(PacketError::TooShort {
            expected: 1,
            got: 0
        })
    );
    assert!(hash_packet(&crypto, &keys, &vec![1u8; MAX_PACKET_BYTES - PACKET_HASH_BYTES]).is_ok());
    assert_eq!(
        hash_packet(&crypto, &keys, &vec![1u8; MAX_PACKET_BYTES]),
        Err(PacketError::TooLong {
            max: MAX_PACKET_BYTES,
            got: MAX_PACKET_BYTES + PACKET_HASH_BYTES
        })
    );

    assert!(!is_network_next_packet(&crypto, &keys, &[0u8; PACKET_HASH_BYTES]));
    assert!(!is_network_next_packet(&crypto, &keys, &vec![0u8; MAX_PACKET_BYTES + 1]));
}

// ===== Signature Suffix =====

#[test]
fn test_sign_and_verify() {
    let (crypto, keys) = setup();
    let backend_public = keys.backend_public_key(&crypto).unwrap();

    let packet = sign_packet(&crypto, &keys, b"route response").unwrap();
    assert_eq!(packet.len(), 14 + SIGNATURE_BYTES);
    assert_eq!(
        verify_signed_packet(&crypto, &backend_public, &packet).unwrap(),
        b"route response"
    );
}

#[test]
fn test_verify_rejects_tampering_and_wrong_key() {
    let (crypto, keys) = setup();
    let backend_public = keys.backend_public_key(&crypto).unwrap();
    let packet = sign_packet(&crypto, &keys, b"route response").unwrap();

    let mut tampered = packet.clone();
    tampered[0] ^= 0x01;
    assert_eq!(
        verify_signed_packet(&crypto, &backend_public, &tampered),
        Err(PacketError::SignatureCheckFailed)
    );

    let (stranger, _) = crypto.generate_keypair();
    assert_eq!(
        verify_signed_packet(&crypto, &stranger, &packet),
        Err(PacketError::SignatureCheckFailed)
    );

    assert_eq!(
        verify_signed_packet(&crypto, &backend_public, &packet[..10]),
        Err(PacketError::TooShort {
            expected: SIGNATURE_BYTES,
            got: 10
        })
    );
}

#[test]
fn test_signed_then_hashed() {
    let (crypto, keys) = setup();
    let backend_public = keys.backend_public_key(&crypto).unwrap();

    let signed = sign_packet(&crypto, &keys, b"payload").unwrap();
    let wire = hash_packet(&crypto, &keys, &signed).unwrap();

    let inner = strip_packet_hash(&crypto, &keys, &wire).unwrap();
    let payload = verify_signed_packet(&crypto, &backend_public, inner).unwrap();
    assert_eq!(payload, b"payload");
}
