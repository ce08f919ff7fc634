//! Known derivation vectors
//!
//! The fixed keypairs and signatures for the 12-word compliance phrase,
//! exercised end to end through mnemonic import, path resolution, key
//! derivation, and signing.

use warden_core::{
    derive, path, sign, MnemonicPhrase, Purpose, SignatureKind,
};

const PHRASE: &str = "eye eye eye eye eye eye eye eye eye eye eye egg";
const PURPOSE: Purpose = Purpose::SignSolanaTransaction;

const PATH_0_SECRET: [u8; 64] = [
    12, 73, 241, 147, 3, 209, 215, 31, 247, 83, 30, 166, 100, 165, 6, 190, 45, 194, 202, 156, 37,
    234, 67, 245, 186, 173, 168, 169, 235, 182, 102, 91, 118, 152, 185, 123, 13, 244, 245, 248,
    197, 30, 147, 144, 194, 235, 196, 93, 117, 16, 216, 36, 135, 91, 29, 162, 17, 64, 179, 232,
    107, 128, 24, 254,
];

const PATH_0_PUBLIC: [u8; 32] = [
    118, 152, 185, 123, 13, 244, 245, 248, 197, 30, 147, 144, 194, 235, 196, 93, 117, 16, 216, 36,
    135, 91, 29, 162, 17, 64, 179, 232, 107, 128, 24, 254,
];

const PATH_1000_PUBLIC: [u8; 32] = [
    89, 2, 229, 112, 214, 221, 240, 233, 24, 168, 11, 189, 219, 165, 179, 239, 228, 160, 74, 242,
    36, 147, 106, 6, 213, 131, 208, 252, 158, 134, 121, 0,
];

const PATH_0_SIGNATURE_OF_ZEROS: [u8; 64] = [
    214, 208, 114, 114, 230, 18, 133, 193, 123, 90, 201, 225, 159, 230, 72, 89, 52, 175, 73, 217,
    162, 210, 128, 66, 119, 156, 115, 230, 233, 86, 3, 239, 109, 151, 246, 46, 142, 218, 184, 189,
    92, 68, 59, 145, 80, 241, 252, 37, 32, 214, 245, 50, 71, 31, 249, 215, 100, 224, 132, 26, 137,
    25, 121, 11,
];

fn seed() -> [u8; 64] {
    MnemonicPhrase::parse(PHRASE).unwrap().to_seed("")
}

#[test]
fn test_account_keypair_vector() {
    let seed = seed();
    let bip32 = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
    let keypair = derive::derive_keypair(PURPOSE, &seed, &bip32).unwrap();
    assert_eq!(keypair.to_keypair_bytes(), PATH_0_SECRET);
    assert_eq!(keypair.verifying_key().to_bytes(), PATH_0_PUBLIC);
}

#[test]
fn test_public_key_vector_and_base58() {
    let seed = seed();
    let bip32 = path::resolve(PURPOSE, "bip32:/m/1000'").unwrap();
    let public = derive::derive_public_key(PURPOSE, &seed, &bip32, None).unwrap();
    assert_eq!(*public.as_bytes(), PATH_1000_PUBLIC);
    assert_eq!(
        public.to_base58(),
        "6zTr6qLDtLj1N2p52KsxJVsAJtM6ZcMPht2qxi5znj6X"
    );
}

#[test]
fn test_base58_of_account_key() {
    let seed = seed();
    let bip32 = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
    let public = derive::derive_public_key(PURPOSE, &seed, &bip32, None).unwrap();
    assert_eq!(
        public.to_base58(),
        "8yxBN79DDMzh37KUi5BDWDTRHdpwxm7znkJFhwKpnXgy"
    );
}

#[test]
fn test_signature_vector() {
    let seed = seed();
    let bip32 = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
    let keypair = derive::derive_keypair(PURPOSE, &seed, &bip32).unwrap();
    let payload = [0u8; 512];
    let signature =
        sign::sign_payload(PURPOSE, SignatureKind::Transaction, &keypair, &payload).unwrap();
    assert_eq!(*signature.as_bytes(), PATH_0_SIGNATURE_OF_ZEROS);
}

#[test]
fn test_bip44_resolves_to_same_key() {
    let seed = seed();
    let via_bip44 = path::resolve(PURPOSE, "bip44:/0'").unwrap();
    let via_bip32 = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
    assert_eq!(via_bip44, via_bip32);
    let public = derive::derive_public_key(PURPOSE, &seed, &via_bip44, None).unwrap();
    assert_eq!(*public.as_bytes(), PATH_0_PUBLIC);
}
