//! Content identifier derivation.
//!
//! All CIDs in Tessera are CIDv1 with a SHA-2-256 multihash. Blocks use the
//! dag-cbor codec; opaque system records (schema versions) use raw. The
//! codec and hash are fixed across a deployment so that every replica
//! derives the same CID from the same canonical bytes.

use ipld_core::cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

/// Multicodec for DAG-CBOR payloads.
pub const DAG_CBOR: u64 = 0x71;

/// Multicodec for raw byte payloads.
pub const RAW: u64 = 0x55;

/// Derive a CIDv1 over `bytes` with the given codec.
pub fn sha256_cid_v1(codec: u64, bytes: &[u8]) -> Cid {
    Cid::new_v1(codec, Code::Sha2_256.digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bytes_same_cid() {
        assert_eq!(
            sha256_cid_v1(DAG_CBOR, b"payload"),
            sha256_cid_v1(DAG_CBOR, b"payload")
        );
    }

    #[test]
    fn test_codec_is_part_of_the_cid() {
        assert_ne!(
            sha256_cid_v1(DAG_CBOR, b"payload"),
            sha256_cid_v1(RAW, b"payload")
        );
    }

    #[test]
    fn test_cid_shape() {
        let cid = sha256_cid_v1(DAG_CBOR, b"x");
        assert_eq!(cid.version(), ipld_core::cid::Version::V1);
        assert_eq!(cid.codec(), DAG_CBOR);
        assert_eq!(cid.hash().code(), 0x12);
        assert_eq!(cid.hash().size(), 32);
    }
}
