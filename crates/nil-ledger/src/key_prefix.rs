//! Ledger key prefix definitions using Blake3 hashing
//!
//! All keys use a consistent 10-byte prefix so that one record family can be
//! range-scanned without touching the others.

/// Fixed prefix length for all ledger keys
pub const PREFIX_LEN: usize = 10;

// Format: First 10 bytes of blake3(prefix_name)

lazy_static::lazy_static! {
    /// Deals: `deal:{deal_id}`
    pub static ref PREFIX_DEAL: [u8; PREFIX_LEN] = hash_prefix(b"deal");

    /// Next deal id counter: `deal_seq`
    pub static ref PREFIX_DEAL_SEQ: [u8; PREFIX_LEN] = hash_prefix(b"deal_seq");

    /// Registered providers: `provider:{address}`
    pub static ref PREFIX_PROVIDER: [u8; PREFIX_LEN] = hash_prefix(b"provider");

    /// Last height seen by the engine: `chain_height`
    pub static ref PREFIX_CHAIN_HEIGHT: [u8; PREFIX_LEN] = hash_prefix(b"chain_height");

    /// Last epoch whose end-of-epoch pass committed: `last_closed_epoch`
    pub static ref PREFIX_LAST_CLOSED_EPOCH: [u8; PREFIX_LEN] = hash_prefix(b"last_closed_epoch");

    /// Epoch seeds: `epoch_seed:{epoch_id}`
    pub static ref PREFIX_EPOCH_SEED: [u8; PREFIX_LEN] = hash_prefix(b"epoch_seed");

    /// Credit counters: `credits:{epoch_id}:{deal_id}:{assignment}`
    pub static ref PREFIX_CREDITS: [u8; PREFIX_LEN] = hash_prefix(b"credits");

    /// Synthetic credit counters: `synthetic:{epoch_id}:{deal_id}:{assignment}`
    pub static ref PREFIX_SYNTHETIC: [u8; PREFIX_LEN] = hash_prefix(b"synthetic");

    /// Credit dedup set: `credit_seen:{credit_id}`
    pub static ref PREFIX_CREDIT_SEEN: [u8; PREFIX_LEN] = hash_prefix(b"credit_seen");

    /// Synthetic dedup set: `synthetic_seen:{credit_id}`
    pub static ref PREFIX_SYNTHETIC_SEEN: [u8; PREFIX_LEN] = hash_prefix(b"synthetic_seen");

    /// Missed epoch counters: `missed:{deal_id}:{assignment}`
    pub static ref PREFIX_MISSED: [u8; PREFIX_LEN] = hash_prefix(b"missed");

    /// Highest accepted receipt nonce: `receipt_nonce:{deal_id}:{file_path}`
    pub static ref PREFIX_RECEIPT_NONCE: [u8; PREFIX_LEN] = hash_prefix(b"receipt_nonce");

    /// Consecutive system proof failures: `provider_failures:{deal_id}:{address}`
    pub static ref PREFIX_PROVIDER_FAILURES: [u8; PREFIX_LEN] = hash_prefix(b"provider_failures");
}

/// Hash a prefix string to a fixed 10-byte array
fn hash_prefix(prefix: &[u8]) -> [u8; PREFIX_LEN] {
    let hash = blake3::hash(prefix);
    let mut result = [0u8; PREFIX_LEN];
    result.copy_from_slice(&hash.as_bytes()[..PREFIX_LEN]);
    result
}

/// Decode a prefix hash back to its name (for debugging/tooling)
pub fn prefix_name(prefix: &[u8; PREFIX_LEN]) -> Option<&'static str> {
    let known: [(&[u8; PREFIX_LEN], &'static str); 13] = [
        (&PREFIX_DEAL, "deal"),
        (&PREFIX_DEAL_SEQ, "deal_seq"),
        (&PREFIX_PROVIDER, "provider"),
        (&PREFIX_CHAIN_HEIGHT, "chain_height"),
        (&PREFIX_LAST_CLOSED_EPOCH, "last_closed_epoch"),
        (&PREFIX_EPOCH_SEED, "epoch_seed"),
        (&PREFIX_CREDITS, "credits"),
        (&PREFIX_SYNTHETIC, "synthetic"),
        (&PREFIX_CREDIT_SEEN, "credit_seen"),
        (&PREFIX_SYNTHETIC_SEEN, "synthetic_seen"),
        (&PREFIX_MISSED, "missed"),
        (&PREFIX_RECEIPT_NONCE, "receipt_nonce"),
        (&PREFIX_PROVIDER_FAILURES, "provider_failures"),
    ];
    known
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, name)| *name)
}
