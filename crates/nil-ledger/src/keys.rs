//! Composite ledger keys: a hashed prefix followed by big-endian components

use crate::key_prefix::*;
use nil_types::{Address, Assignment, DealId};

fn key(prefix: &[u8; PREFIX_LEN], parts: &[&[u8]]) -> Vec<u8> {
    let len = PREFIX_LEN + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(prefix);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

pub fn deal(id: DealId) -> Vec<u8> {
    key(&PREFIX_DEAL, &[&id.to_be_bytes()])
}

pub fn deals() -> Vec<u8> {
    PREFIX_DEAL.to_vec()
}

pub fn deal_seq() -> Vec<u8> {
    PREFIX_DEAL_SEQ.to_vec()
}

pub fn provider(address: &Address) -> Vec<u8> {
    key(&PREFIX_PROVIDER, &[address.as_bytes()])
}

pub fn providers() -> Vec<u8> {
    PREFIX_PROVIDER.to_vec()
}

pub fn chain_height() -> Vec<u8> {
    PREFIX_CHAIN_HEIGHT.to_vec()
}

pub fn last_closed_epoch() -> Vec<u8> {
    PREFIX_LAST_CLOSED_EPOCH.to_vec()
}

pub fn epoch_seed(epoch_id: u64) -> Vec<u8> {
    key(&PREFIX_EPOCH_SEED, &[&epoch_id.to_be_bytes()])
}

pub fn credits(epoch_id: u64, deal_id: DealId, assignment: &Assignment) -> Vec<u8> {
    key(
        &PREFIX_CREDITS,
        &[&epoch_id.to_be_bytes(), &deal_id.to_be_bytes(), &assignment.key_bytes()],
    )
}

pub fn synthetic(epoch_id: u64, deal_id: DealId, assignment: &Assignment) -> Vec<u8> {
    key(
        &PREFIX_SYNTHETIC,
        &[&epoch_id.to_be_bytes(), &deal_id.to_be_bytes(), &assignment.key_bytes()],
    )
}

pub fn credit_seen(credit_id: &[u8; 32]) -> Vec<u8> {
    key(&PREFIX_CREDIT_SEEN, &[credit_id])
}

pub fn synthetic_seen(credit_id: &[u8; 32]) -> Vec<u8> {
    key(&PREFIX_SYNTHETIC_SEEN, &[credit_id])
}

pub fn missed(deal_id: DealId, assignment: &Assignment) -> Vec<u8> {
    key(&PREFIX_MISSED, &[&deal_id.to_be_bytes(), &assignment.key_bytes()])
}

pub fn receipt_nonce(deal_id: DealId, file_path: &str) -> Vec<u8> {
    key(&PREFIX_RECEIPT_NONCE, &[&deal_id.to_be_bytes(), file_path.as_bytes()])
}

pub fn provider_failures(deal_id: DealId, address: &Address) -> Vec<u8> {
    key(&PREFIX_PROVIDER_FAILURES, &[&deal_id.to_be_bytes(), address.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_keys_sort_by_id() {
        assert!(deal(1) < deal(2));
        assert!(deal(255) < deal(256));
        assert!(deal(7).starts_with(&deals()));
    }

    #[test]
    fn test_assignment_kinds_do_not_collide() {
        let by_provider = missed(1, &Assignment::Provider(Address::ZERO));
        let by_slot = missed(1, &Assignment::Slot(0));
        assert_ne!(by_provider, by_slot);
    }

    #[test]
    fn test_epoch_scoping() {
        let a = Assignment::Slot(3);
        assert_ne!(credits(1, 9, &a), credits(2, 9, &a));
        assert_ne!(credits(1, 9, &a), synthetic(1, 9, &a));
    }
}
