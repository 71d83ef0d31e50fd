//! Fixed byte-layout constants shared by every component.
//!
//! These values are part of the on-disk and on-chain format and must match
//! across implementations.

/// Size of one storage unit (MDU) in bytes: 8 MiB
pub const UNIT_SIZE: usize = 8 * 1024 * 1024;

/// Size of one chunk (blob) in bytes: 128 KiB
pub const CHUNK_SIZE: usize = 128 * 1024;

/// Chunks per unit
pub const CHUNKS_PER_UNIT: usize = UNIT_SIZE / CHUNK_SIZE;

/// Manifest, witness and chunk commitments
pub const COMMITMENT_SIZE: usize = 48;

/// Merkle nodes, unit roots and evaluation scalars
pub const SCALAR_SIZE: usize = 32;

/// Provider/owner address length
pub const ADDRESS_LEN: usize = 20;

/// Base replication factor; erasure-coded K+M may not exceed it
pub const BASE_REPLICATION: u64 = 12;

/// Denominator for all basis-point parameters
pub const BPS_DENOMINATOR: u64 = 10_000;
