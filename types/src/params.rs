//! Chain-wide constants.

/// Maximum size of the extra-data field a miner may put in a header.
pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

/// Number of blocks covered by one bloom-bits section.
pub const BLOOM_BITS_BLOCKS: u64 = 4096;

/// Number of bits in a header bloom filter.
pub const BLOOM_BIT_LENGTH: u32 = 2048;

/// Gas limit of a default genesis block.
pub const GENESIS_GAS_LIMIT: u64 = 4_712_388;

/// Difficulty of a default genesis block.
pub const GENESIS_DIFFICULTY: u64 = 131_072;

/// Lowest difficulty the proof-of-work engine will produce.
pub const MINIMUM_DIFFICULTY: u64 = 131_072;

pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 8;
pub const VERSION_PATCH: u32 = 2;

/// Client name embedded in default extra data.
pub const CLIENT_NAME: &str = "huc";

/// Packed version number: `major << 16 | minor << 8 | patch`.
pub const fn packed_version() -> u32 {
    VERSION_MAJOR << 16 | VERSION_MINOR << 8 | VERSION_PATCH
}
