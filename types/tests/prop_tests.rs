use proptest::prelude::*;

use huc_types::{Address, BlockRef, ChainConfig, Hash};

fn homestead_config(block: Option<u64>) -> ChainConfig {
    ChainConfig {
        homestead_block: block,
        ..ChainConfig::all_forks(9)
    }
}

proptest! {
    /// Hash display/parse roundtrip.
    #[test]
    fn hash_display_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash::new(bytes);
        let parsed: Hash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Address bincode roundtrip uses the compact byte form.
    #[test]
    fn address_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes[..20]);
        let address = Address::new(raw);
        let encoded = bincode::serialize(&address).unwrap();
        let decoded: Address = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, address);
    }

    /// Numbered references survive display/parse.
    #[test]
    fn numbered_ref_roundtrip(n in 0u64..u64::MAX) {
        let r = BlockRef::Numbered(n);
        prop_assert_eq!(r.to_string().parse::<BlockRef>().unwrap(), r);
    }

    /// A rewind target never exceeds the head it was computed against, and
    /// the configuration is compatible with itself at the rewound height.
    #[test]
    fn rewind_target_is_below_head(
        stored in prop::option::of(0u64..1_000),
        new in prop::option::of(0u64..1_000),
        head in 0u64..1_000,
    ) {
        let old_cfg = homestead_config(stored);
        let new_cfg = homestead_config(new);
        if let Err(err) = old_cfg.check_compatible(&new_cfg, head) {
            prop_assert!(err.rewind_to <= head);
            prop_assert!(stored != new);
        }
    }

    /// Compatibility is reflexive at every height.
    #[test]
    fn config_compatible_with_itself(block in prop::option::of(0u64..1_000), head in 0u64..2_000) {
        let cfg = homestead_config(block);
        prop_assert!(cfg.check_compatible(&cfg.clone(), head).is_ok());
    }
}
