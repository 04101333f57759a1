//! Property tests for the node configuration surface.

use proptest::prelude::*;

use vigil_node::{NodeConfig, RollupConfig};
use vigil_types::{Address, Amount, Bytes32, GameParams, RollupParams};

fn arb_params() -> impl Strategy<Value = RollupParams> {
    (
        1u64..=i64::MAX as u64,
        1u64..1_000_000,
        0u64..10_000,
        any::<[u8; 20]>(),
        any::<[u8; 32]>(),
        (1u64..1 << 30, 1u64..1 << 20, 1u64..1 << 20, 0u8..=8, 1u64..100_000),
    )
        .prop_map(|(stake, confirm, extra, owner, root, (block, big, small, levels, timeout))| {
            RollupParams {
                base_stake: Amount::new(stake as u128),
                confirm_period_blocks: confirm,
                extra_challenge_time_blocks: extra,
                owner: Address::new(owner),
                wasm_module_root: Bytes32::new(root),
                game: GameParams {
                    block_leaf_size: block,
                    big_step_leaf_size: big,
                    small_step_leaf_size: small,
                    num_big_step_levels: levels,
                    round_timeout_blocks: timeout,
                },
                ..RollupParams::default()
            }
        })
}

proptest! {
    #[test]
    fn rollup_table_round_trips_through_toml(params in arb_params()) {
        let config = NodeConfig {
            rollup: RollupConfig::from_params(&params).unwrap(),
            ..NodeConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&text).unwrap();
        prop_assert_eq!(parsed.rollup.to_params().unwrap(), params);
    }

    #[test]
    fn oversized_stake_is_refused(extra in 1u128..1_000) {
        let params = RollupParams {
            base_stake: Amount::new(i64::MAX as u128 + extra),
            ..RollupParams::dev()
        };
        prop_assert!(RollupConfig::from_params(&params).is_err());
    }
}
