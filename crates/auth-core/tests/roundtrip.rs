//! Property 5: for every `Group`/`TokenRecord`, serializing and
//! deserializing reproduces the original value exactly.

use auth_core::models::{Group, TokenRecord, TokenStatus};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_timestamp() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    // Seconds since epoch, clamped to a range `Utc.timestamp_opt` always accepts.
    (0i64..4_102_444_800i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

fn arb_group() -> impl Strategy<Value = Group> {
    (
        arb_uuid(),
        arb_name(),
        proptest::option::of(".{0,40}"),
        any::<bool>(),
        arb_timestamp(),
        proptest::option::of(arb_timestamp()),
        any::<bool>(),
    )
        .prop_map(
            |(id, name, description, is_active, created_at, defunct_at, is_reserved)| Group {
                id,
                name,
                description,
                is_active,
                created_at,
                defunct_at,
                is_reserved,
            },
        )
}

fn arb_token_status() -> impl Strategy<Value = TokenStatus> {
    prop_oneof![Just(TokenStatus::Active), Just(TokenStatus::Revoked)]
}

fn arb_token_record() -> impl Strategy<Value = TokenRecord> {
    (
        arb_uuid(),
        proptest::option::of(arb_name()),
        proptest::collection::vec(arb_name(), 0..5),
        arb_token_status(),
        arb_timestamp(),
        proptest::option::of(arb_timestamp()),
        proptest::option::of(arb_timestamp()),
        proptest::option::of(".{0,40}"),
    )
        .prop_map(
            |(id, name, groups, status, created_at, expires_at, revoked_at, fingerprint)| {
                TokenRecord {
                    id,
                    name,
                    groups,
                    status,
                    created_at,
                    expires_at,
                    revoked_at,
                    fingerprint,
                }
            },
        )
}

proptest! {
    #[test]
    fn group_round_trips_through_json(group in arb_group()) {
        let bytes = serde_json::to_vec(&group).unwrap();
        let back: Group = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(group, back);
    }

    #[test]
    fn token_record_round_trips_through_json(record in arb_token_record()) {
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: TokenRecord = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(record, back);
    }
}
