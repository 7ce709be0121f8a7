use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Arbitrary)]
enum Tier {
    Fast,
    Standard,
    Moh,
    Loh,
}

#[derive(Clone, Debug)]
enum Op {
    Set(u64, u64),
    Get(u64),
    Contains(u64),
}

fn build(tier: Tier, expected: usize, hash_fn: Option<HashFn<u64>>) -> Box<dyn DirectIndexedTable<u64, u64>> {
    let mut options = TableOptions::default();
    options.hash_fn = hash_fn;
    match tier {
        Tier::Fast => Box::new(FastTable::with_options(expected, options).unwrap()),
        Tier::Standard => Box::new(StandardTable::with_options(expected, options).unwrap()),
        Tier::Moh => Box::new(MohTable::with_options(expected, options).unwrap()),
        Tier::Loh => Box::new(LohTable::with_options(expected, options).unwrap()),
    }
}

fn fold_halves(key: u64) -> u64 {
    (key >> 32) ^ key
}

fn key_strategy() -> impl Strategy<Value = u64> + Clone {
    // Mostly a dense range so buckets fill and overflow, plus occasional
    // wide keys that alias low ones under the bucket mask.
    prop_oneof![
        9 => 1u64..4096,
        1 => (1u64..64).prop_map(|k| k << 40 | 7),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        60 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Set(k, v)),
        30 => key.clone().prop_map(Op::Get),
        10 => key.clone().prop_map(Op::Contains),
    ];
    prop::collection::vec(op, 0..=3000)
}

/// Sequences of values that cluster around a few centres, so the array
/// exercises packed slots, fresh checkpoints and restructuring.
fn clustered_values() -> impl Strategy<Value = Vec<u64>> {
    let centres = prop::collection::vec(0u64..(1 << 50), 1..=6);
    centres.prop_flat_map(|centres| {
        let n = centres.len();
        prop::collection::vec((0..n, -70_000i64..70_000), 0..=400).prop_map(move |picks| {
            picks
                .into_iter()
                .map(|(c, offset)| centres[c].saturating_add_signed(offset))
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 20_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_table_equivalence(
        tier in any::<Tier>(),
        expected in 1usize..2048,
        hashed in any::<bool>(),
        ops in ops_strategy(),
    ) {
        let hash_fn = hashed.then_some(fold_halves as HashFn<u64>);
        let mut t = build(tier, expected, hash_fn);
        let mut m: HashMap<u64, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    t.set(key, value).unwrap();
                    m.insert(key, value);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key).unwrap(), m.get(&key));
                }
                Op::Contains(key) => {
                    prop_assert_eq!(t.contains_key(key).unwrap(), m.contains_key(&key));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        prop_assert!(t.num_buckets().is_power_of_two());
        for (key, value) in &m {
            prop_assert_eq!(t.get(*key).unwrap(), Some(value));
        }
    }

    #[test]
    fn prop_compressed_readback(values in clustered_values()) {
        let mut a = CompressedArray::new();
        for &v in &values {
            a.append(v).unwrap();
        }
        a.validate();

        prop_assert_eq!(a.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(a.get(i).unwrap(), v);
        }
        prop_assert_eq!(a.to_vec().unwrap(), values.clone());
        prop_assert_eq!(
            a.get(values.len()),
            Err(Error::IndexOutOfBounds { index: values.len(), len: values.len() })
        );
    }
}

#[test]
fn exhaustive_small_cluster_orders() {
    // Every arrangement of a few values from three far-apart clusters.
    let pool = [10u64, 20, 5_000_000, 5_000_030, 90_000_000, 90_000_005];
    let mut count = 0;
    for_each_permutation(&pool, |order| {
        let mut a = CompressedArray::new();
        for &v in &order {
            a.append(v).unwrap();
        }
        a.validate();
        assert_eq!(a.to_vec().unwrap(), order);
        assert_eq!(a.num_checkpoints(), 3, "order {:?}", order);
        count += 1;
    });
    assert_eq!(count, 720);
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}
