//! Structural merging of YAML values.

use serde_yaml::Value;
use std::collections::BTreeMap;

/// Merge `overlay` into `base`.
///
/// Mappings merge per key recursively, sequences are unioned in first-seen
/// order, and for anything else `overlay` replaces `base`. A `null` overlay
/// leaves an existing value untouched.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Sequence(base_seq), Value::Sequence(overlay_seq)) => {
            union_into(base_seq, overlay_seq);
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Append the items of `extra` that `target` does not already contain.
pub fn union_into<T: PartialEq + Clone>(target: &mut Vec<T>, extra: &[T]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// Merge keyed maps in order; later maps win on conflicting scalar leaves.
pub fn merge_keyed<'a, I>(maps: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = &'a BTreeMap<String, Value>>,
{
    let mut merged: BTreeMap<String, Value> = BTreeMap::new();
    for map in maps {
        for (key, value) in map {
            match merged.get_mut(key) {
                Some(existing) => deep_merge(existing, value),
                None => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn scalars_overlay_wins() {
        let mut base = yaml("max: 1\ntitle-prefix: a");
        deep_merge(&mut base, &yaml("max: 3"));
        assert_eq!(base, yaml("max: 3\ntitle-prefix: a"));
    }

    #[test]
    fn sequences_union_in_order() {
        let mut base = yaml("[ls, cat]");
        deep_merge(&mut base, &yaml("[cat, grep]"));
        assert_eq!(base, yaml("[ls, cat, grep]"));
    }

    #[test]
    fn nested_maps_recurse() {
        let mut base = yaml("github:\n  allowed: [get_issue]\n  read-only: true");
        deep_merge(&mut base, &yaml("github:\n  allowed: [list_issues]"));
        assert_eq!(
            base,
            yaml("github:\n  allowed: [get_issue, list_issues]\n  read-only: true")
        );
    }

    #[test]
    fn null_overlay_keeps_base() {
        let mut base = yaml("allowed: [x]");
        deep_merge(&mut base, &Value::Null);
        assert_eq!(base, yaml("allowed: [x]"));
    }

    #[test]
    fn union_deduplicates() {
        let mut target = vec![1, 2];
        union_into(&mut target, &[2, 3, 1, 4]);
        assert_eq!(target, vec![1, 2, 3, 4]);
    }
}
