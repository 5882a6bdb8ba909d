//! Property key order
//!
//! Objects enumerate their array-index keys first, in ascending numeric order,
//! then every other key in insertion order. Trees, enumeration key sets and
//! shadow-run objects all follow this so extraction sees keys the way the
//! runtime does.

/// `key` as an array index: a canonical decimal below `u32::MAX`
pub fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Position at which a new `key` goes among `keys` already in property order
pub fn insertion_point<'a, I>(keys: I, key: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let index = array_index(key)?;
    let mut count = 0;
    for existing in keys {
        match array_index(existing) {
            Some(other) if other < index => count += 1,
            _ => return Some(count),
        }
    }
    Some(count)
}

/// Reorder keys collected in insertion order into property order
pub fn sort_keys(keys: &mut [String]) {
    keys.sort_by_key(|k| array_index(k).map_or((1, 0), |i| (0, i)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("+1"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("md"), None);
    }

    #[test]
    fn test_index_keys_come_first() {
        let mut keys: Vec<String> = ["b", "2", "a", "1", "10"].iter().map(|k| k.to_string()).collect();
        sort_keys(&mut keys);
        assert_eq!(keys, vec!["1", "2", "10", "b", "a"]);
    }

    #[test]
    fn test_insertion_point() {
        let keys: Vec<String> = ["1", "3", "b"].iter().map(|k| k.to_string()).collect();
        assert_eq!(insertion_point(&keys, "2"), Some(1));
        assert_eq!(insertion_point(&keys, "0"), Some(0));
        assert_eq!(insertion_point(&keys, "7"), Some(2));
        assert_eq!(insertion_point(&keys, "c"), None);
    }
}
