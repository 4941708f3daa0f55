/// Default group size for membership (`in`) queries.
///
/// Matches the backend's limit on the number of values accepted by a single
/// `in` filter.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Splits `items` into consecutive groups of at most `size` elements.
///
/// Every element lands in exactly one group and relative order is preserved;
/// only the last group may be shorter than `size`. An empty input or a `size`
/// of zero yields no groups at all rather than an error.
///
/// ```
/// use firekit::util::chunk;
///
/// let ids = ["a", "b", "c"];
/// assert_eq!(chunk(&ids, 2), vec![vec!["a", "b"], vec!["c"]]);
/// assert!(chunk(&ids, 0).is_empty());
/// ```
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if items.is_empty() || size < 1 {
        return Vec::new();
    }
    items.chunks(size).map(<[T]>::to_vec).collect()
}
