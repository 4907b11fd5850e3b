/// Exact multiset equality of two import lists; order is irrelevant,
/// duplicates count.
pub fn imports_match(candidate: &[String], current: &[String]) -> bool {
    if candidate.len() != current.len() {
        return false;
    }
    let mut candidate: Vec<&str> = candidate.iter().map(String::as_str).collect();
    let mut current: Vec<&str> = current.iter().map(String::as_str).collect();
    candidate.sort_unstable();
    current.sort_unstable();
    candidate == current
}
