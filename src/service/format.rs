/// Reverses the characters of `s`
///
/// Works on Unicode scalar values, so multi-byte characters stay intact.
pub fn reverse_string(s: &str) -> String {
    s.chars().rev().collect()
}
