use rand::{Rng, distributions::Alphanumeric, thread_rng};

/// Length of the random part of an order key.
const ORDER_KEY_RANDOM_LEN: usize = 13;

/// Generates a random order key in WooCommerce's `wc_order_` format.
///
/// # Examples
///
/// ```ignore
/// use storefront::crypto::generate_order_key;
///
/// let key = generate_order_key();
/// assert!(key.starts_with("wc_order_"));
/// assert_eq!(key.len(), 22);
/// ```
pub fn generate_order_key() -> String {
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ORDER_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("wc_order_{random}")
}

/// Compares two byte strings in time independent of where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_format() {
        let key = generate_order_key();
        assert!(key.starts_with("wc_order_"));
        assert_eq!(key.len(), "wc_order_".len() + ORDER_KEY_RANDOM_LEN);
        assert!(key["wc_order_".len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_order_keys_are_unique() {
        let keys: std::collections::HashSet<_> = (0..100).map(|_| generate_order_key()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
        assert!(constant_time_eq(b"", b""));
    }
}
