pub mod board;
pub mod matchmaking;
pub mod registry;

pub use matchmaking::MatchmakingQueue;
pub use registry::MatchRegistry;

/// EVM addresses compare equal regardless of checksum casing.
pub(crate) fn addr_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_eq_ignores_case_and_whitespace() {
        assert!(addr_eq("0xAbC1", " 0xabc1 "));
        assert!(!addr_eq("0xabc1", "0xabc2"));
    }
}
