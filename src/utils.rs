use eyre::{eyre, OptionExt};

/// Parses a byte count such as `4096`, `64K`, `10MiB` or `1g`. Suffixes are
/// powers of 1024.
pub fn parse_size(size: &str) -> eyre::Result<u64> {
    let size = size.trim();
    let split = size
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(size.len());
    let (digits, unit) = size.split_at(split);

    if digits.is_empty() {
        return Err(eyre!("'{}' does not start with a number", size));
    }
    let value: u64 = digits.parse()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        other => return Err(eyre!("unknown size unit '{}'", other)),
    };

    value
        .checked_mul(multiplier)
        .ok_or_eyre("size does not fit in 64 bits")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_bytes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size(" 91 ").unwrap(), 91);
    }

    #[test]
    fn parses_binary_suffixes() {
        assert_eq!(parse_size("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_size("10MiB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1g").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("3 mb").unwrap(), 3 * 1024 * 1024);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MiB").is_err());
        assert!(parse_size("12 parsecs").is_err());
        assert!(parse_size("99999999999999999999G").is_err());
        assert!(parse_size("17179869184G").is_err());
    }
}
