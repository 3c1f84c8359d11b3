//! Case conversion between host attribute names and remote field names
//!
//! The host uses snake_case (e.g., `database_character_set`, `cpu_count`)
//! The remote uses PascalCase (e.g., `DatabaseCharacterSet`, `CPUCount`)
//!
//! Acronyms stay whole in both directions: `internal_ip_address` <-> `InternalIPAddress`.

/// Words written fully upper-case on the remote side
const ACRONYMS: &[&str] = &["CPU", "GB", "IP", "NAT", "NIC"];

/// Convert snake_case to PascalCase
/// e.g., "database_character_set" -> "DatabaseCharacterSet", "nic_id" -> "NICId"
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let upper = part.to_ascii_uppercase();
            if ACRONYMS.contains(&upper.as_str()) {
                return upper;
            }
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Convert PascalCase to snake_case
/// e.g., "ServiceZoneId" -> "service_zone_id", "CPUCount" -> "cpu_count"
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // word boundary, or the last capital of an acronym run starting a new word
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                result.push('_');
            }
        }
        result.extend(c.to_lowercase());
    }
    result
}
