//! CPF (Brazilian individual taxpayer number) check-digit validation.
//!
//! A CPF has nine base digits followed by two modulo-11 check digits.
//! Sequences made of a single repeated digit pass the checksum but are
//! not issued, so they are rejected as well.

pub const CPF_LEN: usize = 11;

/// Strips every non-digit character, so `529.982.247-25` becomes `52998224725`.
pub fn normalize(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid(input: &str) -> bool {
    let digits: Vec<u32> = normalize(input)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != CPF_LEN {
        return false;
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Formats a CPF with the usual `000.000.000-00` mask.
///
/// Returns `None` unless the input holds exactly eleven digits. The
/// checksum is not verified here.
pub fn format(input: &str) -> Option<String> {
    let digits = normalize(input);
    if digits.len() != CPF_LEN {
        return None;
    }

    Some(format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    ))
}

fn check_digit(digits: &[u32]) -> u32 {
    let top_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top_weight - i as u32))
        .sum();

    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}
