//! Identifier generation for accounts, cards and ledger entries.
//!
//! All functions here are pure candidate generators. Uniqueness against the
//! store is enforced by the caller: candidates are inserted with
//! `ON CONFLICT DO NOTHING` inside the owning transaction and regenerated
//! until a row actually lands. Collision probability is astronomically low
//! given the value spaces, so the retry loops are unbounded.

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;

const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const ACCOUNT_NUMBER_LEN: usize = 10;
pub const CARD_NUMBER_LEN: usize = 16;
pub const CARD_YEARS_VALID: u32 = 5;

/// Random fixed-length digit string used as the external account number.
pub fn account_number(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect()
}

/// Random Albanian-format IBAN: `AL` + 2 digits + 4 letters + 20 alphanumerics.
///
/// Format-only: the two digits are random, not a mod-97 checksum. This
/// matches the identifiers already in production data and is deliberately
/// not standards-compliant.
pub fn iban() -> String {
    let mut rng = rand::thread_rng();
    let checksum: String = (0..2).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
    let bank: String = (0..4)
        .map(|_| char::from(UPPER[rng.gen_range(0..UPPER.len())]))
        .collect();
    let account: String = (0..20)
        .map(|_| char::from(UPPER_ALNUM[rng.gen_range(0..UPPER_ALNUM.len())]))
        .collect();
    format!("AL{}{}{}", checksum, bank, account)
}

/// Luhn checksum over the card number payload (all digits except the check
/// digit): walking right to left, every second digit (index 1, 3, 5, ...)
/// is doubled, minus 9 when the double exceeds 9; result is the digit sum
/// mod 10.
pub fn luhn_checksum(digits: &[u8]) -> u8 {
    let mut sum: u32 = 0;
    for (i, &digit) in digits.iter().rev().enumerate() {
        let mut d = digit as u32;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    (sum % 10) as u8
}

/// Check digit that completes a payload to a full card number.
pub fn luhn_check_digit(payload: &[u8]) -> u8 {
    let checksum = luhn_checksum(payload);
    if checksum == 0 { 0 } else { 10 - checksum }
}

/// Generate a card number with the given network prefix; the final digit is
/// the Luhn check digit over the preceding digits.
pub fn card_number(prefix: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut digits: Vec<u8> = prefix.to_vec();
    while digits.len() < len - 1 {
        digits.push(rng.gen_range(0..10));
    }
    digits.push(luhn_check_digit(&digits));
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

/// 16-digit Visa card number (prefix 4).
pub fn visa_card_number() -> String {
    card_number(&[4], CARD_NUMBER_LEN)
}

/// Verify a full card number by recomputing its check digit.
pub fn is_luhn_valid(number: &str) -> bool {
    let digits: Option<Vec<u8>> = number
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect();
    let Some(digits) = digits else {
        return false;
    };
    let Some((&check, payload)) = digits.split_last() else {
        return false;
    };
    !payload.is_empty() && luhn_check_digit(payload) == check
}

/// Random 3-digit CVV.
pub fn cvv() -> String {
    rand::thread_rng().gen_range(100..=999).to_string()
}

/// Card expiry: now plus a random whole-month offset in
/// `[1, years_valid * 12]`, with a month approximated as 30 days.
pub fn expiry_date(years_valid: u32) -> NaiveDate {
    let months = rand::thread_rng().gen_range(1..=years_valid * 12) as i64;
    (Utc::now() + Duration::days(months * 30)).date_naive()
}

/// Ledger entry id: `{prefix}-{YYYYMMDDHHMMSS}-{8 random alphanumerics}`.
pub fn transaction_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..8)
        .map(|_| char::from(UPPER_ALNUM[rng.gen_range(0..UPPER_ALNUM.len())]))
        .collect();
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    format!("{}-{}-{}", prefix, timestamp, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_account_number_format() {
        let n = account_number(ACCOUNT_NUMBER_LEN);
        assert_eq!(n.len(), 10);
        assert!(n.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_iban_format() {
        let iban = iban();
        assert_eq!(iban.len(), 28);
        assert!(iban.starts_with("AL"));
        assert!(iban[2..4].chars().all(|c| c.is_ascii_digit()));
        assert!(iban[4..8].chars().all(|c| c.is_ascii_uppercase()));
        assert!(iban[8..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_luhn_checksum_known_value() {
        // Payload 7-9-9-2-7-3-9-8-7-1: doubling index 1,3,5,7,9 from the
        // right gives 5+9+5+9+5 plus 1+8+3+2+9 undoubled = 56.
        let payload = [7, 9, 9, 2, 7, 3, 9, 8, 7, 1];
        assert_eq!(luhn_checksum(&payload), 6);
        assert_eq!(luhn_check_digit(&payload), 4);
    }

    #[test]
    fn test_luhn_check_digit_zero_case() {
        // Payload [9, 1]: 9 doubled -> 18 -> 9, plus 1 = 10; checksum 0.
        assert_eq!(luhn_checksum(&[9, 1]), 0);
        assert_eq!(luhn_check_digit(&[9, 1]), 0);
    }

    #[test]
    fn test_generated_card_numbers_pass_luhn() {
        for _ in 0..200 {
            let number = visa_card_number();
            assert_eq!(number.len(), 16);
            assert!(number.starts_with('4'));
            assert!(is_luhn_valid(&number), "card {} failed Luhn", number);
        }
    }

    #[test]
    fn test_is_luhn_valid_rejects_mutations() {
        let number = visa_card_number();
        let mut digits: Vec<u8> = number.bytes().map(|b| b - b'0').collect();
        // Flip the check digit.
        let last = digits.len() - 1;
        digits[last] = (digits[last] + 1) % 10;
        let mutated: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        assert!(!is_luhn_valid(&mutated));

        assert!(!is_luhn_valid(""));
        assert!(!is_luhn_valid("4"));
        assert!(!is_luhn_valid("4111-1111"));
    }

    #[test]
    fn test_cvv_range() {
        for _ in 0..50 {
            let v: u32 = cvv().parse().unwrap();
            assert!((100..=999).contains(&v));
        }
    }

    #[test]
    fn test_expiry_date_range() {
        let today = Utc::now().date_naive();
        for _ in 0..50 {
            let expiry = expiry_date(CARD_YEARS_VALID);
            let days = (expiry - today).num_days();
            assert!(days >= 29, "expiry {} too close", expiry);
            assert!(days <= 5 * 12 * 30 + 1, "expiry {} too far", expiry);
        }
    }

    #[test]
    fn test_transaction_id_format_and_uniqueness() {
        let id = transaction_id("TXN");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));

        let ids: HashSet<String> = (0..1000).map(|_| transaction_id("TXN")).collect();
        assert_eq!(ids.len(), 1000);
    }
}
