//! Field validators shared by the request types.

use rust_decimal::Decimal;
use std::str::FromStr;

/// 0x-prefixed, 40 hex digits
pub fn validate_eth_address(address: &str) -> Result<(), String> {
    let Some(digits) = address.strip_prefix("0x") else {
        return Err("must start with 0x".to_string());
    };
    if digits.len() != 40 {
        return Err("must be 42 characters (0x + 40 hex digits)".to_string());
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("must contain only hex digits after 0x".to_string());
    }
    Ok(())
}

pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("must be at least {} characters", min));
    }
    if len > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

/// Usernames: alphanumeric plus `_` and `-`
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username is required".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("may contain only letters, digits, `_` and `-`".to_string());
    }
    Ok(())
}

/// Minimal shape check; real verification is out of scope
pub fn validate_email(email: &str) -> Result<(), String> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("must contain `@`".to_string());
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("is not a valid email address".to_string());
    }
    Ok(())
}

/// Token symbols: 2-16 ASCII alphanumerics
pub fn validate_symbol(symbol: &str) -> Result<(), String> {
    validate_length(symbol, 2, 16)?;
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("must contain only letters and digits".to_string());
    }
    Ok(())
}

/// A decimal string that parses and is not negative
pub fn validate_non_negative_decimal(value: &str) -> Result<(), String> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|_| "must be a decimal number".to_string())?;
    if parsed.is_sign_negative() && !parsed.is_zero() {
        return Err("must not be negative".to_string());
    }
    Ok(())
}

/// APY in percent, sane range
pub fn validate_apy(apy: f64) -> Result<(), String> {
    if !apy.is_finite() {
        return Err("must be a finite number".to_string());
    }
    if !(0.0..=10_000.0).contains(&apy) {
        return Err("must be between 0 and 10000".to_string());
    }
    Ok(())
}
