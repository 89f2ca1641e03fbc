//! Request bodies for the write endpoints, one type per operation.

use serde::Deserialize;
use uuid::Uuid;

use super::extractors::{FieldError, Validatable, ValidationBuilder};
use super::{sanitizers, validators};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const EMAIL_MAX: usize = 254;
const LABEL_MAX: usize = 64;
const POOL_NAME_MIN: usize = 2;
const POOL_NAME_MAX: usize = 64;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: Option<String>,
}

impl Validatable for CreateUserRequest {
    fn sanitize(&mut self) {
        self.username = sanitizers::trim(&self.username);
        if let Some(ref email) = self.email {
            let cleaned = email.trim().to_lowercase();
            self.email = if cleaned.is_empty() { None } else { Some(cleaned) };
        }
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut builder = ValidationBuilder::new();
        builder
            .check("username", || {
                validators::validate_length(&self.username, USERNAME_MIN, USERNAME_MAX)
            })
            .check("username", || validators::validate_username(&self.username));
        if let Some(ref email) = self.email {
            builder
                .check("email", || validators::validate_length(email, 3, EMAIL_MAX))
                .check("email", || validators::validate_email(email));
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    pub user_id: Uuid,
    pub address: String,
    pub label: Option<String>,
}

impl Validatable for CreateWalletRequest {
    fn sanitize(&mut self) {
        self.address = sanitizers::normalize_address(&self.address);
        sanitizers::sanitize_label_optional(&mut self.label);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut builder = ValidationBuilder::new();
        builder.check("address", || validators::validate_eth_address(&self.address));
        if let Some(ref label) = self.label {
            builder.check("label", || validators::validate_length(label, 1, LABEL_MAX));
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStakingPositionRequest {
    pub wallet_id: Uuid,
    pub token_symbol: String,
    pub pool_name: String,
    pub amount_staked: String,
    pub rewards_earned: Option<String>,
    pub apy: Option<f64>,
}

impl Validatable for CreateStakingPositionRequest {
    fn sanitize(&mut self) {
        self.token_symbol = sanitizers::normalize_symbol(&self.token_symbol);
        self.pool_name = sanitizers::sanitize_label(&self.pool_name);
        self.amount_staked = sanitizers::trim(&self.amount_staked);
        if let Some(ref rewards) = self.rewards_earned {
            let cleaned = sanitizers::trim(rewards);
            self.rewards_earned = if cleaned.is_empty() { None } else { Some(cleaned) };
        }
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut builder = ValidationBuilder::new();
        builder
            .check("token_symbol", || {
                validators::validate_symbol(&self.token_symbol)
            })
            .check("pool_name", || {
                validators::validate_length(&self.pool_name, POOL_NAME_MIN, POOL_NAME_MAX)
            })
            .check("amount_staked", || {
                validators::validate_non_negative_decimal(&self.amount_staked)
            });
        if let Some(ref rewards) = self.rewards_earned {
            builder.check("rewards_earned", || {
                validators::validate_non_negative_decimal(rewards)
            });
        }
        if let Some(apy) = self.apy {
            builder.check("apy", || validators::validate_apy(apy));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_request(address: &str, label: Option<&str>) -> CreateWalletRequest {
        CreateWalletRequest {
            user_id: Uuid::new_v4(),
            address: address.to_string(),
            label: label.map(String::from),
        }
    }

    #[test]
    fn wallet_address_is_normalized_then_validated() {
        let mut req = wallet_request("  0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B ", Some("  Main\tWallet "));
        req.sanitize();
        assert_eq!(req.address, "0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        assert_eq!(req.label.as_deref(), Some("Main Wallet"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn wallet_rejects_short_address() {
        let mut req = wallet_request("0x1234", None);
        req.sanitize();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors[0].field, "address");
    }

    #[test]
    fn user_requires_username_shape() {
        let mut req = CreateUserRequest {
            username: " al ".to_string(),
            email: Some("ALICE@Example.io ".to_string()),
        };
        req.sanitize();
        assert_eq!(req.email.as_deref(), Some("alice@example.io"));
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn staking_amounts_must_parse() {
        let mut req = CreateStakingPositionRequest {
            wallet_id: Uuid::new_v4(),
            token_symbol: " oec ".to_string(),
            pool_name: "OEC Single Stake".to_string(),
            amount_staked: "not-a-number".to_string(),
            rewards_earned: Some("1.5".to_string()),
            apy: Some(12.5),
        };
        req.sanitize();
        assert_eq!(req.token_symbol, "OEC");
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "amount_staked");
    }

    #[test]
    fn staking_accepts_minimal_body() {
        let mut req = CreateStakingPositionRequest {
            wallet_id: Uuid::new_v4(),
            token_symbol: "ELOQ".to_string(),
            pool_name: "ELOQ Vault".to_string(),
            amount_staked: "1000".to_string(),
            rewards_earned: None,
            apy: None,
        };
        req.sanitize();
        assert!(req.validate().is_ok());
    }
}
