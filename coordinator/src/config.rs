//! Coordinator configuration.

use std::str::FromStr;

use poolclear_common::{ActorId, Amount};

/// Main coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Node ID (unique per deployment).
    pub node_id: Option<String>,
    /// Exact number of entries every registry submission must carry.
    pub expected_batch_size: usize,
    /// Minimum net amount accepted into custody.
    pub min_net_amount: Amount,
    /// Actor holding the Intake role.
    pub intake_actor: ActorId,
    /// Actor holding the Purge-Authority role.
    pub purge_authority_actor: ActorId,
    /// Log level.
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        // Role holders default to fresh random ids so an unconfigured node
        // denies every caller instead of accepting a well-known identity.
        Self {
            node_id: None,
            expected_batch_size: 100,
            min_net_amount: Amount::from_units(900),
            intake_actor: ActorId::new(),
            purge_authority_actor: ActorId::new(),
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(node_id) = std::env::var("POOLCLEAR_NODE_ID") {
            config.node_id = Some(node_id);
        }

        if let Ok(size) = std::env::var("POOLCLEAR_BATCH_SIZE") {
            if let Ok(size) = size.parse() {
                config.expected_batch_size = size;
            }
        }

        if let Ok(amount) = std::env::var("POOLCLEAR_MIN_NET_AMOUNT") {
            if let Ok(amount) = Amount::from_str(&amount) {
                config.min_net_amount = amount;
            }
        }

        if let Ok(actor) = std::env::var("POOLCLEAR_INTAKE_ACTOR") {
            if let Ok(actor) = ActorId::parse(&actor) {
                config.intake_actor = actor;
            }
        }

        if let Ok(actor) = std::env::var("POOLCLEAR_PURGE_AUTHORITY_ACTOR") {
            if let Ok(actor) = ActorId::parse(&actor) {
                config.purge_authority_actor = actor;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.expected_batch_size == 0 {
            return Err("Expected batch size cannot be 0".to_string());
        }

        if self.min_net_amount.is_zero() {
            return Err("Minimum net amount cannot be zero".to_string());
        }

        if self.intake_actor.is_nil() {
            return Err("Intake actor cannot be the nil id".to_string());
        }

        if self.purge_authority_actor.is_nil() {
            return Err("Purge authority actor cannot be the nil id".to_string());
        }

        Ok(())
    }
}
