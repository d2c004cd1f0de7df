use clap::Parser;

/// Number of leading `'0'` hex characters a mined block hash must carry
pub const MINING_DIFFICULTY: usize = 3;

/// Sender identity of ledger-issued reward transactions
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Value paid to the ledger's reward address for each mined block
pub const MINING_REWARD: f64 = 1.0;

/// What happens to the transaction pool once a block has been mined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolPolicy {
    /// Transactions captured by the new block leave the pool
    #[default]
    ClearAfterMining,

    /// The pool is left untouched, so its transactions are repeated in every
    /// later block. Only useful for compatibility with chains built that way.
    Retain,
}

/// Tunable parameters of a ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Mining difficulty (number of leading zero hex characters)
    pub difficulty: usize,

    /// Mining reward
    pub mining_reward: f64,

    /// Pool lifecycle after mining
    pub pool_policy: PoolPolicy,

    /// Reject transfers that exceed the sender's on-chain balance
    pub enforce_balance: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: MINING_DIFFICULTY,
            mining_reward: MINING_REWARD,
            pool_policy: PoolPolicy::default(),
            enforce_balance: false,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mining_reward(mut self, mining_reward: f64) -> Self {
        self.mining_reward = mining_reward;
        self
    }

    pub fn with_pool_policy(mut self, pool_policy: PoolPolicy) -> Self {
        self.pool_policy = pool_policy;
        self
    }

    pub fn with_enforce_balance(mut self, enforce_balance: bool) -> Self {
        self.enforce_balance = enforce_balance;
        self
    }
}

/// Command line / environment configuration of the ledger server
#[derive(Debug, Clone, Parser)]
#[command(name = "pow_ledger", version, about = "Proof-of-work ledger server")]
pub struct ServerConfig {
    /// Interface to bind the HTTP server to
    #[arg(long, env = "LEDGER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port number for the ledger server
    #[arg(long, env = "LEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Leading zero hex characters required of a block hash
    #[arg(long, env = "LEDGER_DIFFICULTY", default_value_t = MINING_DIFFICULTY)]
    pub difficulty: usize,

    /// Reward paid for each mined block
    #[arg(long, env = "LEDGER_REWARD", default_value_t = MINING_REWARD)]
    pub reward: f64,

    /// Keep pooled transactions after mining instead of clearing them
    #[arg(long, env = "LEDGER_RETAIN_POOL")]
    pub retain_pool: bool,

    /// Reject transfers that exceed the sender's balance
    #[arg(long, env = "LEDGER_ENFORCE_BALANCE")]
    pub enforce_balance: bool,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, env = "LEDGER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Builds the ledger configuration selected by the flags
    pub fn ledger_config(&self) -> LedgerConfig {
        let pool_policy = if self.retain_pool {
            PoolPolicy::Retain
        } else {
            PoolPolicy::ClearAfterMining
        };

        LedgerConfig::default()
            .with_difficulty(self.difficulty)
            .with_mining_reward(self.reward)
            .with_pool_policy(pool_policy)
            .with_enforce_balance(self.enforce_balance)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ledger_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.difficulty, 3);
        assert_eq!(config.mining_reward, 1.0);
        assert_eq!(config.pool_policy, PoolPolicy::ClearAfterMining);
        assert!(!config.enforce_balance);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::parse_from(["pow_ledger"]);

        assert_eq!(config.port, 5000);
        assert_eq!(config.ledger_config(), LedgerConfig::default());
    }

    #[test]
    fn test_server_config_flags() {
        let config = ServerConfig::parse_from([
            "pow_ledger",
            "--port",
            "5001",
            "--difficulty",
            "2",
            "--reward",
            "12.5",
            "--retain-pool",
        ]);

        let ledger = config.ledger_config();
        assert_eq!(config.bind_address().1, 5001);
        assert_eq!(ledger.difficulty, 2);
        assert_eq!(ledger.mining_reward, 12.5);
        assert_eq!(ledger.pool_policy, PoolPolicy::Retain);
    }
}
