use account_core::{Address, H256};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "smart-account", version, about = "Sponsored smart-account operations")]
pub struct Args {
    /// Hex private key of the account owner
    #[arg(long, env = "SA_OWNER_KEY", hide_env_values = true, global = true)]
    pub owner_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the owner's smart account address
    Address,
    /// Token balance of the smart account
    Balance {
        /// Token contract
        token: Address,
    },
    /// Approve the router and swap through it
    Swap {
        /// Router contract
        #[arg(long)]
        router: Address,
        /// Token sold
        #[arg(long = "from")]
        token_in: Address,
        /// Token bought
        #[arg(long = "to")]
        token_out: Address,
        /// Amount sold, in display units (e.g. `1.5`)
        amount: String,
        /// Minimum output in display units. Quoted from reserves if omitted.
        #[arg(long)]
        min_out: Option<String>,
        /// Slippage allowed when quoting, in basis points
        #[arg(long, default_value_t = 50)]
        slippage_bps: u64,
    },
    /// Send tokens from the smart account
    Transfer {
        /// Token contract
        token: Address,
        /// Recipient
        to: Address,
        /// Amount in display units
        amount: String,
    },
    /// Mint test tokens to the smart account
    Faucet {
        /// Token contracts to mint
        #[arg(required = true)]
        tokens: Vec<Address>,
        /// Amount per token, in display units
        #[arg(long, default_value = "100")]
        amount: String,
    },
    /// Look up an operation submitted earlier
    Status {
        /// Operation hash
        hash: H256,
    },
}
