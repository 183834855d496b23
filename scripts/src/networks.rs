//! The networks the contracts are deployed to

use std::fmt::{self, Display};

use alloy_primitives::{address, Address};
use clap::ValueEnum;

/// A known target network
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Network {
    /// A local development node
    Hardhat,
    /// The Goerli testnet
    Goerli,
    /// Ethereum mainnet
    Mainnet,
    /// The Fantom testnet
    FtmTestnet,
    /// BNB Smart Chain
    Bnb,
    /// The BNB Smart Chain testnet
    BnbTest,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Hardhat => write!(f, "hardhat"),
            Network::Goerli => write!(f, "goerli"),
            Network::Mainnet => write!(f, "mainnet"),
            Network::FtmTestnet => write!(f, "ftmTestnet"),
            Network::Bnb => write!(f, "bnb"),
            Network::BnbTest => write!(f, "bnbTest"),
        }
    }
}

/// Everything the pipeline needs to know about a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The name the ledger is scoped under
    pub name: String,
    /// The chain id
    pub chain_id: u64,
    /// The RPC URL used when none is given
    pub default_rpc_url: Option<String>,
    /// A fixed gas price in wei, for networks where estimation is unreliable
    pub gas_price: Option<u128>,
    /// The USDT token address
    pub usdt: Option<Address>,
    /// The Etherscan-compatible explorer API
    pub explorer_api_url: Option<String>,
}

impl Network {
    /// The configuration of this network
    pub fn config(self) -> NetworkConfig {
        let (chain_id, default_rpc_url, gas_price, usdt, explorer_api_url) = match self {
            Network::Hardhat => (
                31337,
                Some("http://127.0.0.1:8545"),
                None,
                Some(address!("fa873c8A5C5F93c6BFac672df089FADc17127b73")),
                None,
            ),
            Network::Goerli => (
                5,
                None,
                None,
                Some(address!("fa873c8A5C5F93c6BFac672df089FADc17127b73")),
                Some("https://api-goerli.etherscan.io/api"),
            ),
            Network::Mainnet => (
                1,
                None,
                None,
                Some(address!("dAC17F958D2ee523a2206206994597C13D831ec7")),
                Some("https://api.etherscan.io/api"),
            ),
            Network::FtmTestnet => (
                4002,
                Some("https://rpc.ankr.com/fantom_testnet"),
                None,
                None,
                Some("https://api-testnet.ftmscan.com/api"),
            ),
            Network::Bnb => (
                56,
                Some("https://bsc-dataseed.binance.org/"),
                Some(5_000_000_000),
                Some(address!("55d398326f99059ff775485246999027b3197955")),
                Some("https://api.bscscan.com/api"),
            ),
            Network::BnbTest => (
                97,
                Some("https://data-seed-prebsc-1-s1.binance.org:8545/"),
                Some(20_000_000_000),
                Some(address!("b2C4502442c9CaF42520b1E4A6767Ba6C550b913")),
                Some("https://api-testnet.bscscan.com/api"),
            ),
        };

        NetworkConfig {
            name: self.to_string(),
            chain_id,
            default_rpc_url: default_rpc_url.map(String::from),
            gas_price,
            usdt,
            explorer_api_url: explorer_api_url.map(String::from),
        }
    }
}
