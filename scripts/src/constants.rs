//! Constants used in the deploy scripts

/// The suffix appended to a proxied component's public name to form the
/// ledger key of its logic (implementation) instance
pub const IMPLEMENTATION_SUFFIX: &str = "_Implementation";

/// The extension of a ledger record file
pub const LEDGER_RECORD_EXTENSION: &str = "json";

/// The extension of a partially-written ledger record
pub const LEDGER_TMP_EXTENSION: &str = "json.tmp";

/// The file in a network's ledger directory holding the chain id
pub const CHAIN_ID_FILE: &str = ".chainId";

/// The default root directory of the deployments ledger
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// The default root directory of the compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The suffix of Hardhat debug files that sit next to each artifact
pub const DBG_FILE_SUFFIX: &str = ".dbg.json";

/// The name of the directory holding Hardhat / Foundry build info
pub const BUILD_INFO_DIR: &str = "build-info";

/// The default number of seconds to wait for a transaction receipt
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// The default number of confirmations to wait for
pub const DEFAULT_NUM_CONFIRMATIONS: u64 = 1;

/// The name of the proxy upgrade method on UUPS logic contracts
pub const UPGRADE_FUNCTION: &str = "upgradeToAndCall";

// --------------
// | Components |
// --------------

/// The ledger key and artifact name of the membership pass token
pub const PASS_COMPONENT: &str = "MyDanPass";

/// The public ledger key and logic artifact name of the application contract
pub const APP_COMPONENT: &str = "MyDanDefi";

/// The artifact name of the application's upgradeable proxy
pub const APP_PROXY_ARTIFACT: &str = "MyDanDefiProxy";

/// The application's initializer
pub const APP_INIT_FUNCTION: &str = "initialize";

/// The pass token method granting mint rights
pub const SET_MINTER_FUNCTION: &str = "setMinter";

/// The application method setting lock durations and their bonus rates
pub const SET_DURATIONS_FUNCTION: &str = "setDurations";

/// The application method appending a membership tier
pub const INSERT_TIER_FUNCTION: &str = "insertTier";

/// The application method setting the assets-under-management cap
pub const SET_AUM_CAP_FUNCTION: &str = "setAumCap";

/// The application method setting the referral bonus schedule
pub const SET_REFERRAL_RATES_FUNCTION: &str = "setReferralBonusRates";

// --------
// | Tags |
// --------

/// Tag of the pass token deployment
pub const PASS_TAG: &str = "pass";

/// Tag of the core deployment steps
pub const MAIN_TAG: &str = "main";

/// Tag of the post-deployment configuration steps
pub const SETUP_TAG: &str = "setup";

/// Tag of the source verification step
pub const VERIFY_TAG: &str = "verify";

// -------------
// | Etherscan |
// -------------

/// The code format used when submitting standard-JSON sources
pub const ETHERSCAN_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The `status` value Etherscan-compatible APIs report on success
pub const ETHERSCAN_OK_STATUS: &str = "1";
