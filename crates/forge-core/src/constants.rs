/// Hex prefix a proof digest must carry. Four hex characters means
/// roughly 65536 attempts per block on average.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Sender recorded on mining reward transactions.
pub const REWARD_SENDER: &str = "0";
