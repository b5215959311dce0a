use clap::Parser;
use rand::Rng;

/// Runtime configuration for a single node process.
#[derive(Parser, Debug, Clone)]
#[command(name = "forge-node")]
#[command(about = "Minimal proof-of-work ledger node")]
pub struct Config {
    /// Host to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Protocol used when contacting peers
    #[arg(long, default_value = "http")]
    pub protocol: String,

    /// Identity credited with mining rewards; generated when absent
    #[arg(long)]
    pub node_id: Option<String>,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured identity, or a fresh random one.
    pub fn node_identity(&self) -> String {
        self.node_id.clone().unwrap_or_else(generate_node_id)
    }
}

/// 32 hex characters, the shape of a dashless UUID4.
fn generate_node_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}
