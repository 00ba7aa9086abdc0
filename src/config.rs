use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "verimail")]
#[command(about = "Disposable email domain verification service")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    // Path to the JSON array of known disposable domains
    #[arg(short, long, default_value = "disposable_domains.json")]
    pub domains_file: String,

    // Path to the persisted rate limit counters
    #[arg(long, default_value = "rate_limit_data.json")]
    pub rate_limit_file: String,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 100)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 86400)]
    pub rate_window: u64,

    // Resolve the client IP from X-Forwarded-For (set when behind a reverse proxy)
    #[arg(long)]
    pub trust_proxy: bool,
}
