use std::net::{IpAddr, Ipv4Addr};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))]
    pub(crate) listen: IpAddr,
    /// (TCP) port to listen on.
    #[arg(short, long, default_value_t = 3000)]
    pub(crate) port: u16,
    /// SQLite database backing the /data endpoint.
    #[arg(long, default_value = "sqlite://overdue.db?mode=rwc")]
    pub(crate) database: String,
    /// Load from and persist to this server's /data endpoint instead of the
    /// local database.
    #[arg(long)]
    pub(crate) persist_url: Option<String>,
    /// Minutes between clock refreshes.
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) tick_minutes: u64,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
}
