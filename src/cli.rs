use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cipulse")]
#[command(author, version, about = "Prometheus exporter for GitLab CI pipeline status", long_about = None)]
pub struct Cli {
    /// Address the metrics endpoint listens on
    #[arg(
        short,
        long,
        env = "CIPULSE_LISTEN_ADDRESS",
        default_value = "0.0.0.0:8080"
    )]
    pub listen_address: SocketAddr,

    /// Config file path
    #[arg(short, long, env = "CIPULSE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["cipulse"]);
        assert_eq!(cli.listen_address.port(), 8080);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_explicit_flags() {
        let cli = Cli::parse_from([
            "cipulse",
            "--listen-address",
            "127.0.0.1:9100",
            "--config",
            "/etc/cipulse.yml",
        ]);
        assert_eq!(cli.listen_address.to_string(), "127.0.0.1:9100");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/cipulse.yml")));
    }
}
