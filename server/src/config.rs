use anyhow::Context;
use axum::http::StatusCode;
use clap::Parser;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use crate::bridge::{CommandTemplate, Helpers};

#[derive(Parser, Debug)]
#[command(author, version, about = "Directory explorer API server", long_about = None)]
pub struct Args {
    /// Directory to expose; nothing outside it can be reached.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = 9001)]
    pub port: u16,

    /// Front-end assets served for every non-API route.
    #[arg(long, value_name = "DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Turns documents into HTML; its stdout is the response body.
    #[arg(
        long,
        env = "XPLORE_CONVERTER_CMD",
        default_value = "pandoc {path} -t html",
        value_parser = CommandTemplate::parse
    )]
    pub converter: CommandTemplate,

    #[arg(
        long,
        env = "XPLORE_STREAMER_CMD",
        default_value = "DXR_ -n -p {path}",
        value_parser = CommandTemplate::parse
    )]
    pub streamer: CommandTemplate,

    #[arg(
        long,
        env = "XPLORE_OPENER_CMD",
        default_value = "xdg-open {path}",
        value_parser = CommandTemplate::parse
    )]
    pub opener: CommandTemplate,

    /// Status of fire-and-forget acknowledgements; legacy clients expect 250.
    #[arg(
        long,
        env = "XPLORE_ACK_STATUS",
        default_value = "202",
        value_parser = parse_status
    )]
    pub ack_status: StatusCode,
}

/// Everything resolved at startup. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
    pub helpers: Helpers,
    /// Status sent for fire-and-forget acknowledgements.
    pub ack_status: StatusCode,
}

impl ServerConfig {
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(&args.root)
            .with_context(|| format!("cannot resolve root directory {}", args.root.display()))?;

        if !root.is_dir() {
            anyhow::bail!("root path {} is not a directory", root.display());
        }

        Ok(ServerConfig {
            root,
            addr: SocketAddr::new(args.host, args.port),
            static_dir: args.static_dir,
            helpers: Helpers {
                converter: args.converter,
                streamer: args.streamer,
                opener: args.opener,
            },
            ack_status: args.ack_status,
        })
    }
}

fn parse_status(raw: &str) -> anyhow::Result<StatusCode> {
    let code: u16 = raw
        .trim()
        .parse()
        .with_context(|| format!("status is not a number: {:?}", raw))?;
    StatusCode::from_u16(code).with_context(|| format!("invalid status code {}", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("202").unwrap(), StatusCode::ACCEPTED);
        assert_eq!(parse_status(" 250 ").unwrap().as_u16(), 250);
        assert!(parse_status("abc").is_err());
        assert!(parse_status("42").is_err());
    }

    #[test]
    fn root_must_exist_and_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        let args = |root: PathBuf| Args::parse_from(["xplore-server", root.to_str().unwrap()]);

        let cfg = ServerConfig::from_args(args(dir.path().to_path_buf())).unwrap();
        assert_eq!(cfg.root, std::fs::canonicalize(dir.path()).unwrap());

        assert!(ServerConfig::from_args(args(file)).is_err());
        assert!(ServerConfig::from_args(args(dir.path().join("missing"))).is_err());
    }

    #[test]
    fn helpers_and_ack_status_are_flags() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let cfg = ServerConfig::from_args(Args::parse_from([
            "xplore-server",
            root,
            "--opener",
            "open-it {path}",
            "--ack-status",
            "250",
        ]))
        .unwrap();
        assert_eq!(cfg.helpers.opener.program, "open-it");
        assert_eq!(cfg.helpers.opener.args, vec!["{path}"]);
        assert_eq!(cfg.ack_status.as_u16(), 250);

        assert!(Args::try_parse_from(["xplore-server", root, "--ack-status", "nope"]).is_err());
        assert!(Args::try_parse_from(["xplore-server", root, "--streamer", " "]).is_err());
    }
}
