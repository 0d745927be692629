use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use pdns_zones::{
    Endpoint, RRSet, Record, Server,
    config::{ClientConfig, normalize_fqdn},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, rename_all = "kebab-case")]
struct Cli {
    /// PowerDNS API URL (e.g. http://127.0.0.1:8081/api/v1)
    #[arg(long, value_name = "URL")]
    api_url: String,
    /// PowerDNS API key
    #[arg(long, value_name = "KEY")]
    api_key: String,
    /// PowerDNS server ID
    #[arg(long, value_name = "ID", default_value = "localhost")]
    server_id: String,
    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// List servers behind the endpoint
    Servers,
    /// List zones of the selected server
    Zones,
    /// Print the RRSets of a zone
    Show { zone: String },
    /// Find the zone a record name belongs to
    Suggest { record: String },
    /// Search zones, records and comments
    Search {
        term: String,
        #[arg(long)]
        max: Option<usize>,
    },
    /// Advance the SOA serial of a zone and save it
    BumpSerial { zone: String },
    /// Add or replace an RRSet
    SetRecord {
        zone: String,
        name: String,
        #[arg(value_name = "TYPE")]
        rtype: String,
        #[arg(long, default_value_t = 3600)]
        ttl: u32,
        #[arg(required = true)]
        content: Vec<String>,
    },
    /// Delete an RRSet
    DeleteRecord {
        zone: String,
        name: String,
        #[arg(value_name = "TYPE")]
        rtype: String,
    },
    /// Write a zone as JSON into a directory
    Backup {
        zone: String,
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = build_client_config(&cli);
    let mut endpoint = Endpoint::from_config(&config)
        .await
        .with_context(|| format!("failed to load servers from {}", config.api_base()))?;

    run(&mut endpoint, &config.server_id, cli.command).await
}

async fn run(endpoint: &mut Endpoint, server_id: &str, command: Command) -> Result<()> {
    if let Command::Servers = command {
        for server in endpoint.servers() {
            println!(
                "{}\t{:?}\t{}\t{} zone(s)",
                server.id(),
                server.daemon_type(),
                server.version(),
                server.zones().len()
            );
        }
        return Ok(());
    }

    let server = endpoint
        .get_server_mut(server_id)
        .ok_or_else(|| anyhow!("unknown server '{server_id}'"))?;
    match command {
        Command::Servers => {}
        Command::Zones => {
            for zone in server.zones() {
                let detail = zone.detail();
                println!(
                    "{}\t{:?}\t{}",
                    zone.name(),
                    detail.kind,
                    detail.serial.map(|s| s.to_string()).unwrap_or_default()
                );
            }
        }
        Command::Show { zone } => {
            let zone = zone_name(&zone)?;
            let zone = server
                .get_zone(&zone)
                .ok_or_else(|| anyhow!("unknown zone '{zone}'"))?;
            for rrset in zone.rrsets() {
                for record in rrset.records() {
                    println!(
                        "{}\t{}\t{}\t{}{}",
                        rrset.name(),
                        rrset.ttl(),
                        rrset.rtype(),
                        record.content,
                        if record.disabled { "\t(disabled)" } else { "" }
                    );
                }
            }
        }
        Command::Suggest { record } => {
            let record = zone_name(&record)?;
            match server.suggest_zone(&record)? {
                Some(zone) => println!("{}", zone.name()),
                None => println!("no zone found for {record}"),
            }
        }
        Command::Search { term, max } => {
            for hit in server.search(&term, max).await? {
                println!("{hit}");
            }
        }
        Command::BumpSerial { zone } => {
            let zone = zone_mut(server, &zone)?;
            let serial = zone.bump_serial(chrono::Local::now().date_naive())?;
            zone.save().await?;
            info!("zone {} now at serial {}", zone.name(), serial);
        }
        Command::SetRecord {
            zone,
            name,
            rtype,
            ttl,
            content,
        } => {
            let zone = zone_mut(server, &zone)?;
            let records = content.into_iter().map(Record::new).collect();
            let rrset = RRSet::new(name, rtype.to_ascii_uppercase(), records).with_ttl(ttl);
            zone.create_records(vec![rrset]).await?;
        }
        Command::DeleteRecord { zone, name, rtype } => {
            let zone = zone_mut(server, &zone)?;
            let rrset = RRSet::new(name, rtype.to_ascii_uppercase(), Vec::new());
            zone.delete_records(vec![rrset]).await?;
        }
        Command::Backup { zone, dir, pretty } => {
            let zone = zone_name(&zone)?;
            let zone = server
                .get_zone(&zone)
                .ok_or_else(|| anyhow!("unknown zone '{zone}'"))?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create backup directory {}", dir.display()))?;
            let path = zone.backup(&dir, None, pretty)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn zone_mut<'a>(server: &'a mut Server, zone: &str) -> Result<&'a mut pdns_zones::Zone> {
    let zone = zone_name(zone)?;
    server
        .get_zone_mut(&zone)
        .ok_or_else(|| anyhow!("unknown zone '{zone}'"))
}

fn zone_name(input: &str) -> Result<String> {
    normalize_fqdn(input).with_context(|| format!("invalid DNS name '{input}'"))
}

fn build_client_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::new(&cli.api_url, &cli.api_key);
    config.server_id = cli.server_id.clone();
    config.timeout = cli.timeout_secs.map(Duration::from_secs);
    config
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
