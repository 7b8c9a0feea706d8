use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use snmp_client::{
    AuthProtocolId, Client, ClientConfig, Credentials, ObjectIdentifier, PrivProtocolId, TrapListener, Value,
};

mod config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "snmp-cli", version, about = "SNMP v1/v2c/v3 client front end")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./snmp-cli.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target host or IP
    #[arg(long, global = true)]
    host: Option<String>,
    /// Agent UDP port
    #[arg(long, global = true)]
    port: Option<u16>,
    /// v1/v2c community string
    #[arg(long, global = true, default_value = "public")]
    community: String,
    /// Use SNMPv1 instead of v2c
    #[arg(long, global = true, default_value_t = false)]
    v1: bool,
    /// v3 user name (selects v3 over v1/v2c)
    #[arg(long, global = true)]
    v3_user: Option<String>,
    /// v3 auth protocol
    #[arg(long, global = true, value_enum)]
    v3_auth_proto: Option<AuthProto>,
    /// v3 auth password
    #[arg(long, global = true)]
    v3_auth_pass: Option<String>,
    /// v3 privacy protocol
    #[arg(long, global = true, value_enum)]
    v3_priv_proto: Option<PrivProto>,
    /// v3 privacy password
    #[arg(long, global = true)]
    v3_priv_pass: Option<String>,
    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Retries per request
    #[arg(long, global = true)]
    retries: Option<u32>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum AuthProto {
    Md5,
    Sha1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum PrivProto {
    Des,
    Aes,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// GET one or more OIDs
    Get { oids: Vec<String> },
    /// Walk a subtree with GETNEXT
    Walk { base_oid: String },
    /// Walk a subtree with GETBULK
    Bulkwalk {
        base_oid: String,
        #[arg(long, default_value_t = 10)]
        bulk_size: u32,
    },
    /// Walk a table and pivot rows by their index suffix
    Table { base_oid: String },
    /// Listen for incoming traps
    Listen {
        #[arg(long, default_value_t = 162)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let loaded_cfg = config::load_config(cli.config.as_deref());

    let host = cli
        .host
        .or_else(|| loaded_cfg.as_ref().and_then(|c| c.host.clone()))
        .ok_or_else(|| anyhow!("provide --host or set `host` in the config file"))?;
    let port = cli.port.or_else(|| loaded_cfg.as_ref().and_then(|c| c.port)).unwrap_or(161);
    let community = loaded_cfg
        .as_ref()
        .and_then(|c| c.community.clone())
        .filter(|_| cli.community == "public")
        .unwrap_or(cli.community);
    let timeout_ms = cli.timeout_ms.or_else(|| loaded_cfg.as_ref().and_then(|c| c.timeout_ms));
    let retries = cli.retries.or_else(|| loaded_cfg.as_ref().and_then(|c| c.retries));

    let credentials = build_credentials(&cli, &community)?;

    let mut builder = ClientConfig::builder(host, credentials).port(port);
    if let Some(ms) = timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if let Some(r) = retries {
        builder = builder.retries(r);
    }
    let client = Client::new(builder.build());

    match cli.command {
        Commands::Get { oids } => {
            let oids: Vec<ObjectIdentifier> = oids.iter().map(|s| parse_oid(s)).collect::<Result<_>>()?;
            let results = client.multiget(&oids).await.context("get failed")?;
            print_pairs(&results, cli.format);
        }
        Commands::Walk { base_oid } => {
            let base = parse_oid(&base_oid)?;
            let mut rx = client.walk(base);
            let mut results = Vec::new();
            while let Some(item) = rx.recv().await {
                results.push(item.context("walk failed")?);
            }
            print_pairs(&results, cli.format);
        }
        Commands::Bulkwalk { base_oid, bulk_size } => {
            let base = parse_oid(&base_oid)?;
            let mut rx = client.bulkwalk(vec![base], bulk_size);
            let mut results = Vec::new();
            while let Some(item) = rx.recv().await {
                results.push(item.context("bulkwalk failed")?);
            }
            print_pairs(&results, cli.format);
        }
        Commands::Table { base_oid } => {
            let base = parse_oid(&base_oid)?;
            let rows = client.table(base).await.context("table failed")?;
            match cli.format {
                OutputFormat::Text => {
                    for row in &rows {
                        let mut keys: Vec<&String> = row.keys().collect();
                        keys.sort();
                        let line = keys.iter().map(|k| format!("{k}={}", row[*k])).collect::<Vec<_>>().join(" ");
                        println!("{line}");
                    }
                }
                OutputFormat::Json => {
                    let as_strings: Vec<_> = rows
                        .iter()
                        .map(|row| {
                            row.iter().map(|(k, v)| (k.clone(), v.to_string())).collect::<std::collections::BTreeMap<_, _>>()
                        })
                        .collect();
                    println!("{}", serde_json::to_string(&as_strings)?);
                }
            }
        }
        Commands::Listen { port } => {
            let mut listener = TrapListener::bind(port, client.config().credentials.clone())
                .await
                .context("failed to bind trap listener")?;
            println!("listening for traps on port {port}");
            while let Some(trap) = listener.recv().await {
                match cli.format {
                    OutputFormat::Text => {
                        println!("trap from {} ({:?}): oid={:?}", trap.origin, trap.pdu_kind, trap.trap_oid);
                        for vb in &trap.varbinds {
                            println!("  {} = {}", vb.oid, vb.value);
                        }
                    }
                    OutputFormat::Json => {
                        let obj = serde_json::json!({
                            "origin": trap.origin.to_string(),
                            "pdu_kind": format!("{:?}", trap.pdu_kind),
                            "trap_oid": trap.trap_oid.map(|o| o.to_string()),
                            "varbinds": trap.varbinds.iter().map(|vb| (vb.oid.to_string(), vb.value.to_string())).collect::<Vec<_>>(),
                        });
                        println!("{}", serde_json::to_string(&obj)?);
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_oid(s: &str) -> Result<ObjectIdentifier> {
    s.parse().map_err(|e| anyhow!("invalid OID {s:?}: {e}"))
}

fn print_pairs(pairs: &[(ObjectIdentifier, Value)], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for (oid, value) in pairs {
                println!("{oid} = {value}");
            }
        }
        OutputFormat::Json => {
            let obj: Vec<_> = pairs.iter().map(|(oid, value)| (oid.to_string(), value.to_string())).collect();
            println!("{}", serde_json::to_string(&obj).unwrap_or_default());
        }
    }
}

fn build_credentials(cli: &Cli, community: &str) -> Result<Credentials> {
    if let Some(user) = &cli.v3_user {
        let auth = cli
            .v3_auth_pass
            .as_ref()
            .map(|pass| {
                let proto = match cli.v3_auth_proto.unwrap_or(AuthProto::Sha1) {
                    AuthProto::Md5 => AuthProtocolId::HmacMd5,
                    AuthProto::Sha1 => AuthProtocolId::HmacSha1,
                };
                (proto, pass.clone())
            });
        let priv_ = cli
            .v3_priv_pass
            .as_ref()
            .map(|pass| {
                let proto = match cli.v3_priv_proto.unwrap_or(PrivProto::Aes) {
                    PrivProto::Des => PrivProtocolId::DesCbc,
                    PrivProto::Aes => PrivProtocolId::AesCfb128,
                };
                (proto, pass.clone())
            });
        return Ok(match (auth, priv_) {
            (None, _) => Credentials::v3_no_auth(user.as_str()),
            (Some((auth_proto, auth_pass)), None) => Credentials::v3_auth(user.as_str(), auth_proto, auth_pass),
            (Some((auth_proto, auth_pass)), Some((priv_proto, priv_pass))) => {
                Credentials::v3_auth_priv(user.as_str(), auth_proto, auth_pass, priv_proto, priv_pass)
            }
        });
    }
    Ok(if cli.v1 { Credentials::v1(community) } else { Credentials::v2c(community) })
}
