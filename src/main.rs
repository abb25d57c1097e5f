use anyhow::{Context, Result};
use async_ldap::{Connection, PlainSasl, TlsOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "ldap-probe")]
#[command(about = "LDAP client probe - binds and runs extended operations against a directory server")]
struct Args {
    /// Server URL (ldap://host[:port] or ldaps://host[:port]; ldaps upgrades via StartTLS)
    #[arg(short, long, value_name = "URL")]
    url: String,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Additional CA certificate bundle (PEM) trusted for the upgrade
    #[arg(long, value_name = "FILE")]
    ca_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Who Am I extended operation (anonymous unless bound)
    Whoami,
    /// Simple bind with a DN and password, then report the bound identity
    Bind {
        #[arg(long, value_name = "DN")]
        name: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// SASL PLAIN bind, then report the bound identity
    SaslPlain {
        #[arg(long, value_name = "AUTHCID")]
        user: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("async_ldap={},ldap_probe={},warn", log_level, log_level))
        .init();

    let mut tls_options = TlsOptions::default();
    tls_options.skip_verify = args.insecure;
    if let Some(path) = &args.ca_file {
        let pem = std::fs::read(path)
            .with_context(|| format!("read CA bundle {}", path.display()))?;
        tls_options.extra_ca_pem = Some(pem);
    }

    let connection = Connection::connect_with(&args.url, &tls_options)
        .await
        .with_context(|| format!("connect to {}", args.url))?;
    info!("connected to {} (state {:?})", args.url, connection.state());

    match args.command {
        Command::Whoami => {}
        Command::Bind { name, password } => {
            connection
                .simple_bind(&name, &password)
                .await
                .context("simple bind")?;
            info!("bound as {}", name);
        }
        Command::SaslPlain { user, password } => {
            let mut mechanism = PlainSasl::new(&user, &password);
            connection
                .sasl_bind(&mut mechanism)
                .await
                .context("SASL PLAIN bind")?;
            info!("SASL PLAIN bind completed for {}", user);
        }
    }

    let reply = connection
        .request(async_ldap::proto::whoami_request())
        .await
        .context("Who Am I extended operation")?;
    match reply {
        async_ldap::proto::ProtocolOp::ExtendedResponse(resp) => {
            if resp.result_code != 0 {
                anyhow::bail!(
                    "Who Am I failed (result code {}): {}",
                    resp.result_code,
                    resp.diagnostic_message
                );
            }
            let identity = resp
                .response_value
                .map(|v| String::from_utf8_lossy(&v).into_owned())
                .unwrap_or_default();
            let shown = if identity.is_empty() { "anonymous" } else { identity.as_str() };
            println!("{}", shown);
        }
        other => anyhow::bail!("unexpected reply to Who Am I: {}", other.kind()),
    }

    connection.close().await;
    Ok(())
}
