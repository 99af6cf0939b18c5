use bytes::Bytes;
use clap::{Parser, Subcommand};
use replis::cmd::SetCmd;
use replis::{Client, DEFAULT_PORT};
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = ReplisCli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);
    let client = Client::connect(&addr).await?;

    one_shot_command(client, cli.command).await
}

async fn one_shot_command(mut client: Client, subcommand: ReplisSubcommand) -> anyhow::Result<()> {
    match subcommand {
        ReplisSubcommand::Ping { msg } => {
            let response = client.ping(msg.map(|s| s.into())).await?;
            println!("{}", String::from_utf8_lossy(response.as_ref()));
        }
        ReplisSubcommand::Echo { msg } => {
            let response = client.echo(msg.into()).await?;
            println!("{}", String::from_utf8_lossy(response.as_ref()));
        }
        ReplisSubcommand::Get { key } => print_value(client.get(&key).await?),
        ReplisSubcommand::Set {
            key,
            value,
            ex,
            px,
            nx,
            xx,
            get,
        } => {
            let expire = ex.map(Duration::from_secs).or(px.map(Duration::from_millis));
            let mut cmd = SetCmd::new(&key, Bytes::from(value), expire);
            if nx {
                cmd = cmd.if_absent();
            }
            if xx {
                cmd = cmd.if_present();
            }
            if get {
                cmd = cmd.return_previous();
            }
            print_value(client.set_cmd(cmd).await?);
        }
        ReplisSubcommand::Del { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            println!("(integer) {}", client.del(&keys).await?);
        }
        ReplisSubcommand::Info { section } => {
            print!("{}", client.info(section.as_deref()).await?);
        }
        ReplisSubcommand::Wait {
            numreplicas,
            timeout_ms,
        } => {
            let acked = client
                .wait(numreplicas, Duration::from_millis(timeout_ms))
                .await?;
            println!("(integer) {acked}");
        }
    };

    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "replis-cli", version, author)]
/// A simple cli client
struct ReplisCli {
    #[clap(subcommand)]
    command: ReplisSubcommand,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(Debug, Subcommand)]
/// Command to send to the server.
enum ReplisSubcommand {
    /// Ping the server.
    Ping {
        /// Message to ping
        msg: Option<String>,
    },
    /// Have the server repeat a message.
    Echo { msg: String },
    /// Get the value of key.
    Get {
        /// Name of key to get.
        key: String,
    },
    /// Set key to hold the string value.
    Set {
        key: String,
        value: String,
        /// Expire after this many seconds.
        #[arg(long, conflicts_with = "px")]
        ex: Option<u64>,
        /// Expire after this many milliseconds.
        #[arg(long)]
        px: Option<u64>,
        /// Only set the key if it does not exist.
        #[arg(long, conflicts_with = "xx")]
        nx: bool,
        /// Only set the key if it already exists.
        #[arg(long)]
        xx: bool,
        /// Print the value stored before this call.
        #[arg(long)]
        get: bool,
    },
    /// Remove keys.
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show server information.
    Info { section: Option<String> },
    /// Wait for replicas to acknowledge the writes so far.
    Wait { numreplicas: u64, timeout_ms: u64 },
}

fn print_value(value: Option<Bytes>) {
    match value {
        Some(value) => println!("{}", String::from_utf8_lossy(&value)),
        None => println!("(nil)"),
    }
}
