//! Tessera command-line surface.
//!
//! One invocation per operation: exit code 0 on success, a single-line
//! error on stderr otherwise. Query responses are JSON on stdout.
//!
//! The store behind this binary is in-memory, so the CLI is a driver for
//! demos and smoke tests rather than a durable server; `replicator set`
//! therefore creates any named schemas that do not exist yet.

use clap::{Args, Parser, Subcommand};

use tessera_db::{
    description, Db, DbError, NullSink, Peer, PeerId, PeerInfo, Replicator,
};
use tessera_store::MultiStore;

#[derive(Parser)]
#[command(name = "tessera", about = "Peer-to-peer document database")]
struct Cli {
    /// Identity of the local peer.
    #[arg(long, default_value = "LocalPeer1")]
    self_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage replication targets.
    Replicator {
        #[command(subcommand)]
        command: ReplicatorCommand,
    },
    /// Register a schema description.
    SchemaAdd(SchemaAddArgs),
    /// Write a document field.
    Put {
        doc: String,
        field: String,
        value: String,
    },
    /// Read a document field.
    Get { doc: String, field: String },
}

#[derive(Subcommand)]
enum ReplicatorCommand {
    /// Add a target replicator for one or all schemas.
    Set(ReplicatorArgs),
    /// Remove schemas from a replicator, or the whole replicator.
    Delete(ReplicatorArgs),
    /// List all configured replicators.
    Getall,
}

#[derive(Args)]
struct ReplicatorArgs {
    /// Target peer id.
    peer: String,

    /// Multiaddresses for the target peer.
    #[arg(long = "addr")]
    addrs: Vec<String>,

    /// Schemas to replicate; all schemas when omitted.
    #[arg(short = 'c', long = "collection")]
    collections: Vec<String>,
}

#[derive(Args)]
struct SchemaAddArgs {
    /// Schema name.
    name: String,

    /// Field names in declaration order.
    #[arg(long = "field")]
    fields: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DbError> {
    let peer = Peer::new(PeerId::parse(&cli.self_id)?, Db::new())?;

    match cli.command {
        Command::Replicator { command } => match command {
            ReplicatorCommand::Set(args) => {
                ensure_schemas(peer.db(), &args.collections)?;
                let persisted = peer.set_replicator(&NullSink, replicator_from(&args)?)?;
                print_json(&persisted)
            }
            ReplicatorCommand::Delete(args) => {
                peer.delete_replicator(replicator_from(&args)?)
            }
            ReplicatorCommand::Getall => print_json(&peer.get_all_replicators()?),
        },
        Command::SchemaAdd(args) => {
            let txn = peer.db().begin();
            let ms = MultiStore::new(&txn);
            let desc = description::create_schema_version(
                &ms,
                description::SchemaDescription {
                    name: args.name,
                    root: String::new(),
                    version_id: String::new(),
                    fields: args
                        .fields
                        .into_iter()
                        .map(|name| description::FieldDescription { name, id: 0 })
                        .collect(),
                },
            )?;
            txn.commit()?;
            print_json(&desc)
        }
        Command::Put { doc, field, value } => {
            let cid = peer.db().put(&doc, &field, value.as_bytes())?;
            print_json(&serde_json::json!({ "cid": cid.to_string() }))
        }
        Command::Get { doc, field } => {
            let value = peer.db().get(&doc, &field)?;
            print_json(&serde_json::json!({
                "value": String::from_utf8_lossy(&value),
            }))
        }
    }
}

fn replicator_from(args: &ReplicatorArgs) -> Result<Replicator, DbError> {
    Ok(Replicator {
        info: PeerInfo {
            id: PeerId::parse(&args.peer)?,
            addrs: args.addrs.clone(),
        },
        schemas: args.collections.clone(),
    })
}

/// Create an empty schema for any named collection that is missing.
fn ensure_schemas(db: &Db, names: &[String]) -> Result<(), DbError> {
    let txn = db.begin();
    let ms = MultiStore::new(&txn);
    for name in names {
        if description::get_schemas_by_name(&ms, name).is_err() {
            description::create_schema_version(
                &ms,
                description::SchemaDescription {
                    name: name.clone(),
                    root: String::new(),
                    version_id: String::new(),
                    fields: Vec::new(),
                },
            )?;
        }
    }
    txn.commit()?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), DbError> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(DbError::from)?
    );
    Ok(())
}
