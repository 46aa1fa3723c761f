mod config;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hevec_db::codec::{load_query, load_results, load_table, save_query, save_results, save_table};
use hevec_db::{
    compare, compute_similarities, create_contexts, decrypt_similarities, encrypt_query, encrypt_table,
    load_private_context, load_public_context, plaintext_similarities, save_contexts, VectorStore,
};
use log::info;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted cosine similarity over CKKS", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, global = true, default_value = "hevec.toml")]
    config: PathBuf,

    /// Query word (overrides [query].word)
    #[arg(long, global = true)]
    query: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Data holder: create contexts, encrypt the table and the query
    Setup,
    /// Computing party: encrypted similarities from public material only
    Compute,
    /// Result holder: decrypt and compare against the plaintext computation
    Reveal {
        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(word) = args.query {
        config.query.word = word;
    }

    let start = Instant::now();
    let stage = match args.command {
        Commands::Setup => {
            setup(&config)?;
            "setup"
        }
        Commands::Compute => {
            compute(&config)?;
            "computation"
        }
        Commands::Reveal { json } => {
            reveal(&config, json)?;
            "reveal"
        }
    };
    info!("{stage} completed in {:.2?}", start.elapsed());
    Ok(())
}

fn load_store(config: &Config) -> anyhow::Result<VectorStore> {
    let path = config.paths.resolve(&config.paths.embeddings);
    let store = VectorStore::load_limited(&path, config.query.max_lines)
        .with_context(|| format!("loading embeddings from {}", path.display()))?;
    info!(
        "loaded {} vectors (dimension {}) from {}",
        store.len(),
        store.dimension().unwrap_or(0),
        path.display()
    );
    Ok(store)
}

fn setup(config: &Config) -> anyhow::Result<()> {
    let paths = &config.paths;
    let store = load_store(config)?;
    let word = &config.query.word;
    if !store.contains(word) {
        bail!("query word {word:?} is not in the embedding file");
    }

    info!("creating contexts");
    let public = {
        let (private, public) = create_contexts(&config.ckks.params())?;
        save_contexts(
            &private,
            &public,
            paths.resolve(&paths.private_context),
            paths.resolve(&paths.public_context),
        )?;
        public
    };

    info!("encrypting embeddings");
    let table = encrypt_table(&public, &store)?;
    save_table(paths.resolve(&paths.encrypted_table), &table)?;

    info!("encrypting query word {word:?}");
    let query = encrypt_query(&public, &store, word)?;
    save_query(paths.resolve(&paths.encrypted_query), &query)?;
    Ok(())
}

fn compute(config: &Config) -> anyhow::Result<()> {
    let paths = &config.paths;
    let public = load_public_context(paths.resolve(&paths.public_context))?;

    info!("loading encrypted embeddings");
    let table = load_table(paths.resolve(&paths.encrypted_table), &public)?;
    info!("loading encrypted query");
    let query = load_query(paths.resolve(&paths.encrypted_query), &public)?;

    info!("computing encrypted cosine similarities");
    let results = compute_similarities(&public, &query, &table)?;
    save_results(paths.resolve(&paths.encrypted_results), &results)?;
    Ok(())
}

fn reveal(config: &Config, json: bool) -> anyhow::Result<()> {
    let paths = &config.paths;
    let private = load_private_context(paths.resolve(&paths.private_context))?;
    let results = load_results(paths.resolve(&paths.encrypted_results), private.public())?;

    info!("decrypting results");
    let decrypted = decrypt_similarities(&private, &results)?;
    drop(private);

    let store = load_store(config)?;
    let word = &config.query.word;
    let query = store
        .get(word)
        .with_context(|| format!("query word {word:?} is not in the embedding file"))?;
    let plaintext = plaintext_similarities(&store, query);
    let rows = compare(&decrypted, &plaintext)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("\nResults for {word:?}:");
        for row in &rows {
            println!("{row}\n");
        }
    }
    Ok(())
}
