//! klang CLI: operator interface to the generation broker.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use klang_rs::config::Config;
use klang_rs::config::secrets::ExposeSecret;
use klang_rs::db::Db;
use klang_rs::engine::{Broker, CpuPool, PipelineParts};
use klang_rs::llm::{
    LlmMeaningBackend, NarakeetSpeechBackend, OpenAiImageBackend, http_client, openai_client,
};
use klang_rs::model::meaning::WordMeaning;
use klang_rs::store::{IllustrationFiles, PgMeaningStore, SoundFiles};
use klang_rs::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(name = "klang", about = "Generate word meanings, illustrations and sounds")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Print the meanings of a word, generating them if needed
    Meanings {
        word: String,
    },
    /// Print the illustration path of a word meaning
    Illustration {
        meaning_id: i64,
    },
    /// Print the sound path of a word meaning
    Sound {
        meaning_id: i64,
    },
    /// Generate everything for a list of words, one per line
    Warm {
        file: PathBuf,
        /// Also draw an illustration for every meaning
        #[arg(long)]
        illustrations: bool,
        /// Also synthesize a sound for every meaning
        #[arg(long)]
        sounds: bool,
        /// Words processed at once
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig::from_config(&config, "klang"))?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;

    if let Command::Migrate = cli.command {
        println!("Migrations applied.");
        return Ok(());
    }

    let broker = Arc::new(build_broker(&config, &db).await?);
    broker.start()?;

    let b = Arc::clone(&broker);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        b.shutdown();
    });

    let result = match cli.command {
        Command::Migrate => Ok(()),
        Command::Meanings { word } => cmd_meanings(&broker, &word).await,
        Command::Illustration { meaning_id } => cmd_illustration(&broker, &db, meaning_id).await,
        Command::Sound { meaning_id } => cmd_sound(&broker, &db, meaning_id).await,
        Command::Warm {
            file,
            illustrations,
            sounds,
            concurrency,
        } => cmd_warm(&broker, file, illustrations, sounds, concurrency).await,
    };

    broker.shutdown();
    broker.join().await;
    result
}

async fn build_broker(config: &Config, db: &Db) -> anyhow::Result<Broker> {
    let openai = openai_client(&config.openai_api_key)
        .map_err(|e| anyhow::anyhow!("failed to create OpenAI client: {e}"))?;
    let http = http_client()?;
    let pool = CpuPool::new(config.broker.offload_workers);

    let meanings = PipelineParts::new(
        Arc::new(PgMeaningStore::new(db.clone())),
        Arc::new(LlmMeaningBackend::from_client(&openai, &config.meaning_model)),
    );
    let illustrations = PipelineParts::new(
        Arc::new(
            IllustrationFiles::open(&config.illustrations_dir, pool)
                .await?
                .with_ledger(db.clone()),
        ),
        Arc::new(OpenAiImageBackend::new(
            http.clone(),
            config.openai_api_key.clone(),
            &config.image_model,
        )),
    );
    let sounds = PipelineParts::new(
        Arc::new(
            SoundFiles::open(&config.sounds_dir)
                .await?
                .with_ledger(db.clone()),
        ),
        Arc::new(NarakeetSpeechBackend::new(
            http,
            config.narakeet_api_key.clone(),
        )),
    );

    Ok(Broker::new(&config.broker, meanings, illustrations, sounds))
}

async fn cmd_meanings(broker: &Broker, word: &str) -> anyhow::Result<()> {
    let meanings = broker.meanings(word).await?;
    for meaning in &meanings {
        print_meaning(meaning);
    }
    println!("\n{} meaning(s)", meanings.len());
    Ok(())
}

async fn cmd_illustration(broker: &Broker, db: &Db, meaning_id: i64) -> anyhow::Result<()> {
    let meaning = stored_meaning(db, meaning_id).await?;
    let illustration = broker.illustration_for(&meaning).await?;
    println!("{}", illustration.path.display());
    Ok(())
}

async fn cmd_sound(broker: &Broker, db: &Db, meaning_id: i64) -> anyhow::Result<()> {
    let meaning = stored_meaning(db, meaning_id).await?;
    let sound = broker.sound_for(&meaning).await?;
    println!("{}", sound.path.display());
    Ok(())
}

async fn cmd_warm(
    broker: &Arc<Broker>,
    file: PathBuf,
    illustrations: bool,
    sounds: bool,
    concurrency: usize,
) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let words: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .map(str::to_string)
        .collect();

    let mut tasks = JoinSet::new();
    let mut failures = 0usize;
    for word in words.iter().cloned() {
        if tasks.len() >= concurrency.max(1) {
            failures += report(tasks.join_next().await);
        }
        let broker = Arc::clone(broker);
        tasks.spawn(async move {
            let result = warm_word(&broker, &word, illustrations, sounds).await;
            (word, result)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        failures += report(Some(joined));
    }

    println!("\n{} word(s), {} failed", words.len(), failures);
    Ok(())
}

async fn warm_word(
    broker: &Broker,
    word: &str,
    illustrations: bool,
    sounds: bool,
) -> klang_rs::error::Result<usize> {
    let meanings = broker.meanings(word).await?;
    for meaning in &meanings {
        if illustrations {
            broker.illustration_for(meaning).await?;
        }
        if sounds {
            broker.sound_for(meaning).await?;
        }
    }
    Ok(meanings.len())
}

/// Print one warm result. Returns 1 for a failure.
fn report(
    joined: Option<Result<(String, klang_rs::error::Result<usize>), tokio::task::JoinError>>,
) -> usize {
    match joined {
        Some(Ok((word, Ok(n)))) => {
            println!("{word}: {n} meaning(s)");
            0
        }
        Some(Ok((word, Err(e)))) => {
            eprintln!("{word}: {e}");
            1
        }
        Some(Err(e)) => {
            eprintln!("warm task failed: {e}");
            1
        }
        None => 0,
    }
}

async fn stored_meaning(db: &Db, meaning_id: i64) -> anyhow::Result<WordMeaning> {
    db.word_meaning(meaning_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no word meaning with id {meaning_id}"))
}

fn print_meaning(meaning: &WordMeaning) {
    let gender = meaning
        .gender
        .map(|g| g.to_string())
        .unwrap_or("-".to_string());
    println!(
        "{:<6}  {:<24}  {:<10}  {:<8}  {}",
        meaning.id,
        meaning.word,
        meaning.part_of_speech,
        gender,
        meaning.rating()
    );
    for t in &meaning.translations {
        println!("        {}: {} ({})", t.language, t.translation, t.description);
    }
}
