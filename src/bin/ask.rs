use anyhow::{Context, Result};
use clap::Parser;
use docrodeo::app::App;
use docrodeo::ingest::MetadataOutcome;
use docrodeo::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(about = "Upload a document, extract its text and ask questions about it")]
struct Args {
    /// Document to upload
    #[arg(short, long)]
    file: PathBuf,

    /// Question to ask (repeat for several)
    #[arg(short, long = "question", required = true)]
    questions: Vec<String>,

    /// Print the full extracted text instead of the preview
    #[arg(long)]
    full_text: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.rodeo.log_level.as_str()),
    )
    .init();

    let app = App::from_config(&config).await?;

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let receipt = match app.pipeline.ingest(&bytes, &name, bytes.len() as u64).await {
        Ok(receipt) => receipt,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    println!("Uploaded: {}", receipt.document.staged_reference);
    if let MetadataOutcome::Failed(reason) = &receipt.metadata {
        eprintln!("Warning: not added to upload history ({})", reason);
    }

    let extracted = match app
        .pipeline
        .extract(&receipt.document.staged_reference, receipt.document.file_type)
        .await
    {
        Ok(extracted) => extracted,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    if extracted.is_empty() {
        println!("No text could be extracted from this document.");
    } else {
        println!("Extracted {} characters", extracted.char_count());
        println!("\n--- Document ---");
        if args.full_text {
            println!("{}", extracted.text);
        } else {
            println!("{}", extracted.preview(app.preview_chars));
        }
        println!("----------------");
    }

    for question in &args.questions {
        println!("\nQ: {}", question.trim());
        match app.assembler.answer(question, &extracted.text).await {
            Ok(answer) => {
                println!("A: {}", answer.text);
                if answer.truncated {
                    println!("(answered from the first {} characters)", answer.context_chars);
                }
            }
            Err(e) => println!("A: {}", e.user_message()),
        }
    }

    Ok(())
}
