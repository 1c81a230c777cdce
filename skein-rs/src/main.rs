use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use skein::cli::{self, ConfigFile, Input};
use skein::config::{self, Config};
use skein::engine::Engine;
use skein::script::{FileLoader, ScriptEvent};
use skein::stream::StreamCommand;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SKEIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("skein: {e}");
            eprintln!("Usage: skein [-s<dir>] [-f[<file>]] [-r<script>] [-a<arg>]... [-v] [<input>|-]");
            std::process::exit(1);
        }
    };

    // ── Config ────────────────────────────────────────────────────────────────
    let config_path = match args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path),
        ConfigFile::Search => config::find_user_config(),
    };
    let mut config = match config_path {
        None => Config::new(),
        Some(path) => match Config::load_file(&path) {
            Ok((config, errors)) => {
                for e in errors {
                    eprintln!("skein: {}: {e}", path.display());
                }
                config
            }
            Err(e) => {
                eprintln!("skein: warning: {e}");
                Config::new()
            }
        },
    };
    if let Some(dir) = args.scripts_dir {
        config.settings.scripts_dir = dir;
    }

    let loader = FileLoader::new(&config.settings.scripts_dir, &config.settings.script_extension);
    let (mut engine, mut events) = Engine::new(config, Arc::new(loader));

    let printer = tokio::spawn(async move {
        while let Some((id, event)) = events.recv().await {
            match event {
                ScriptEvent::Echo(text) => print!("{text}"),
                ScriptEvent::Send(text) => println!("[{id}] > {text}"),
                ScriptEvent::Command(text) => println!("[{id}] # {text}"),
            }
        }
    });

    if let Some(name) = &args.script {
        if let Err(e) = engine.start_script(name, &args.script_args) {
            eprintln!("skein: {e}");
            std::process::exit(1);
        }
    }

    // ── Replay ────────────────────────────────────────────────────────────────
    let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Input::Stdin => Box::new(tokio::io::stdin()),
        Input::File(path) => match tokio::fs::File::open(path).await {
            Ok(f) => Box::new(f),
            Err(e) => {
                eprintln!("skein: {}: {e}", path.display());
                std::process::exit(1);
            }
        },
    };
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    for command in engine.ingest(&format!("{line}\n")) {
                        print_command(&command, args.verbose);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("input: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    engine.stop_all();
    drop(engine);
    let _ = printer.await;
}

fn print_command(command: &StreamCommand, verbose: bool) {
    match command {
        StreamCommand::Text(tags) => {
            let text: String = tags.iter().map(|t| t.text.as_str()).collect();
            print!("{text}");
        }
        other if verbose => println!("{other:?}"),
        _ => {}
    }
}
