pub mod shell;
pub mod views;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use intellidoc_core::{
    mock_store, ChannelObserver, Config, DocumentStore, Settings, StoreError, SummaryStyle,
    UploadFile,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::shell::{Reply, Shell, ShellCommand};
use crate::views::{ChatView, CompareView, SummarizeView};

/// Initialize tracing/logging with the given directives. Logs go to stderr so
/// they never interleave with shell output.
pub fn init_logging(directives: &[&str]) -> Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse::<tracing_subscriber::filter::Directive>()
                .with_context(|| format!("Invalid log directive '{}'", directive))?,
        );
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Command-line overrides applied on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub settings_path: Option<PathBuf>,
    pub latency_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl LaunchOptions {
    pub fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings_path {
            Some(path) => Settings::load(path),
            None => {
                let config = Config::load_or_default();
                config
                    .ensure_dirs()
                    .context("Failed to create config directory")?;
                tracing::debug!("Config directory: {:?}", config.config_dir);
                Settings::load(&config.settings_file)
            }
        };

        if let Some(latency_ms) = self.latency_ms {
            settings.mock_latency_ms = latency_ms;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.backend_timeout_secs = timeout_secs;
        }
        Ok(settings.sanitized())
    }
}

fn observed_store(settings: &Settings) -> DocumentStore {
    let (observer, mut events) = ChannelObserver::new();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!(?event, "Store event");
        }
    });
    mock_store(settings).with_observer(observer)
}

/// Run the interactive shell until `quit` or end of input
pub fn run_shell(options: LaunchOptions) -> Result<()> {
    let settings = options.resolve_settings()?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(shell_loop(settings))
}

async fn shell_loop(settings: Settings) -> Result<()> {
    tracing::info!(
        latency_ms = settings.mock_latency_ms,
        timeout_secs = settings.backend_timeout_secs,
        "Starting IntelliDoc shell"
    );
    let mut shell = Shell::new(observed_store(&settings), settings);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("IntelliDoc-Lite. Type 'help' for commands.");
    loop {
        print!("{}> ", shell.route());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        match shell.execute(command).await {
            Reply::Output(text) if text.is_empty() => {}
            Reply::Output(text) => println!("{}", text),
            Reply::Quit => break,
        }
    }

    tracing::info!("Shell closed");
    Ok(())
}

/// Run the scripted contract walkthrough and print the final session
pub fn run_demo(options: LaunchOptions) -> Result<()> {
    let settings = options.resolve_settings()?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async {
        let snapshot = demo(observed_store(&settings)).await?;
        println!("{}", snapshot);
        Ok(())
    })
}

/// Upload two documents, chat, race two summaries and compare. Returns the
/// final session snapshot as JSON.
pub async fn demo(store: DocumentStore) -> Result<String> {
    let contract = store
        .upload_document(UploadFile::new(
            "contract.pdf",
            "Master services agreement between Acme Holdings and Northwind Consulting.",
        ))
        .await?;
    let amended = store
        .upload_document(UploadFile::new(
            "contract-v2.pdf",
            "Amended master services agreement with revised payment terms.",
        ))
        .await?;

    let mut chat = ChatView::new(store.clone());
    chat.select(contract.clone()).await?;
    chat.send("What is the governing law?").await?;

    // The detailed request supersedes the concise one still in flight.
    let mut concise = SummarizeView::new(store.clone());
    let mut detailed = SummarizeView::new(store.clone());
    concise.select(contract.clone()).await;
    detailed.select(contract.clone()).await;
    detailed.set_style(SummaryStyle::Detailed);
    let (first, second) = tokio::join!(concise.generate(), async {
        tokio::task::yield_now().await;
        detailed.generate().await
    });
    match first {
        Err(StoreError::Superseded { .. }) => {
            tracing::info!("Concise summary superseded by the detailed one")
        }
        other => other?,
    }
    second?;

    let mut compare = CompareView::new(store.clone());
    compare.select(contract, amended);
    let comparison = compare.compare().await?;
    tracing::info!(
        added = comparison.added,
        removed = comparison.removed,
        changed = comparison.changed,
        "Compared contract versions"
    );

    serde_json::to_string_pretty(&store.snapshot().await).context("Failed to render session")
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellidoc_core::{MockBackend, Sender};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_settings_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"mock_latency_ms": 50, "backend_timeout_secs": 5}"#).unwrap();

        let options = LaunchOptions {
            settings_path: Some(path),
            latency_ms: None,
            timeout_secs: Some(9),
        };
        let settings = options.resolve_settings().unwrap();

        assert_eq!(settings.mock_latency_ms, 50);
        assert_eq!(settings.backend_timeout_secs, 9);
        assert!(settings.accepts_extension("pdf"));
    }

    #[test]
    fn test_zero_timeout_override_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"backend_timeout_secs": 5}"#).unwrap();

        let options = LaunchOptions {
            settings_path: Some(path),
            latency_ms: Some(0),
            timeout_secs: Some(0),
        };
        let settings = options.resolve_settings().unwrap();

        assert_eq!(settings.backend_timeout_secs, 30);
        assert_eq!(settings.mock_latency_ms, 0);
    }

    #[test]
    fn test_malformed_settings_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let options = LaunchOptions {
            settings_path: Some(path),
            ..Default::default()
        };

        assert_eq!(options.resolve_settings().unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_demo_keeps_detailed_summary() {
        let store = DocumentStore::new(Arc::new(MockBackend::new(Duration::from_millis(20))));

        let json = demo(store.clone()).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.documents.len(), 2);
        assert!(snapshot
            .current_summary
            .as_deref()
            .is_some_and(|s| s.starts_with("Overview:")));
        assert_eq!(snapshot.chat_messages.len(), 4);
        assert_eq!(snapshot.chat_messages[3].sender, Sender::Assistant);
        assert!(!snapshot.is_loading);
        assert!(json.contains("\"current_summary\""));
    }
}
