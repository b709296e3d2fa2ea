//! Line-oriented front end over the views

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use intellidoc_core::{
    ChatMessage, ClauseHit, ClauseStatus, Comparison, DiffKind, DiffLine, Document, DocumentId,
    DocumentStatus, DocumentStore, DocumentType, LegalReport, Sender, Settings, StoreError,
    SummaryStyle, UploadFile,
};

use crate::views::{ChatView, CompareView, DashboardStats, Route, SummarizeView};

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Go(Route),
    Upload(Vec<PathBuf>),
    Docs,
    Select(String),
    Ask(String),
    Style(SummaryStyle),
    Summarize(Option<SummaryStyle>),
    Compare(String, String),
    Search(String),
    Check(String, DocumentType),
    Next,
    Prev,
    Clear,
    Delete(String),
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "go" | "open" => ShellCommand::Go(Route::from_str(required(rest, "go <route>")?)?),
            "upload" => {
                let paths: Vec<PathBuf> = split_args(rest)?.into_iter().map(PathBuf::from).collect();
                if paths.is_empty() {
                    return Err("Usage: upload <file>...".to_string());
                }
                ShellCommand::Upload(paths)
            }
            "docs" | "ls" => ShellCommand::Docs,
            "select" => ShellCommand::Select(required(rest, "select <doc>")?.to_string()),
            "ask" => ShellCommand::Ask(required(rest, "ask <question>")?.to_string()),
            "style" => ShellCommand::Style(parse_style(required(rest, "style <style>")?)?),
            "summarize" => {
                if rest.is_empty() {
                    ShellCommand::Summarize(None)
                } else {
                    ShellCommand::Summarize(Some(parse_style(rest)?))
                }
            }
            "compare" => match <[String; 2]>::try_from(split_args(rest)?) {
                Ok([left, right]) => ShellCommand::Compare(left, right),
                Err(_) => return Err("Usage: compare <doc> <doc>".to_string()),
            },
            "search" | "find" => ShellCommand::Search(required(rest, "search <term>")?.to_string()),
            "check" => match <[String; 2]>::try_from(split_args(rest)?) {
                Ok([reference, kind]) => ShellCommand::Check(
                    reference,
                    DocumentType::from_str(&kind).map_err(|e| e.to_string())?,
                ),
                Err(_) => return Err("Usage: check <doc> <type>".to_string()),
            },
            "next" => ShellCommand::Next,
            "prev" => ShellCommand::Prev,
            "clear" => ShellCommand::Clear,
            "delete" | "rm" => ShellCommand::Delete(required(rest, "delete <doc>")?.to_string()),
            "status" => ShellCommand::Status,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
        };
        Ok(Some(command))
    }
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("Usage: {}", usage))
    } else {
        Ok(rest)
    }
}

/// Split arguments on whitespace. Single or double quotes group words, so
/// `upload "my contract.pdf"` names one file.
fn split_args(rest: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in rest.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(format!("Unterminated {} quote", q));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

fn parse_style(s: &str) -> Result<SummaryStyle, String> {
    SummaryStyle::from_str(s).map_err(|e| e.to_string())
}

/// What the caller should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// Interactive session: current route plus one instance of each view
pub struct Shell {
    store: DocumentStore,
    settings: Settings,
    route: Route,
    chat: ChatView,
    summarize: SummarizeView,
    compare: CompareView,
}

impl Shell {
    pub fn new(store: DocumentStore, settings: Settings) -> Self {
        Self {
            chat: ChatView::new(store.clone()),
            summarize: SummarizeView::new(store.clone()),
            compare: CompareView::new(store.clone()),
            store,
            settings,
            route: Route::default(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Reply {
        if command == ShellCommand::Quit {
            return Reply::Quit;
        }
        match self.run(command).await {
            Ok(output) => Reply::Output(output),
            Err(e) => Reply::Output(format!("Error: {:#}", e)),
        }
    }

    async fn run(&mut self, command: ShellCommand) -> Result<String> {
        match command {
            ShellCommand::Go(route) => {
                self.route = route;
                Ok(self.render_route().await)
            }
            ShellCommand::Upload(paths) => self.upload(&paths).await,
            ShellCommand::Docs => Ok(render_documents(&self.store.documents().await)),
            ShellCommand::Select(reference) => {
                let document_id = self.resolve(&reference).await?;
                match self.route {
                    Route::Chat => {
                        self.chat.select(document_id).await?;
                        Ok(render_transcript(&self.store.snapshot().await.chat_messages))
                    }
                    Route::Summarize => {
                        self.summarize.select(document_id).await;
                        let name = self.document_name(self.summarize.selected()).await;
                        Ok(format!("Selected {} ({})", name, self.summarize.style().label()))
                    }
                    _ => anyhow::bail!(
                        "Open {} or {} before selecting a document",
                        Route::Chat,
                        Route::Summarize
                    ),
                }
            }
            ShellCommand::Ask(question) => {
                self.chat.send(&question).await?;
                let messages = self.store.snapshot().await.chat_messages;
                Ok(messages
                    .iter()
                    .rev()
                    .find(|m| m.sender == Sender::Assistant)
                    .map(render_message)
                    .unwrap_or_default())
            }
            ShellCommand::Style(style) => {
                self.summarize.set_style(style);
                Ok(format!("Summary style: {}", style.label()))
            }
            ShellCommand::Summarize(style) => {
                if let Some(style) = style {
                    self.summarize.set_style(style);
                }
                self.summarize.generate().await?;
                Ok(self.store.snapshot().await.current_summary.unwrap_or_default())
            }
            ShellCommand::Compare(left, right) => {
                let left = self.resolve(&left).await?;
                let right = self.resolve(&right).await?;
                self.compare.select(left, right);
                let comparison = self.compare.compare().await?;
                Ok(render_comparison(comparison, None))
            }
            ShellCommand::Search(term) => {
                let hits = self.store.search_clauses(&term).await?;
                Ok(render_hits(&term, &hits, &self.store.documents().await))
            }
            ShellCommand::Check(reference, document_type) => {
                let document_id = self.resolve(&reference).await?;
                let report = self.store.legal_check(&document_id, document_type).await?;
                let name = self.document_name(Some(&document_id)).await;
                Ok(render_report(&name, &report))
            }
            ShellCommand::Next | ShellCommand::Prev => {
                let moved = if command == ShellCommand::Next {
                    self.compare.next_diff()
                } else {
                    self.compare.prev_diff()
                };
                match (moved, self.compare.result()) {
                    (Some(id), Some(comparison)) => Ok(render_comparison(comparison, Some(id))),
                    _ => anyhow::bail!("No differences to step through; run 'compare' first"),
                }
            }
            ShellCommand::Clear => {
                if self.route == Route::Summarize {
                    self.store.clear_summary().await;
                    Ok("Summary cleared".to_string())
                } else {
                    self.store.clear_chat().await;
                    Ok("Chat cleared".to_string())
                }
            }
            ShellCommand::Delete(reference) => {
                let document_id = self.resolve(&reference).await?;
                let removed = self.store.delete_document(&document_id).await?;
                self.chat.forget(&document_id);
                self.summarize.forget(&document_id);
                self.compare.forget(&document_id);
                Ok(format!("Deleted {}", removed.name))
            }
            ShellCommand::Status => self.status().await,
            ShellCommand::Help => Ok(HELP.to_string()),
            ShellCommand::Quit => Ok(String::new()),
        }
    }

    async fn upload(&self, paths: &[PathBuf]) -> Result<String> {
        let mut lines = Vec::new();
        let mut files = Vec::new();

        for path in paths {
            match read_upload(path).await {
                Ok(file) => {
                    let listed = file
                        .extension()
                        .is_some_and(|ext| self.settings.accepts_extension(&ext));
                    if !listed {
                        lines.push(format!(
                            "Warning: {} is not one of: {}",
                            file.name,
                            self.settings.accepted_extensions.join(", ")
                        ));
                    }
                    files.push(file);
                }
                Err(e) => lines.push(format!("Error: {:#}", e)),
            }
        }

        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let results = self.store.upload_documents(files).await;
        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(id) => lines.push(format!("Uploaded {} ({})", name, id)),
                Err(e) => lines.push(format!("Error: {}", e)),
            }
        }
        Ok(lines.join("\n"))
    }

    async fn status(&self) -> Result<String> {
        let snapshot = self.store.snapshot().await;
        let stats = DashboardStats::from_snapshot(&snapshot);
        let mut out = serde_json::to_string_pretty(&stats).context("Failed to render stats")?;
        out.push_str(&format!(
            "\nroute: {}\nbackend: {}\nloading: {}",
            self.route,
            self.store.backend_name(),
            snapshot.is_loading
        ));
        if let Some(error) = self.store.take_error().await {
            out.push_str(&format!("\nlast error: {}", error));
        }
        Ok(out)
    }

    /// Resolve a 1-based list index or a full document id
    async fn resolve(&self, reference: &str) -> Result<DocumentId, StoreError> {
        let documents = self.store.documents().await;
        if let Ok(index) = reference.parse::<usize>() {
            if let Some(document) = index.checked_sub(1).and_then(|i| documents.get(i)) {
                return Ok(document.id.clone());
            }
        }
        documents
            .iter()
            .find(|d| d.id.as_str() == reference)
            .map(|d| d.id.clone())
            .ok_or_else(|| StoreError::not_found(&DocumentId::from(reference)))
    }

    async fn document_name(&self, document_id: Option<&DocumentId>) -> String {
        match document_id {
            Some(id) => self
                .store
                .document(id)
                .await
                .map(|d| d.name)
                .unwrap_or_else(|| id.to_string()),
            None => "(none)".to_string(),
        }
    }

    async fn render_route(&self) -> String {
        let snapshot = self.store.snapshot().await;
        let mut lines = vec![format!("== {} ==", self.route.title())];
        match self.route {
            Route::Home => {
                lines.push("Upload documents, ask questions, summarize and compare.".to_string());
                lines.push(format!("Type 'go {}' to get started.", Route::Dashboard));
            }
            Route::Dashboard => {
                let stats = DashboardStats::from_snapshot(&snapshot);
                lines.push(format!(
                    "{} documents ({} ready, {} processing, {} failed), {} messages",
                    stats.total, stats.ready, stats.processing, stats.failed, stats.messages
                ));
                lines.push(render_documents(&snapshot.documents));
                lines.push(
                    "Clause finder: 'search <term>'. Legal check: 'check <doc> <type>'.".to_string(),
                );
            }
            Route::Chat => {
                lines.push(format!(
                    "Document: {}",
                    self.document_name(self.chat.selected()).await
                ));
                lines.push(format!("Try: {}", self.chat.suggestions().join(" | ")));
                lines.push(render_transcript(&snapshot.chat_messages));
            }
            Route::Summarize => {
                lines.push(format!(
                    "Document: {}  Style: {}",
                    self.document_name(self.summarize.selected()).await,
                    self.summarize.style().label()
                ));
                if let Some(summary) = snapshot.current_summary {
                    lines.push(summary);
                }
            }
            Route::Compare => match self.compare.result() {
                Some(comparison) => {
                    lines.push(render_comparison(comparison, self.compare.highlighted()))
                }
                None => lines.push("Use 'compare <doc> <doc>' to compare two documents.".to_string()),
            },
        }
        lines.join("\n")
    }
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadFile::new(name, data))
}

fn render_documents(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents uploaded yet.".to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let pages = match (&d.status, &d.metadata) {
                (DocumentStatus::Ready, Some(meta)) => format!(", {} pages", meta.page_count),
                _ => String::new(),
            };
            format!("{:>3}. {} [{}{}]", i + 1, d.name, d.status, pages)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    format!("{}> {}", who, message.text)
}

fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clause finder results grouped under each document's name
fn render_hits(term: &str, hits: &[ClauseHit], documents: &[Document]) -> String {
    if hits.is_empty() {
        return format!("No ready document mentions '{}'.", term.trim());
    }
    let name_of = |id: &DocumentId| {
        documents
            .iter()
            .find(|d| &d.id == id)
            .map_or_else(|| id.to_string(), |d| d.name.clone())
    };

    let mut lines = vec![format!("{} matches for '{}'", hits.len(), term.trim())];
    let mut previous: Option<&DocumentId> = None;
    for hit in hits {
        if previous != Some(&hit.document_id) {
            lines.push(format!("{}:", name_of(&hit.document_id)));
            previous = Some(&hit.document_id);
        }
        lines.push(format!("  {}", hit.snippet));
    }
    lines.join("\n")
}

fn render_report(name: &str, report: &LegalReport) -> String {
    let mut lines = vec![format!(
        "{} checked as {}: risk score {}/10",
        name, report.document_type, report.risk_score
    )];
    for check in &report.clauses {
        let line = match (&check.status, &check.value) {
            (ClauseStatus::Found, Some(value)) => {
                format!("  [found]   {}: {}", check.clause, value)
            }
            (ClauseStatus::Found, None) => format!("  [found]   {}", check.clause),
            (ClauseStatus::Missing, _) => {
                format!("  [missing] {}: {}", check.clause, check.recommendation)
            }
        };
        lines.push(line);
    }
    lines.join("\n")
}

fn render_comparison(comparison: &Comparison, highlighted: Option<u32>) -> String {
    let render_line = |line: &DiffLine| {
        let marker = match line.kind {
            DiffKind::Same => ' ',
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
        };
        let cursor = if highlighted == Some(line.id) { '>' } else { ' ' };
        format!("{}{} {:>2} {}", cursor, marker, line.id, line.text)
    };

    let mut lines = vec![format!(
        "{} removed, {} added, {} changed",
        comparison.removed, comparison.added, comparison.changed
    )];
    lines.push("-- left --".to_string());
    lines.extend(comparison.left.iter().map(render_line));
    lines.push("-- right --".to_string());
    lines.extend(comparison.right.iter().map(render_line));
    lines.join("\n")
}

const HELP: &str = "\
Commands:
  go <route>            /, /app, /app/chat, /app/summarize, /app/compare
  upload <file>...      upload one or more files (quote paths with spaces)
  docs                  list documents (use the number or id to refer to one)
  select <doc>          pick the document for the chat or summarize view
  ask <question>        ask about the selected chat document
  style <style>         concise, detailed or keywords
  summarize [style]     summarize the selected document
  compare <doc> <doc>   compare two documents
  search <term>         find clauses mentioning a term in every ready document
  check <doc> <type>    legal check: nda, msa, loan, employment or consultancy
  next | prev           step through differences
  clear                 clear the chat (or the summary on /app/summarize)
  delete <doc>          delete a document
  status                session counters and the last error
  quit                  leave";
