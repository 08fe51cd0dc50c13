use std::io::Write;

use anyhow::{Context, Result};
use jobcache_core::utils::truncate_string;
use jobcache_core::worker::EventReply;
use jobcache_core::{ActionKind, ControlMessage, FetchRequest, SyncReport, WorkerEvent};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use super::{parse_json_arg, CacheCommand, QueueCommand};
use crate::context::AppContext;
use crate::output::{print_json, row};

/// Queue depth between stdin and the worker in `run`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub async fn install(ctx: &AppContext) -> Result<()> {
    let worker = ctx.worker()?;
    worker.install().await?;
    println!("Installed and active ({})", worker.settings().names.static_assets);
    Ok(())
}

pub async fn activate(ctx: &AppContext) -> Result<()> {
    let deleted = ctx.worker()?.activate().await?;
    if ctx.json {
        return print_json(&deleted);
    }
    if deleted.is_empty() {
        println!("No stale caches");
    }
    for namespace in deleted {
        println!("Deleted {}", namespace);
    }
    Ok(())
}

/// Split a `Name: value` header argument.
fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like 'Name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header name is empty in '{}'", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn fetch(
    ctx: &AppContext,
    method: &str,
    url: &str,
    navigate: bool,
    data: Option<String>,
    headers: &[String],
) -> Result<()> {
    let mut request = match data {
        Some(body) => {
            let body = parse_json_arg("--data", &body)?;
            FetchRequest::json(method, url, &body)?
        }
        None => FetchRequest::new(method, url),
    };
    if navigate {
        request = FetchRequest { mode: jobcache_core::RequestMode::Navigate, ..request };
    }
    for header in headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(&name, value);
    }

    let response = ctx.worker()?.handle_fetch(&request).await?;
    if ctx.json {
        return print_json(&response);
    }

    eprintln!("HTTP {} {}", response.status, response.status_text);
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response.body)?;
    if !response.body.ends_with(b"\n") {
        writeln!(stdout)?;
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "{}: {} sent, {} still queued",
        report.kind,
        report.replayed.len(),
        report.retained.len()
    );
}

pub async fn sync(ctx: &AppContext, tag: Option<&str>) -> Result<()> {
    let worker = ctx.worker()?;
    let reports = match tag {
        Some(tag) => match worker.handle_sync(tag).await? {
            Some(report) => vec![report],
            None => anyhow::bail!(
                "Unknown sync tag '{}' (expected apply-job, update-profile or search-jobs)",
                tag
            ),
        },
        None => worker.sync_all().await?,
    };

    if ctx.json {
        return print_json(&reports);
    }
    reports.iter().for_each(print_report);
    Ok(())
}

pub async fn push(ctx: &AppContext, payload: Option<&str>) -> Result<()> {
    let data = payload.map(|raw| parse_json_arg("payload", raw)).transpose()?;
    let notification = ctx.worker()?.handle_push(data.as_ref()).await;
    if ctx.json {
        print_json(&notification)?;
    }
    Ok(())
}

pub async fn message(ctx: &AppContext, raw: &str) -> Result<()> {
    let message: ControlMessage =
        serde_json::from_str(raw).context("Invalid control message")?;
    ctx.worker()?.handle_message(&message).await?;
    println!("Handled {:?}", message);
    Ok(())
}

/// One reply as a JSON line, tagged with the event's sequence number.
fn reply_line(seq: u64, reply: &EventReply) -> String {
    let mut value = serde_json::to_value(reply).unwrap_or_else(|e| {
        serde_json::json!({ "reply": "failed", "error": e.to_string() })
    });
    if let Value::Object(map) = &mut value {
        map.insert("seq".to_string(), seq.into());
    }
    value.to_string()
}

/// Read `WorkerEvent`s as JSON lines from stdin until EOF, handling each on
/// its own task, and print one reply line per event.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let worker = ctx.worker()?;
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (reply_tx, mut reply_rx) = mpsc::channel::<(u64, EventReply)>(EVENT_CHANNEL_CAPACITY);

    let server = tokio::spawn(async move { worker.serve(event_rx, reply_tx).await });
    let printer = tokio::spawn(async move {
        while let Some((seq, reply)) = reply_rx.recv().await {
            println!("{}", reply_line(seq, &reply));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        seq += 1;
        match serde_json::from_str::<WorkerEvent>(line) {
            Ok(event) => {
                if event_tx.send((seq, event)).await.is_err() {
                    warn!("Worker stopped accepting events");
                    break;
                }
            }
            Err(e) => {
                let reply = EventReply::Failed {
                    error: format!("Invalid event: {}", e),
                };
                println!("{}", reply_line(seq, &reply));
            }
        }
    }
    drop(event_tx);

    server.await?;
    printer.await?;
    Ok(())
}

pub async fn cache(ctx: &AppContext, action: CacheCommand) -> Result<()> {
    let worker = ctx.worker()?;
    let names = &worker.settings().names;

    match action {
        CacheCommand::List { namespace } => {
            let namespaces = match namespace {
                Some(ns) => vec![ns],
                None => worker.caches().namespaces()?,
            };
            if ctx.json {
                let mut all = serde_json::Map::new();
                for ns in &namespaces {
                    all.insert(ns.clone(), serde_json::to_value(worker.caches().entries(ns)?)?);
                }
                return print_json(&all);
            }
            if namespaces.is_empty() {
                println!("No caches");
            }
            for ns in namespaces {
                let entries = worker.caches().entries(&ns)?;
                let marker = if names.contains(&ns) { "current" } else { "stale" };
                println!("{} ({}, {} entries)", ns, marker, entries.len());
                for entry in entries {
                    let status = entry.response.status.to_string();
                    let age = entry.age_display();
                    println!(
                        "  {}",
                        row(&[
                            (entry.key.method.as_str(), 6),
                            (status.as_str(), 4),
                            (age.as_str(), 10),
                            (entry.key.url.as_str(), 80),
                        ])
                    );
                }
            }
            Ok(())
        }
        CacheCommand::Clear { all } => {
            if all {
                for ns in worker.caches().namespaces()? {
                    worker.caches().delete(&ns)?;
                    println!("Deleted {}", ns);
                }
            } else {
                worker.handle_message(&ControlMessage::ClearCache).await?;
                println!("Cleared {} and {}", names.static_assets, names.api);
            }
            Ok(())
        }
        CacheCommand::Add { urls } => {
            let count = urls.len();
            worker
                .handle_message(&ControlMessage::CacheUrls { urls })
                .await?;
            println!("Cached {} URL(s) in {}", count, names.static_assets);
            Ok(())
        }
    }
}

fn parse_kind(tag: &str) -> Result<ActionKind> {
    ActionKind::from_tag(tag).with_context(|| {
        format!(
            "Unknown action kind '{}' (expected apply-job, update-profile or search-jobs)",
            tag
        )
    })
}

pub fn queue(ctx: &AppContext, action: QueueCommand) -> Result<()> {
    let worker = ctx.worker()?;
    let queue = worker.queue();

    match action {
        QueueCommand::List => {
            let pending = queue.list_all()?;
            if ctx.json {
                return print_json(&pending);
            }
            if pending.is_empty() {
                println!("Nothing queued");
            }
            for action in pending {
                let kind = action.kind.to_string();
                let created = action.created_at.format("%Y-%m-%d %H:%M").to_string();
                let payload = truncate_string(&action.payload.to_string(), 60);
                println!(
                    "{}",
                    row(&[
                        (action.id.as_str(), 22),
                        (kind.as_str(), 14),
                        (created.as_str(), 16),
                        (payload.as_str(), 60),
                    ])
                );
            }
            Ok(())
        }
        QueueCommand::Clear { tag } => {
            let kinds = match tag {
                Some(tag) => vec![parse_kind(&tag)?],
                None => ActionKind::ALL.to_vec(),
            };
            let mut removed = 0;
            for kind in kinds {
                removed += queue.clear(kind)?;
            }
            println!("Removed {} queued action(s)", removed);
            Ok(())
        }
    }
}
