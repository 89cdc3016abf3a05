use anyhow::{bail, Context};
use colored::Colorize;
use fsp_diff::{diff_field_sets, FieldChange};
use fsp_store::{FieldSetStore, PersistentStore, StoreConfig};
use fsp_types::{sanitize, FieldSet, FieldValue, ObjectId, ScopeId};
use serde_json::{json, Value};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match &cli.command {
        Command::Sanitize(args) => cmd_sanitize(args, format),
        Command::Unsanitize(args) => cmd_unsanitize(args, format),
        Command::Get(args) => cmd_get(&open_store(&cli)?, &scope(&cli), args, format),
        Command::Set(args) => cmd_set(&open_store(&cli)?, &scope(&cli), args, format),
        Command::Remove(args) => cmd_remove(&open_store(&cli)?, args, format),
        Command::List => cmd_list(&open_store(&cli)?, format),
    }
}

fn scope(cli: &Cli) -> ScopeId {
    ScopeId::new(cli.scope.as_str())
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.base_dir {
        config.base_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_store(cli: &Cli) -> anyhow::Result<PersistentStore> {
    Ok(PersistentStore::open(load_config(cli)?)?)
}

fn cmd_get(store: &PersistentStore, scope: &ScopeId, args: &GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let Some(cached) = store.get_field_set(&args.id, scope)? else {
        bail!("no field set stored for {}", args.id);
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cached.fields)?),
        OutputFormat::Text => {
            let type_name = cached.fields.type_name.as_deref().unwrap_or("untyped");
            println!("{} ({}, {})", args.id.bold(), type_name.cyan(), cached.timestamp.to_string().dimmed());
            for (name, value) in &cached.fields {
                println!("  {} = {}", name.yellow(), plain(value));
            }
        }
    }
    Ok(())
}

fn cmd_set(store: &PersistentStore, scope: &ScopeId, args: &SetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut fields = args
        .fields
        .iter()
        .map(String::as_str)
        .map(parse_assignment)
        .collect::<anyhow::Result<FieldSet>>()?;
    fields.type_name = args.type_name.clone();

    let before = store
        .get_field_set(&args.id, scope)?
        .map(|cached| cached.fields)
        .unwrap_or_default();
    let timestamp = store.store_changed_fields(&args.id, &fields, scope)?;
    let after = store
        .get_field_set(&args.id, scope)?
        .map(|cached| cached.fields)
        .unwrap_or_default();
    let changes = diff_field_sets(&before, &after);

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "id": args.id,
                "timestamp": timestamp.as_u64(),
                "added": changes.additions(),
                "modified": changes.modifications(),
            })
        ),
        OutputFormat::Text => {
            println!(
                "{} Stored {} at {} ({} added, {} modified)",
                "✓".green().bold(),
                args.id.bold(),
                timestamp,
                changes.additions(),
                changes.modifications()
            );
            for change in &changes.changes {
                match change {
                    FieldChange::Added { name, value } => {
                        println!("  {} {} = {}", "+".green(), name, plain(value))
                    }
                    FieldChange::Modified { name, old, new } => {
                        println!("  {} {}: {} -> {}", "~".yellow(), name, plain(old), plain(new))
                    }
                    FieldChange::Removed { name, .. } => println!("  {} {}", "-".red(), name),
                }
            }
        }
    }
    Ok(())
}

fn cmd_remove(store: &PersistentStore, args: &RemoveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let existed = store.remove_field_set(&args.id)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "id": args.id, "removed": existed })),
        OutputFormat::Text if existed => println!("{} Removed {}", "✓".green().bold(), args.id.bold()),
        OutputFormat::Text => println!("Nothing stored for {}", args.id.bold()),
    }
    Ok(())
}

fn cmd_list(store: &PersistentStore, format: OutputFormat) -> anyhow::Result<()> {
    let ids = store.list_ids()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
        OutputFormat::Text if ids.is_empty() => println!("No objects stored."),
        OutputFormat::Text => {
            for id in &ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn cmd_sanitize(args: &SanitizeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = sanitize(&args.raw);
    match format {
        OutputFormat::Json => println!("{}", json!({ "raw": args.raw, "sanitized": id.as_str() })),
        OutputFormat::Text => println!("{id}"),
    }
    Ok(())
}

fn cmd_unsanitize(args: &UnsanitizeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = ObjectId::parse(&args.id)?.to_raw()?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "sanitized": args.id, "raw": raw })),
        OutputFormat::Text => println!("{raw}"),
    }
    Ok(())
}

/// Parse `field=<json>`. A value that is not valid JSON is taken as text.
fn parse_assignment(assignment: &str) -> anyhow::Result<(String, FieldValue)> {
    let Some((name, raw)) = assignment.split_once('=') else {
        bail!("expected field=value, got {assignment:?}");
    };
    if name.is_empty() {
        bail!("empty field name in {assignment:?}");
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), FieldValue::from(value)))
}

/// Untagged JSON rendering of a field value, for human-readable output.
fn plain(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => json!(b),
        FieldValue::Int(i) => json!(i),
        FieldValue::Float(f) => json!(f),
        FieldValue::Text(s) => json!(s),
        FieldValue::List(items) | FieldValue::Array(items) => {
            Value::Array(items.iter().map(plain).collect())
        }
        FieldValue::Map(entries) => entries
            .iter()
            .map(|(k, v)| (k.clone(), plain(v)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        FieldValue::Object(record) => {
            let mut out: serde_json::Map<String, Value> = record
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), plain(v)))
                .collect();
            if let Some(uid) = record.uid {
                out.insert("$uid".into(), json!(uid.to_string()));
            }
            Value::Object(out)
        }
    }
}
