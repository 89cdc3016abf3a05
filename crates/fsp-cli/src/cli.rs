use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fsp",
    about = "Field-set persistence: inspect and edit a store directory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML store configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory, overriding the configuration file
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Scope to read and write through
    #[arg(long, global = true, default_value = "default")]
    pub scope: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the stored fields of an object
    Get(GetArgs),
    /// Set fields of an object (shallow merge)
    Set(SetArgs),
    /// Delete an object
    Remove(RemoveArgs),
    /// List stored object ids
    List,
    /// Print the sanitized form of a raw id
    Sanitize(SanitizeArgs),
    /// Print the raw id behind a sanitized id
    Unsanitize(UnsanitizeArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub id: String,
    /// Assignments of the form `field=<json>`; bare words are stored as text
    #[arg(required = true)]
    pub fields: Vec<String>,
    /// Type name to record with the fields
    #[arg(long = "type")]
    pub type_name: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub id: String,
}

#[derive(Args)]
pub struct SanitizeArgs {
    pub raw: String,
}

#[derive(Args)]
pub struct UnsanitizeArgs {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get() {
        let cli = Cli::try_parse_from(["fsp", "get", "p1"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.id, "p1");
        } else { panic!("wrong command"); }
        assert_eq!(cli.scope, "default");
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_set_with_type() {
        let cli = Cli::try_parse_from(["fsp", "set", "p1", "name=Ann", "age=20", "--type", "Person"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.fields, vec!["name=Ann", "age=20"]);
            assert_eq!(args.type_name.as_deref(), Some("Person"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_requires_fields() {
        assert!(Cli::try_parse_from(["fsp", "set", "p1"]).is_err());
    }

    #[test]
    fn parse_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fsp", "list", "--base-dir", "/tmp/store", "--scope", "v2", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::List));
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/store")));
        assert_eq!(cli.scope, "v2");
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_sanitize() {
        let cli = Cli::try_parse_from(["fsp", "sanitize", "Cart/42"]).unwrap();
        assert!(matches!(cli.command, Command::Sanitize(ref a) if a.raw == "Cart/42"));
    }
}
