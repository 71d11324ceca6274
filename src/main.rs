//! archivefs - inspect and edit ZIP/JAR archives through the archive filesystem.

use anyhow::{Context, Result};
use archivefs::ArchiveOptions;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Write;
use std::path::PathBuf;

fn cli() -> Command {
    let archive = Arg::new("archive")
        .help("Path or URI of the archive")
        .required(true)
        .index(1);
    let entry = Arg::new("entry")
        .help("Entry path inside the archive")
        .required(true)
        .index(2);

    Command::new("archivefs")
        .version(archivefs::VERSION)
        .about("Inspect and edit ZIP and JAR archives as filesystems")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List entries of an archive")
                .arg(archive.clone()),
        )
        .subcommand(
            Command::new("cat")
                .about("Write an entry's contents to stdout")
                .arg(archive.clone())
                .arg(entry.clone()),
        )
        .subcommand(
            Command::new("put")
                .about("Store a local file as an entry")
                .arg(archive.clone())
                .arg(entry.clone())
                .arg(
                    Arg::new("file")
                        .help("Local file to store")
                        .required(true)
                        .index(3),
                )
                .arg(
                    Arg::new("create")
                        .long("create")
                        .help("Create the archive if it does not exist")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("stored")
                        .long("stored")
                        .help("Store the entry without compression")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Remove an entry")
                .arg(archive)
                .arg(entry),
        )
}

/// Paths are the common case; anything with a scheme is treated as a URI
fn location(matches: &ArgMatches) -> archivefs::ArchiveLocation {
    let raw = matches
        .get_one::<String>("archive")
        .cloned()
        .expect("archive argument is required");
    if raw.contains("://") || raw.starts_with("archive:") {
        archivefs::ArchiveLocation::Uri(raw)
    } else {
        archivefs::ArchiveLocation::Path(PathBuf::from(raw))
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_else(|| panic!("{name} argument is required"))
}

#[cfg(feature = "config")]
fn base_options() -> Result<ArchiveOptions> {
    let config = archivefs::config::Config::load().context("Failed to load configuration")?;
    Ok(config.archive_options())
}

#[cfg(not(feature = "config"))]
fn base_options() -> Result<ArchiveOptions> {
    Ok(ArchiveOptions::new())
}

fn main() -> Result<()> {
    // Initialize logging for development
    env_logger::init();

    let matches = cli().get_matches();
    let options = base_options()?;

    match matches.subcommand() {
        Some(("list", sub)) => {
            let handle = archivefs::open_with(location(sub), &options.create(false))?;
            for name in handle.entry_names()? {
                println!("{name}");
            }
            archivefs::close(&handle)?;
        }
        Some(("cat", sub)) => {
            let handle = archivefs::open_with(location(sub), &options.create(false))?;
            let bytes = archivefs::read_all_bytes(&handle, required(sub, "entry"))?;
            std::io::stdout()
                .lock()
                .write_all(&bytes)
                .context("Failed to write entry to stdout")?;
            archivefs::close(&handle)?;
        }
        Some(("put", sub)) => {
            let mut options = options;
            if sub.get_flag("create") {
                options = options.create(true);
            }
            if sub.get_flag("stored") {
                options = options.compression(archivefs::EntryCompression::Stored);
            }

            let source = required(sub, "file");
            let contents =
                std::fs::read(source).with_context(|| format!("Failed to read {source}"))?;
            let handle = archivefs::open_with(location(sub), &options)?;
            handle.write(required(sub, "entry"), contents)?;
            archivefs::close(&handle)?;
        }
        Some(("rm", sub)) => {
            let handle = archivefs::open_with(location(sub), &options.create(false))?;
            handle.remove(required(sub, "entry"))?;
            archivefs::close(&handle)?;
        }
        _ => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}
