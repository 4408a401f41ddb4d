use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_STORAGE_DIR: &str = "storage-dir";
pub const ARG_MAX_UPLOAD_BYTES: &str = "max-upload-bytes";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Options {
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Options {
    /// Parse upload storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the storage directory is blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let storage_dir = matches
            .get_one::<String>(ARG_STORAGE_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_STORAGE_DIR}"))?;

        Ok(Self {
            storage_dir,
            max_upload_bytes: matches
                .get_one::<usize>(ARG_MAX_UPLOAD_BYTES)
                .copied()
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORAGE_DIR)
                .long(ARG_STORAGE_DIR)
                .help("Directory for product images and installers")
                .env("MLAB_STORAGE_DIR")
                .default_value(".installers"),
        )
        .arg(
            Arg::new(ARG_MAX_UPLOAD_BYTES)
                .long(ARG_MAX_UPLOAD_BYTES)
                .help("Maximum request body size in bytes")
                .env("MLAB_MAX_UPLOAD_BYTES")
                .default_value("536870912")
                .value_parser(clap::value_parser!(usize)),
        )
}
