//! A core module for command line interface.
//!
//! See [`Cli`] for more information.

use std::path::PathBuf;

pub use clap::{CommandFactory, Parser};
use clap::{ArgAction, Subcommand};

use crate::config::{Config, Validate};
use crate::{nekos, otaku};

/// [`clap`] command line interface.
///
/// Each subcommand performs one request, prints what it got to stdout,
/// and exits with a non-zero code on any failure.
///
/// # Example
///
/// ```no_run
/// use nekotaku::cli::{Cli, Parser as _};
///
/// let cli = Cli::parse();
/// let config = cli.config()?;
///
/// Ok::<(), anyhow::Error>(())
/// ```
#[non_exhaustive]
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The base url of the nekos.best API.
    #[arg(long, global = true, value_name = "URL", default_value = nekos::url::BASE_URL)]
    pub nekos_url: String,

    /// The base url of the otakugifs API.
    #[arg(long, global = true, value_name = "URL", default_value = otaku::url::BASE_URL)]
    pub otaku_url: String,

    /// Increase logging verbosity, `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The request to make.
    #[command(subcommand)]
    pub command: Command,
}

/// The requests the command line can make.
#[derive(Subcommand)]
pub enum Command {
    /// List every otakugifs reaction.
    Reactions,
    /// Check whether NAME is an otakugifs reaction.
    IsReaction {
        /// The reaction name, case-sensitive.
        name: String,
    },
    /// Fetch a random GIF of an otakugifs reaction.
    Reaction {
        /// The reaction name, e.g. `kiss`.
        name: String,
        /// The container format to ask for.
        #[arg(short, long, value_enum, default_value_t = otaku::data::Format::Gif)]
        format: otaku::data::Format,
    },
    /// Download a file and report its size.
    Download {
        /// The url of the file.
        url: String,
        /// Fail if the body is not exactly this many bytes.
        #[arg(long, value_name = "BYTES")]
        expect_size: Option<usize>,
        /// Write the body to this file.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// List every nekos.best endpoint with its format.
    Endpoints,
    /// Fetch random images of a nekos.best endpoint.
    Category {
        /// The endpoint name, e.g. `neko`.
        name: String,
        /// How many images to fetch.
        #[arg(short, long, default_value_t = 1, value_parser = amount_parser())]
        amount: u8,
    },
    /// Search nekos.best images by artist or anime name.
    Search {
        /// The artist or anime name to look for.
        query: String,
        /// How many images to fetch.
        #[arg(short, long, default_value_t = 1, value_parser = amount_parser())]
        amount: u8,
        /// The kind of image to search.
        #[arg(short, long, value_enum, default_value_t = nekos::data::Format::Png)]
        format: nekos::data::Format,
        /// Restrict the search to this endpoint.
        #[arg(short, long, value_name = "NAME")]
        category: Option<String>,
    },
}

#[inline]
fn amount_parser() -> clap::builder::RangedI64ValueParser<u8> {
    clap::value_parser!(u8).range(1..=i64::from(nekos::MAX_AMOUNT))
}

impl Cli {
    /// Build the validated [`Config`] from the url flags.
    ///
    /// # Errors
    ///
    /// If one of the urls is invalid.
    pub fn config(&self) -> anyhow::Result<Config> {
        let config = Config::new(&self.nekos_url, &self.otaku_url);
        config.validate()?;
        Ok(config)
    }

    /// The default `tracing` filter directive for [`Self::verbose`].
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reaction() {
        let args = ["nekotaku", "reaction", "kiss", "--format", "avif"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Reaction { ref name, format: otaku::data::Format::Avif } if name == "kiss"
        ));
        assert_eq!(cli.log_directive(), "warn");
        cli.config().unwrap();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "nekotaku", "-vv", "search", "artist", "--amount", "5", "--format", "gif",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Search { amount: 5, format: nekos::data::Format::Gif, category: None, .. }
        ));
        assert_eq!(cli.log_directive(), "debug");

        assert!(Cli::try_parse_from(["nekotaku", "search", "artist", "--amount", "0"]).is_err());
        assert!(Cli::try_parse_from(["nekotaku", "category", "neko", "--amount", "21"]).is_err());
    }

    #[test]
    fn test_invalid_url_flag() {
        let cli = Cli::try_parse_from(["nekotaku", "--otaku-url", "nope", "reactions"]).unwrap();
        assert!(cli.config().is_err());
    }
}
