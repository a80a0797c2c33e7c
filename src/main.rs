use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::{HumanBytes, ProgressBar, ProgressFinish, ProgressStyle};
use reqwest::Client;
use tokio::runtime::Runtime;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use nekotaku::cli::{Cli, Command, Parser};
use nekotaku::config::Config;
use nekotaku::nekos::data::{Image, Source};
use nekotaku::transport::Fetch;
use nekotaku::Error;

const SPINNER_FINISH_MODE: ProgressFinish = ProgressFinish::AndClear;
const SPINNER_TICK_SECS: f32 = 0.1;

#[inline]
fn build_spinner() -> ProgressBar {
    ProgressBar::new_spinner()
        .with_finish(SPINNER_FINISH_MODE)
        .with_style(
            ProgressStyle::with_template("{spinner:.blue} {msg:.bold}")
                .unwrap()
                // For more spinners check out the cli-spinners project:
                // https://github.com/sindresorhus/cli-spinners/blob/master/spinners.json
                // NOTE: use `ascii` only, because cmd/powershell maybe not support unicode.
                .tick_strings(&[".  ", ".. ", "...", " ..", "  .", "   "]),
        )
}

#[inline]
fn build_client() -> reqwest::Result<Client> {
    Client::builder().build()
}

/// `message` in bold green or red, colored only if stderr supports it.
fn status_line(message: &str, success: bool) -> String {
    let styled = console::style(message).for_stderr().bold();
    let styled = if success {
        styled.green()
    } else {
        styled.red()
    };
    styled.to_string()
}

/// Leave a green or red line on stderr, even when the spinner is hidden (not a tty).
fn finish_spinner(spinner: &ProgressBar, message: String, success: bool) {
    if spinner.is_hidden() {
        eprintln!("{}", status_line(&message, success));
        return;
    }
    let template = if success {
        "{msg:.green.bold}"
    } else {
        "{msg:.red.bold}"
    };
    spinner.set_style(ProgressStyle::with_template(template).unwrap());
    spinner.abandon_with_message(message);
}

#[inline]
fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_image(image: &Image) {
    match &image.source {
        Source::Gif { anime_name } => println!("{}\t{anime_name}", image.url),
        Source::Png {
            artist_name,
            source_url,
            ..
        } => println!("{}\t{artist_name}\t{source_url}", image.url),
    }
}

/// Run one command, returning the status line to show on success.
async fn async_main(
    command: Command,
    config: Config,
    spinner: &ProgressBar,
) -> anyhow::Result<String> {
    let client = build_client().context("failed to build reqwest client")?;

    match command {
        Command::Reactions => {
            spinner.set_message("Fetching reactions...");
            let reactions = config.otaku(client)?.reactions().await?;
            spinner.suspend(|| {
                for reaction in &reactions {
                    println!("{reaction}");
                }
            });
            Ok(format!("{} reactions fetched", reactions.len()))
        }
        Command::IsReaction { name } => {
            spinner.set_message("Finding a specific reaction...");
            let reactions = config.otaku(client)?.reactions().await?;
            if !reactions.contains(&name) {
                return Err(anyhow::anyhow!("Reaction `{name}` not found"));
            }
            Ok(format!("Reaction `{name}` found"))
        }
        Command::Reaction { name, format } => {
            spinner.set_message(format!("Fetching {format} info from {name} reaction..."));
            let gif = config.otaku(client)?.reaction(&name, format).await?;
            spinner.suspend(|| println!("{}", gif.url));
            Ok(format!("{} fetched", gif.format))
        }
        Command::Download {
            url,
            expect_size,
            output,
        } => {
            spinner.set_message(format!("Downloading {url}..."));
            let data_cursor = Arc::new(AtomicUsize::new(0));
            let future = Fetch::new(&client, url.as_str())
                .add_data_cursor(Arc::downgrade(&data_cursor))
                .build();
            tokio::pin!(future);

            let mut interval = tokio::time::interval(Duration::from_secs_f32(SPINNER_TICK_SECS));
            let body = loop {
                tokio::select! {
                    body = &mut future => break body?,
                    _ = interval.tick() => {
                        let received = data_cursor.load(Ordering::Acquire);
                        spinner.set_message(format!(
                            "Downloading {url}... {}",
                            HumanBytes(received.try_into().unwrap_or(u64::MAX))
                        ));
                    }
                }
            };

            if let Some(expect_size) = expect_size {
                if body.len() != expect_size {
                    return Err(anyhow::anyhow!(
                        "Size mismatch: {} != {expect_size}",
                        body.len()
                    ));
                }
            }
            if let Some(output) = output {
                tokio::fs::write(&output, body.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write: {}", output.display()))?;
            }
            Ok(format!("{} bytes downloaded", body.len()))
        }
        Command::Endpoints => {
            spinner.set_message("Fetching endpoints...");
            let endpoints = config.nekos(client)?.endpoints().await?;
            spinner.suspend(|| {
                for endpoint in &endpoints {
                    println!("{}\t{}", endpoint.name, endpoint.format);
                }
            });
            Ok(format!("{} endpoints fetched", endpoints.len()))
        }
        Command::Category { name, amount } => {
            spinner.set_message("Fetching endpoints...");
            let nekos = config.nekos(client)?;
            let endpoints = nekos.endpoints().await?;
            let endpoint = endpoints
                .get(&name)
                .with_context(|| format!("Endpoint `{name}` not found"))?;

            spinner.set_message(format!("Fetching {amount} images from {name}..."));
            let images = nekos.category(endpoint, amount)?.run().await?;
            spinner.suspend(|| images.iter().for_each(print_image));
            Ok(format!("{} images fetched", images.len()))
        }
        Command::Search {
            query,
            amount,
            format,
            category,
        } => {
            let nekos = config.nekos(client)?;
            let endpoints = match category {
                Some(_) => {
                    spinner.set_message("Fetching endpoints...");
                    Some(nekos.endpoints().await?)
                }
                None => None,
            };
            let endpoint = match (&category, &endpoints) {
                (Some(name), Some(endpoints)) => Some(
                    endpoints
                        .get(name)
                        .with_context(|| format!("Endpoint `{name}` not found"))?,
                ),
                _ => None,
            };

            spinner.set_message(format!("Searching {format} images of `{query}`..."));
            let images = nekos
                .search(&query, amount, format, endpoint)?
                .run()
                .await?;
            spinner.suspend(|| images.iter().for_each(print_image));
            Ok(format!("{} images found", images.len()))
        }
    }
}

/// Library errors carry their numeric code, even under added context.
fn failure_message(err: &anyhow::Error) -> String {
    // why `{:#}`: https://docs.rs/anyhow/1.0.86/anyhow/struct.Error.html#display-representations
    match err.downcast_ref::<Error>() {
        Some(lib_err) => format!("failed! Error code: {}. {err:#}", lib_err.kind().code()),
        None => format!("failed! {err:#}"),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // here, if parse fails, the program will be `abort`ed, and no `Drop` will be called,
    // but it's okay, because we don't need to clean up anything.
    let cli = Cli::parse();

    init_tracing(cli.log_directive());
    let config = cli.config()?;
    let command = cli.command;

    let spinner = build_spinner();
    spinner.enable_steady_tick(Duration::from_secs_f32(SPINNER_TICK_SECS));

    let runtime = Runtime::new().context("failed to build tokio runtime")?;
    let result = runtime.block_on(async {
        tokio::select! {
            result = async_main(command, config, &spinner) => Some(result),
            result = signal::ctrl_c() => {
                result.expect("failed to listen for ctrl-c signal");
                None
            },
        }
    });

    match result {
        Some(Ok(message)) => {
            finish_spinner(&spinner, format!("success. {message}"), true);
            Ok(ExitCode::SUCCESS)
        }
        Some(Err(err)) => {
            finish_spinner(&spinner, failure_message(&err), false);
            Ok(ExitCode::FAILURE)
        }
        None => {
            finish_spinner(&spinner, String::from("Ctrl-C received, exiting..."), false);
            Ok(ExitCode::from(130))
        }
    }
}
