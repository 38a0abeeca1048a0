use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Text};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use weatherapp_core::{
    Config, Dispatcher, HttpFetcher, RenderEvent, RenderUpdate, WeatherPipeline,
    config::API_KEY_ENV,
};

use crate::render::Renderer;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherapp", version, about = "Current weather and 5-day forecast from OpenWeather")]
pub struct Cli {
    /// Print newline-delimited JSON render events instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather and the 5-day forecast for a city.
    Show {
        /// City name; prompted for if absent.
        city: Option<String>,
    },

    /// Keep prompting for cities until the prompt is cancelled (Esc or Ctrl-C).
    Interactive,

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the config file path.
    Path,

    /// Print the effective configuration.
    Show,

    /// Write a config file with the default endpoints.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let Cli { json, config, command } = self;
        let config_path = match config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match command {
            Command::Show { city } => {
                let city = match city {
                    Some(city) => city,
                    None => match prompt_city()? {
                        Some(city) => city,
                        None => return Ok(ExitCode::SUCCESS),
                    },
                };

                let mut session = Session::start(&config_path, json)?;
                session.request(&city).await?;
                Ok(session.exit_code())
            }
            Command::Interactive => {
                let mut session = Session::start(&config_path, json)?;
                while let Some(city) = prompt_city()? {
                    session.request(&city).await?;
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Config { action } => {
                run_config(action, &config_path)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// One dispatcher plus the receiving end of its events.
struct Session {
    dispatcher: Dispatcher<HttpFetcher>,
    events: UnboundedReceiver<RenderEvent>,
    renderer: Renderer,
}

impl Session {
    fn start(config_path: &Path, json: bool) -> Result<Self> {
        let config = Config::load_from(config_path)?.with_api_key_from_env();
        debug!(path = %config_path.display(), api_key = config.api_key().is_some(), "configuration loaded");
        let renderer = Renderer::new(json, config.endpoints.icon.clone());
        let (dispatcher, events) = Dispatcher::new(WeatherPipeline::new(config, HttpFetcher::new()));

        Ok(Self { dispatcher, events, renderer })
    }

    /// Submit `city` and render its events until the request finishes.
    async fn request(&mut self, city: &str) -> Result<()> {
        self.dispatcher.submit(city);

        while let Some(event) = self.events.recv().await {
            if self.dispatcher.is_stale(&event) {
                debug!(request = event.request, "dropping event from superseded request");
                continue;
            }
            self.renderer.handle(city, &event)?;
            if event.update == RenderUpdate::Finished {
                break;
            }
        }

        Ok(())
    }

    fn exit_code(&self) -> ExitCode {
        if self.renderer.had_messages() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
    }
}

/// `None` when the user cancels the prompt.
fn prompt_city() -> Result<Option<String>> {
    let answer = tokio::task::block_in_place(|| {
        Text::new("City:").with_help_message("Esc to quit").prompt()
    });

    match answer {
        Ok(city) => Ok(Some(city)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e).context("Failed to read city name"),
    }
}

fn run_config(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_from(path)?.with_api_key_from_env();
            print!("{}", config.to_toml_string()?);
            let key_state = if config.api_key().is_some() { "set" } else { "not set" };
            println!("# {API_KEY_ENV}: {key_state}");
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists: {}.\n\
                     Hint: pass `--force` to overwrite it.",
                    path.display()
                );
            }
            Config::default().save_to(path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
