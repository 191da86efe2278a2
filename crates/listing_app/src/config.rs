//! Command-line options and their resolution into a validated run configuration.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate};
use clap::Parser;
use listing_core::{parse_date, DateWindow, DateWindower, DEFAULT_INCREMENT_DAYS};
use listing_engine::{ApiCredentials, ApiSettings, HarvestOptions, DEFAULT_API_URL};

const DEFAULT_START_DATE: &str = "01/01/2022";
const DEFAULT_ROOT_DIR: &str = "EbayListings";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "listing_harvester",
    about = "Download a seller's listings into a local directory tree"
)]
pub struct Cli {
    /// Fetch and parse listings without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// First day of the range, DD/MM/YYYY
    #[arg(long, default_value = DEFAULT_START_DATE)]
    pub start_date: String,

    /// Last day of the range, DD/MM/YYYY (defaults to today)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Page to start from in every window
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Fetch only `--page` over the whole start..end range
    #[arg(long)]
    pub single_page: bool,

    /// Days covered by one request window
    #[arg(long, default_value_t = DEFAULT_INCREMENT_DAYS)]
    pub increment_days: u64,

    /// Root of the listing tree (defaults to $HOME/EbayListings)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Trading API endpoint
    #[arg(long, env = "EBAY_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Marketplace site id
    #[arg(long, env = "EBAY_SITE_ID", default_value = "15")]
    pub site_id: String,

    /// Seller whose listings are harvested
    #[arg(long, env = "USER_ID")]
    pub user_id: Option<String>,

    /// API auth token
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub increment_days: u64,
    pub root: PathBuf,
    pub api: ApiSettings,
    pub credentials: ApiCredentials,
    pub options: HarvestOptions,
    pub verbose: bool,
}

impl RunConfig {
    /// Validates the parsed flags. `today` stands in for the clock and `home`
    /// for `$HOME`.
    pub fn resolve(cli: Cli, today: NaiveDate, home: Option<PathBuf>) -> Result<Self> {
        if cli.increment_days == 0 {
            bail!("--increment-days must be at least 1");
        }
        let start = parse_date(&cli.start_date).context("invalid --start-date")?;
        let mut end = match cli.end_date.as_deref() {
            Some(input) => parse_date(input).context("invalid --end-date")?,
            None => today,
        };
        if start >= end {
            end = start
                .checked_add_days(Days::new(cli.increment_days))
                .context("--start-date plus --increment-days is out of range")?;
        }

        let root = match (cli.output_dir, home) {
            (Some(dir), _) => dir,
            (None, Some(home)) => home.join(DEFAULT_ROOT_DIR),
            (None, None) => bail!("HOME is not set; pass --output-dir"),
        };

        let credentials = match (cli.user_id, cli.auth_token) {
            (Some(user_id), Some(auth_token))
                if !user_id.trim().is_empty() && !auth_token.trim().is_empty() =>
            {
                ApiCredentials {
                    user_id,
                    auth_token,
                }
            }
            _ => bail!("USER_ID and AUTH_TOKEN must be set (flag, environment or .env)"),
        };

        let api = ApiSettings {
            endpoint: cli.api_url,
            site_id: cli.site_id,
            ..ApiSettings::default()
        };

        Ok(Self {
            start,
            end,
            increment_days: cli.increment_days,
            root,
            api,
            credentials,
            options: HarvestOptions {
                dry_run: cli.dry_run,
                start_page: cli.page.max(1),
                single_page: cli.single_page,
            },
            verbose: cli.verbose,
        })
    }

    /// Windows to harvest, in order. Single-page mode covers the whole range
    /// with one window.
    pub fn windows(&self, today: NaiveDate) -> Result<Vec<DateWindow>> {
        if self.options.single_page {
            return Ok(vec![DateWindow::new(self.start, self.end)]);
        }
        let windower = DateWindower::new(self.start, Some(self.end), self.increment_days)?
            .with_today(today);
        Ok(windower.collect())
    }
}
