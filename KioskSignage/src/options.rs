//! Command line handling.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

pub const USAGE: &str = "\
Usage: KioskSignage [--config-dir <dir>] [--base-url <url>] [--timeout-ms <ms>]
                    [--refresh-secs <secs>] [--paused]

Options:
  --config-dir <dir>     Configuration directory (default: $KIOSK_CONFIG, ./.kiosk, ~/.kiosk)
  --base-url <url>       Signage server, overrides server.base_url
  --timeout-ms <ms>      HTTP timeout, overrides server.timeout_ms
  --refresh-secs <secs>  Playlist refresh period, 0 disables it
  --paused               Start with rotation paused
  -h, --help             Print this help

Environment:
  KIOSK_CONFIG__SECTION__KEY=value  Override any configuration key
  RUST_LOG                          tracing filter (e.g. kioskdisplay=debug)";

/// Values given on the command line; `None` means "use the configuration".
#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub config_dir: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub refresh: Option<Duration>,
    pub paused: bool,
    pub help: bool,
}

pub fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-dir" => options.config_dir = Some(value_of(&mut args, &arg)?),
            "--base-url" => options.base_url = Some(value_of(&mut args, &arg)?),
            "--timeout-ms" => {
                let value = value_of(&mut args, &arg)?;
                let millis: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid value for --timeout-ms: {value}"))?;
                options.timeout = Some(Duration::from_millis(millis.max(1)));
            }
            "--refresh-secs" => {
                let value = value_of(&mut args, &arg)?;
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid value for --refresh-secs: {value}"))?;
                options.refresh = Some(Duration::from_secs(secs));
            }
            "--paused" => options.paused = true,
            "--help" | "-h" => options.help = true,
            other => bail!("Unknown argument: {other}. Use --help for usage."),
        }
    }

    Ok(options)
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}
