use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hvac_adapters_thermostat::{ClientConfig, ThermostatClient};
use hvac_core::{EditableSettings, FanStatus, SystemMode, ThermostatData};
use hvac_proxy::{run_server, ServerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hvac")]
#[command(version)]
#[command(about = "HVAC - serialized access to a single thermostat", long_about = None)]
struct Cli {
    /// Proxy base URL used by read/info/set
    #[arg(long, global = true, env = "HVAC_PROXY_URL")]
    proxy_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Thermostat base URL
        #[arg(short, long)]
        backend_url: Option<String>,

        /// Bearer token presented to the thermostat
        #[arg(long)]
        auth_token: Option<String>,

        /// GET cache lifetime in milliseconds
        #[arg(long)]
        cache_ttl_ms: Option<u64>,

        /// Do not print the startup banner
        #[arg(long)]
        quiet: bool,
    },

    /// Show the current thermostat state
    Read {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the device serial number
    Info,

    /// Change settings; anything not given keeps its current value
    Set {
        /// Set-point temperature
        #[arg(long)]
        setpoint: Option<i64>,

        /// Fan status (low, mid, high, auto_low, auto_mid, auto_high, auto_stop)
        #[arg(long)]
        fan: Option<FanStatus>,

        /// System mode (cool, heat, ventilation, auto_cool, auto_heat)
        #[arg(long)]
        mode: Option<SystemMode>,

        /// Lower set-point limit
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=31))]
        lower: Option<u8>,

        /// Upper set-point limit
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=31))]
        upper: Option<u8>,
    },
}

/// Overrides for [`EditableSettings`]; `None` keeps the current value
#[derive(Debug, Default, PartialEq)]
struct SettingsPatch {
    setpoint: Option<i64>,
    fan: Option<FanStatus>,
    mode: Option<SystemMode>,
    lower: Option<u8>,
    upper: Option<u8>,
}

impl SettingsPatch {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, current: &ThermostatData) -> EditableSettings {
        let mut settings = EditableSettings::from(current);
        if let Some(setpoint) = self.setpoint {
            settings.set_point_temp = setpoint;
        }
        if let Some(fan) = self.fan {
            settings.fan_status = fan;
        }
        if let Some(mode) = self.mode {
            settings.system_mode = mode;
        }
        if let Some(lower) = self.lower {
            settings.set_point_lower_limit = lower;
        }
        if let Some(upper) = self.upper {
            settings.set_point_upper_limit = upper;
        }
        settings
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn client(proxy_url: Option<String>) -> anyhow::Result<ThermostatClient> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = proxy_url {
        config.base_url = url;
    }
    ThermostatClient::new(config).context("Failed to create thermostat client")
}

fn print_data(data: &ThermostatData) {
    println!("=== Thermostat ===");
    println!("Temperature:  {:.1} °C", data.temperature);
    println!("Set-point:    {} °C", data.set_point_temp);
    println!(
        "Limits:       {} - {} °C",
        data.set_point_lower_limit, data.set_point_upper_limit
    );
    println!("Fan:          {}", data.fan_status);
    println!("Mode:         {}", data.system_mode);
    println!("Power:        {}", data.power_on);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            backend_url,
            auth_token,
            cache_ttl_ms,
            quiet,
        } => {
            init_logging("hvac_proxy=info,tower_http=info");

            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config.proxy.port = port;
            }
            if let Some(url) = backend_url {
                config.proxy.backend_url = url;
            }
            if let Some(token) = auth_token {
                config.proxy.auth_token = token;
            }
            if let Some(ttl) = cache_ttl_ms {
                config.cache.ttl = Duration::from_millis(ttl);
            }
            config.print_banner = !quiet;

            run_server(config).await?;
        }

        Commands::Read { json } => {
            init_logging("warn");
            let client = client(cli.proxy_url)?;

            let data = client
                .read_registers()
                .await
                .context("Device is offline")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_data(&data);
            }
        }

        Commands::Info => {
            init_logging("warn");
            let info = client(cli.proxy_url)?.get_info().await;
            println!("Serial number: {}", info.serial_number);
        }

        Commands::Set {
            setpoint,
            fan,
            mode,
            lower,
            upper,
        } => {
            init_logging("warn");
            let patch = SettingsPatch {
                setpoint,
                fan,
                mode,
                lower,
                upper,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change. Pass at least one of --setpoint, --fan, --mode, --lower, --upper.");
            }

            let client = client(cli.proxy_url)?;
            let current = client.get_data().await?;
            let settings = patch.apply(&current);
            if settings.set_point_lower_limit > settings.set_point_upper_limit {
                anyhow::bail!(
                    "Lower limit {} is above upper limit {}",
                    settings.set_point_lower_limit,
                    settings.set_point_upper_limit
                );
            }

            let writes = client.set_data(&settings).await?;
            if writes.is_empty() {
                println!("Already up to date");
            } else {
                for write in &writes {
                    println!("✓ {} = {}", write.parameter, write.value);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from([
            "hvac", "set", "--setpoint", "23", "--fan", "auto_high", "--mode", "heat",
        ])
        .unwrap();

        match cli.command {
            Commands::Set {
                setpoint, fan, mode, ..
            } => {
                assert_eq!(setpoint, Some(23));
                assert_eq!(fan, Some(FanStatus::AutoHigh));
                assert_eq!(mode, Some(SystemMode::Heat));
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Cli::try_parse_from(["hvac", "set", "--fan", "turbo"]).is_err());
        assert!(Cli::try_parse_from(["hvac", "set", "--upper", "40"]).is_err());
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let current = ThermostatData::from_registers(
            &[215i64, 0, 22, 5, 1, 4, 0, 0, 7696, 0, 0, 0].map(Some),
        )
        .unwrap();
        let patch = SettingsPatch {
            setpoint: Some(25),
            upper: Some(28),
            ..SettingsPatch::default()
        };

        let settings = patch.apply(&current);

        assert_eq!(settings.set_point_temp, 25);
        assert_eq!(settings.fan_status, FanStatus::AutoMid);
        assert_eq!(settings.system_mode, SystemMode::AutoCool);
        assert_eq!(settings.set_point_lower_limit, 16);
        assert_eq!(settings.set_point_upper_limit, 28);
        assert!(!patch.is_empty());
        assert!(SettingsPatch::default().is_empty());
    }
}
