use std::time::Duration;

use color_eyre::Result;
use daybook_weather::{
    geolocate::GeoLocator, LookupTarget, WeatherClient, WeatherConfig, WeatherReport,
};

use crate::{cli::WeatherCommand, config};

/// Execute a weather subcommand with the bounded retry policy.
pub async fn handle(cmd: WeatherCommand, config: &config::Config) -> Result<()> {
    let Some(cfg) = resolve_weather_config(config) else {
        println!(
            "No weather API key configured. Set [weather].api_key in {} \
             or the DAYBOOK_WEATHER_API_KEY environment variable.",
            config::default_path()?.display()
        );
        return Ok(());
    };
    let client = WeatherClient::new(cfg);

    let target = match cmd {
        WeatherCommand::City { name } => LookupTarget::City(name.join(" ")),
        WeatherCommand::Coords { lat, lon } => LookupTarget::Coords { lat, lon },
        WeatherCommand::Locate => {
            println!("Detecting your location...");
            match GeoLocator::new().locate().await {
                Ok(position) => {
                    if let Some(city) = &position.city {
                        println!("Looks like {city}.");
                    }
                    LookupTarget::Coords {
                        lat: position.lat,
                        lon: position.lon,
                    }
                }
                Err(err) => {
                    // Terminal: no retry for geolocation failures.
                    println!("{err}. Try `daybook weather city <name>` instead.");
                    return Ok(());
                }
            }
        }
    };

    println!("Loading weather data...");
    match client.current_with_retry(&target).await {
        Ok(report) => print_report(&report),
        Err(err) => println!("{err}"),
    }
    Ok(())
}

fn print_report(report: &WeatherReport) {
    println!("{}", report.location);
    println!("Temperature: {}°C", report.temperature_c);
    println!("Condition: {} ({})", report.condition, report.description);
    println!("Icon: {}", report.icon_url);
}

/// Resolve provider settings: config section first, env var fallback for
/// the key.
pub fn resolve_weather_config(config: &config::Config) -> Option<WeatherConfig> {
    let api_key = config
        .weather
        .as_ref()
        .and_then(|w| w.api_key.clone())
        .or_else(|| std::env::var("DAYBOOK_WEATHER_API_KEY").ok())?;

    let mut cfg = WeatherConfig::new(api_key);
    if let Some(section) = &config.weather {
        cfg.api_base = section.endpoint.clone();
        if let Some(secs) = section.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
    }
    Some(cfg)
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, WeatherSection};

    use super::*;

    #[test]
    fn resolves_from_config_section() {
        let config = Config {
            data_dir: None,
            weather: Some(WeatherSection {
                api_key: Some("from-config".into()),
                endpoint: Some("https://weather.example.com".into()),
                timeout_secs: Some(4),
            }),
        };
        let resolved = resolve_weather_config(&config).expect("resolved");
        assert_eq!(resolved.api_key, "from-config");
        assert_eq!(
            resolved.api_base.as_deref(),
            Some("https://weather.example.com")
        );
        assert_eq!(resolved.timeout, Duration::from_secs(4));
    }

    #[test]
    fn section_without_key_keeps_defaults_for_the_rest() {
        let config = Config {
            data_dir: None,
            weather: Some(WeatherSection {
                api_key: Some("key".into()),
                endpoint: None,
                timeout_secs: None,
            }),
        };
        let resolved = resolve_weather_config(&config).expect("resolved");
        assert_eq!(resolved.api_base, None);
        assert_eq!(resolved.timeout, Duration::from_secs(8));
    }
}
