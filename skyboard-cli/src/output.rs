use chrono::{DateTime, Local, Utc};
use skyboard_core::{CitySuggestion, ForecastBundle, RefreshEvent, Units, WeatherSnapshot};

pub fn print_snapshot(snapshot: &WeatherSnapshot, units: Units, favorite: bool) {
    let heart = if favorite { " ♥" } else { "" };
    let t = units.temperature_suffix();

    println!("{}, {}{heart}", snapshot.city, snapshot.country);
    println!(
        "  {}{t} (feels like {}{t}), {}",
        snapshot.temp, snapshot.feels_like, snapshot.description
    );
    println!(
        "  humidity {}%  pressure {} hPa  wind {:.1} {} from {}°",
        snapshot.humidity,
        snapshot.pressure,
        snapshot.wind_speed,
        units.speed_suffix(),
        snapshot.wind_deg
    );
    println!(
        "  visibility {:.1} km  sunrise {}  sunset {}",
        f64::from(snapshot.visibility) / 1000.0,
        clock(snapshot.sunrise),
        clock(snapshot.sunset)
    );
}

pub fn print_forecast(city: &str, forecast: &ForecastBundle, units: Units) {
    let t = units.temperature_suffix();

    println!("{city}: next 24 hours");
    for point in &forecast.hourly {
        println!(
            "  {}  {:>4}{t}  {:>3}% rain  {}",
            clock(point.time),
            point.temp,
            point.precipitation_probability,
            point.description
        );
    }

    println!("{city}: next {} days", forecast.daily.len());
    for day in &forecast.daily {
        println!(
            "  {}  {:>4}{t} / {:>4}{t}  {}",
            day.date.with_timezone(&Local).format("%a %d %b"),
            day.temp_min,
            day.temp_max,
            day.description
        );
    }
}

pub fn print_suggestions(suggestions: &[CitySuggestion]) {
    if suggestions.is_empty() {
        println!("No matching cities.");
    }
    for s in suggestions {
        println!("{}, {}  ({:.4}, {:.4})", s.name, s.country, s.lat, s.lon);
    }
}

pub fn print_event(event: &RefreshEvent, units: Units) {
    let t = units.temperature_suffix();

    match event {
        RefreshEvent::Current { city, result } => match result {
            Ok(s) => println!("{city:<14} {:>4}{t}  {}", s.temp, s.description),
            Err(err) => println!("{city:<14} unavailable: {err}"),
        },
        RefreshEvent::Forecast { city, result } => match result {
            Ok(f) => {
                let days: Vec<String> = f
                    .daily
                    .iter()
                    .map(|d| format!("{}/{}", d.temp_min, d.temp_max))
                    .collect();
                println!("{city:<14} forecast {}", days.join("  "));
            }
            Err(err) => println!("{city:<14} forecast unavailable: {err}"),
        },
        RefreshEvent::PassCompleted { trigger, requested } => {
            tracing::debug!(?trigger, requested, "pass completed");
            println!("-- refreshed at {}", Local::now().format("%H:%M:%S"));
        }
    }
}

fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}
