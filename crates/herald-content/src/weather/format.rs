use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use super::types::{Hourly, WeatherAggregate};

/// Hours into the forecast shown in the manual message.
const KEY_HOURS: [(usize, &str); 3] = [(6, "Morning"), (12, "Afternoon"), (18, "Evening")];

/// Wrap an LLM-written report with the forecast header and footer.
pub fn format_llm(content: &str, data: &WeatherAggregate) -> String {
    format!(
        "🌤️ *{} WEATHER FORECAST* 🌤️\n\n{content}\n\nPowered by OpenWeather",
        data.report_type.possessive_caps()
    )
}

/// Render the forecast without an LLM.
pub fn format_manual(data: &WeatherAggregate) -> String {
    let daily = &data.daily;
    let temp = &daily.temperature;
    let rain = daily.precipitation.total;
    let mut m = String::new();

    let _ = writeln!(
        m,
        "🌤️ *{} WEATHER FORECAST* 🌤️",
        data.report_type.possessive_caps()
    );
    let _ = writeln!(
        m,
        "📍 Coordinates: [{:.4}, {:.4}]",
        data.latitude, data.longitude
    );
    let _ = writeln!(m, "📅 Date: {}", data.date);
    let _ = write!(m, "🌐 Timezone: {}\n\n", data.timezone);

    let _ = write!(m, "*📝 OVERVIEW*\n{}\n\n", data.weather_overview);

    m.push_str("*🌡️ TEMPERATURE*\n");
    let _ = writeln!(m, "• Min: {:.1}°C | Max: {:.1}°C", temp.min, temp.max);
    let _ = writeln!(
        m,
        "• Morning: {:.1}°C | Afternoon: {:.1}°C",
        temp.morning, temp.afternoon
    );
    let _ = write!(
        m,
        "• Evening: {:.1}°C | Night: {:.1}°C\n\n",
        temp.evening, temp.night
    );

    m.push_str("*☁️ CONDITIONS*\n");
    let _ = writeln!(m, "• Humidity: {:.0}%", daily.humidity.afternoon);
    let _ = writeln!(m, "• Cloud Cover: {:.0}%", daily.cloud_cover.afternoon);
    let _ = writeln!(m, "• Precipitation: {rain:.1}mm");
    let _ = writeln!(
        m,
        "• Wind: {:.1} m/s at {:.0}°",
        daily.wind.max.speed, daily.wind.max.direction
    );
    let _ = write!(m, "• Pressure: {:.0} hPa\n\n", daily.pressure.afternoon);

    m.push_str("*⏰ KEY HOURS FORECAST*\n");
    if data.hourly.is_empty() {
        m.push_str("• Hourly forecast data not available\n");
    }
    for (index, label) in KEY_HOURS {
        let Some(hour) = data.hourly.get(index) else {
            continue;
        };
        let (emoji, description) = match hour.weather.first() {
            Some(w) => (condition_emoji(&w.main), w.description.as_str()),
            None => ("❓", "No data"),
        };
        let _ = writeln!(
            m,
            "• {label} ({}): {emoji} {:.1}°C, {description}, {}% humidity, {:.0}% chance of rain",
            local_hhmm(hour, data.timezone_offset),
            hour.temp,
            hour.humidity,
            hour.pop * 100.0
        );
    }

    m.push_str("\n*💡 RECOMMENDATIONS*\n");
    if rain > 0.0 {
        m.push_str("• Carry an umbrella or raincoat ☔\n");
    }
    if temp.max > 30.0 {
        m.push_str("• Stay hydrated and wear light clothing 💧\n");
        m.push_str("• Use sunscreen if going outdoors 🧴\n");
    } else if temp.min < 15.0 {
        m.push_str("• Wear warm clothing, especially in the morning/evening 🧥\n");
    }
    if daily.wind.max.speed > 10.0 {
        m.push_str("• Expect strong winds - secure loose items outdoors 💨\n");
    }

    m.push_str("\n*🔑 KEY TAKEAWAYS*\n");
    if rain > 5.0 {
        m.push_str("• Expect significant rainfall, plan indoor activities ☔\n");
    } else if rain > 0.0 {
        m.push_str("• Light rain possible, keep an umbrella handy 🌂\n");
    } else {
        m.push_str("• Dry conditions expected, no rain gear needed 👍\n");
    }
    if temp.max - temp.min > 10.0 {
        m.push_str("• Large temperature swings throughout the day, dress in layers 🧥➡️👕\n");
    }

    m.push_str("\n*💭 WEATHER WISDOM*\n");
    m.push_str(if rain > 0.0 {
        "\"The best thing one can do when it's raining is to let it rain.\" - Henry W. Longfellow\n"
    } else if daily.cloud_cover.afternoon > 70.0 {
        "\"Clouds come floating into my life, no longer to carry rain or usher storm, but to add color to my sunset sky.\" - Rabindranath Tagore\n"
    } else {
        "\"Wherever you go, no matter what the weather, always bring your own sunshine.\" - Anthony J. D'Angelo\n"
    });

    m.push_str("\n*Weather data provided by OpenWeather*");
    m
}

fn condition_emoji(main: &str) -> &'static str {
    match main {
        "Clear" => "☀️",
        "Clouds" => "☁️",
        "Rain" => "🌧️",
        "Drizzle" => "🌦️",
        "Thunderstorm" => "⛈️",
        "Snow" => "❄️",
        "Mist" | "Fog" | "Haze" => "🌫️",
        _ => "🌤️",
    }
}

/// `HH:MM` of an hourly entry at the forecast location.
///
/// Offsets OpenWeather should never send fall back to UTC.
pub(crate) fn local_hhmm(hour: &Hourly, offset_secs: i32) -> String {
    let tz = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(hour.dt, 0)
        .map(|t| t.with_timezone(&tz).format("%H:%M").to_string())
        .unwrap_or_default()
}
