use std::fmt::Write as _;

use super::format::local_hhmm;
use super::types::{Hourly, WeatherAggregate};
use crate::news::formatting_instructions;

/// Hours into the forecast listed in the prompt.
const PROMPT_HOURS: [usize; 8] = [0, 3, 6, 9, 12, 15, 18, 21];

/// Build the forecaster prompt for one aggregate.
pub fn weather_prompt(data: &WeatherAggregate) -> String {
    let d = &data.daily;
    let t = &d.temperature;
    let (lat, lon) = (data.latitude, data.longitude);
    format!(
        "You are a professional weather forecaster providing accurate and useful weather reports for WhatsApp users.

## DATA CONTEXT
I will provide you with three types of weather data for coordinates [{lat:.4}, {lon:.4}]:
1. Overview summary
2. Daily aggregate statistics
3. Hour-by-hour forecast for the next 24 hours

Your task is to analyze this data and create a concise, informative, and visually engaging WhatsApp message for {context}'s weather ({date}).

## LOCATION CONTEXT
First, determine the location name based on these coordinates: Latitude {lat:.4}, Longitude {lon:.4}
For example: \"Jakarta, Indonesia\" or \"South Jakarta, Indonesia\" - be as specific as possible.

## WEATHER DATA
1. Weather Overview: {overview}
2. Daily Aggregate:
\t- Temperature: Min {min:.1}°C, Max {max:.1}°C
\t- Morning: {morning:.1}°C, Afternoon: {afternoon:.1}°C, Evening: {evening:.1}°C, Night: {night:.1}°C
\t- Humidity (afternoon): {humidity:.0}%
\t- Cloud Cover (afternoon): {clouds:.0}%
\t- Precipitation Total: {rain:.1}mm
\t- Wind Speed (max): {wind:.1} m/s, Direction: {direction:.0}°
\t- Pressure (afternoon): {pressure:.0} hPa

## HOUR-BY-HOUR DATA
{hourly}
## OUTPUT FORMAT
Create a WhatsApp-ready message using emojis and formatting with the following sections (must follow and have these sections):
1. HEADER: Create an eye-catching title with location and date
2. OVERVIEW: A 2-3 sentence summary of the day's weather
3. KEY METRICS: Important temperature, precipitation, and wind data
4. HOURLY HIGHLIGHTS: Key weather changes throughout the day (morning, afternoon, evening, night)
5. RECOMMENDATIONS: 3-5 practical suggestions based on the forecast (what to wear, activities to consider/avoid, precautions)
6. Key Takeaways: 2-3 concise points summarizing the most important insights from the weather report
7. Quote: some inspirational quote related to weather or nature that matches the forecast

Use appropriate weather emojis (☀️🌤️⛅🌥️☁️🌧️⛈️❄️) to make the message visually engaging.
Keep your response concise (under 1000 characters) and optimized for mobile viewing.
Format temperatures in Celsius with the degree symbol (°C)

{instructions}
",
        context = data.report_type,
        date = data.date,
        overview = data.weather_overview,
        min = t.min,
        max = t.max,
        morning = t.morning,
        afternoon = t.afternoon,
        evening = t.evening,
        night = t.night,
        humidity = d.humidity.afternoon,
        clouds = d.cloud_cover.afternoon,
        rain = d.precipitation.total,
        wind = d.wind.max.speed,
        direction = d.wind.max.direction,
        pressure = d.pressure.afternoon,
        hourly = hourly_lines(&data.hourly, data.timezone_offset),
        instructions = formatting_instructions(),
    )
}

fn hourly_lines(hourly: &[Hourly], offset_secs: i32) -> String {
    let mut out = String::new();
    for hour in PROMPT_HOURS.iter().filter_map(|&i| hourly.get(i)) {
        let weather = hour.weather.first().map_or_else(
            || "No weather data".to_owned(),
            |w| format!("{} ({})", w.main, w.description),
        );
        let _ = writeln!(
            out,
            "- {}: {:.1}°C, {weather}, Humidity: {}%, Wind: {:.1} m/s, Precipitation Chance: {:.0}%",
            local_hhmm(hour, offset_secs),
            hour.temp,
            hour.humidity,
            hour.wind_speed,
            hour.pop * 100.0
        );
    }
    out
}
