use anyhow::Result;
use std::fmt::Write as _;
use url::Url;
use weatherapp_core::{CurrentWeather, ForecastSeries, RenderEvent, RenderUpdate};

/// Prints render events for one terminal session.
#[derive(Debug)]
pub struct Renderer {
    json: bool,
    icon_base: Url,
    messages: usize,
}

impl Renderer {
    pub fn new(json: bool, icon_base: Url) -> Self {
        Self { json, icon_base, messages: 0 }
    }

    pub fn handle(&mut self, city: &str, event: &RenderEvent) -> Result<()> {
        if let RenderUpdate::Message(_) = event.update {
            self.messages += 1;
        }

        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        match &event.update {
            RenderUpdate::Current(weather) => print!("{}", current_block(city, weather, &self.icon_base)),
            RenderUpdate::Forecast(series) => print!("{}", forecast_block(series, &self.icon_base)),
            RenderUpdate::Message(message) => eprintln!("{message}"),
            RenderUpdate::Finished => {}
        }

        Ok(())
    }

    pub fn had_messages(&self) -> bool {
        self.messages > 0
    }
}

pub fn current_block(city: &str, weather: &CurrentWeather, icon_base: &Url) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Weather in {}", city.trim());
    let _ = writeln!(out, "  Temperature  {}", weather.temperature);
    let _ = writeln!(out, "  Humidity     {}", weather.humidity);
    let _ = writeln!(out, "  Wind         {}", weather.wind_speed);
    let _ = writeln!(out, "  Condition    {}", weather.condition);
    let _ = writeln!(out, "  Icon         {}", weather.icon.url(icon_base));
    out
}

pub fn forecast_block(series: &ForecastSeries, icon_base: &Url) -> String {
    if series.is_empty() {
        return "No forecast data.\n".to_string();
    }

    let width = series.iter().map(|d| d.temperature_range().chars().count()).max().unwrap_or(0);

    let mut out = String::from("Forecast\n");
    for day in series {
        let _ = writeln!(
            out,
            "  {}  {:<width$}  {}  {}",
            day.day,
            day.temperature_range(),
            day.condition,
            day.icon.url(icon_base),
        );
    }
    out
}
