use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use skycast_core::{AppError, ConfigError};
use skycast_services::{FavoritesStore, MemoryFavoritesStore, SqliteFavoritesStore};
use skycast_session::{SearchSettings, Session, SessionClients, SessionState};
use skycast_weather::OpenWeatherClient;

const HELP: &str = "\
Type to search for a city. Commands:
  :select N    show full weather for card N
  :fav [N]     toggle favorite for card N, or for the detail view
  :search      full weather for the current text
  :retry       repeat the last detail request
  :hide        hide the candidate cards
  :favorites   list favorites
  :unfav N     remove favorite N
  :pin         remember the current text as home city
  :help        show this help
  :quit        exit";

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = skycast_core::init() {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = AppError::classify(e);
            tracing::error!("SkyCast stopped: {}", err);
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let app = skycast_core::App::new()?;
    app.initialize()?;
    let config = app.shared_config();

    let api_key = config
        .api
        .resolved_api_key()
        .ok_or(ConfigError::MissingApiKey)?;
    let client = Arc::new(OpenWeatherClient::new(
        &config.api.base_url,
        api_key,
        config.api.timeout(),
    )?);

    let store = open_favorites(&config);
    let session = Arc::new(Session::new(
        SessionClients::shared(client),
        store,
        SearchSettings::from(&config.search),
    ));
    session.start();

    tracing::info!("SkyCast started");
    println!("SkyCast - city weather search");
    println!("{}", HELP);

    let printer = tokio::spawn(print_state(session.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&session, &line).await {
            break;
        }
    }

    session.shutdown();
    printer.abort();
    app.shutdown()?;
    Ok(())
}

fn open_favorites(config: &skycast_core::Config) -> Arc<dyn FavoritesStore> {
    let path = config.favorites_db_path();
    match SqliteFavoritesStore::new(&path, config.favorites.capacity) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "Could not open favorites at {}: {}. Favorites will not be saved.",
                path.display(),
                e
            );
            Arc::new(MemoryFavoritesStore::new(config.favorites.capacity))
        }
    }
}

/// Returns false when the user asked to quit.
async fn handle_line(session: &Session, line: &str) -> bool {
    let Some(command) = line.strip_prefix(':') else {
        session.on_query_changed(line);
        return true;
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = parts.next().and_then(|n| n.parse::<usize>().ok());

    match (name, index) {
        ("quit" | "q", _) => return false,
        ("help", _) => println!("{}", HELP),
        ("select", Some(n)) => match card_city(session, n) {
            Some(city) => session.select_city(city).await,
            None => println!("No card {}", n),
        },
        ("fav", Some(n)) => match card_city(session, n) {
            Some(city) => report_favorite(session.toggle_favorite(&city).await.map(Some)),
            None => println!("No card {}", n),
        },
        ("fav", None) => report_favorite(session.toggle_current_favorite().await),
        ("search", _) => session.search_weather().await,
        ("retry", _) => session.retry().await,
        ("hide", _) => session.hide_city_cards(),
        ("favorites", _) => {
            let favorites = session.favorites().borrow().clone();
            if favorites.is_empty() {
                println!("No favorites yet");
            }
            for (i, city) in favorites.iter().enumerate() {
                println!("  {}. {}", i + 1, city.display_name());
            }
        }
        ("unfav", Some(n)) => {
            let city = n
                .checked_sub(1)
                .and_then(|i| session.favorites().borrow().get(i).cloned());
            match city {
                Some(city) => {
                    if let Err(e) = session.remove_favorite(&city).await {
                        println!("{}", e.user_message());
                    }
                }
                None => println!("No favorite {}", n),
            }
        }
        ("pin", _) => match session.save_pinned_city().await {
            Ok(true) => println!("Pinned"),
            Ok(false) => println!("Nothing to pin"),
            Err(e) => println!("{}", e.user_message()),
        },
        _ => println!("Unknown command. Type :help"),
    }
    true
}

fn card_city(session: &Session, n: usize) -> Option<skycast_weather::City> {
    let state = session.snapshot();
    n.checked_sub(1)
        .and_then(|i| state.cards.get(i))
        .map(|card| card.city.clone())
}

fn report_favorite(result: Result<Option<bool>, skycast_core::DatabaseError>) {
    match result {
        Ok(Some(true)) => println!("Added to favorites"),
        Ok(Some(false)) => println!("Removed from favorites"),
        Ok(None) => println!("Nothing to favorite"),
        Err(e) => println!("{}", e.user_message()),
    }
}

async fn print_state(session: Arc<Session>) {
    let mut rx = session.subscribe();
    let mut last_rendered = String::new();
    loop {
        let rendered = render(&rx.borrow_and_update());
        if rendered != last_rendered {
            println!("{}", rendered);
            last_rendered = rendered;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

fn render(state: &SessionState) -> String {
    let mut out = String::new();

    if state.show_cards {
        if state.search_in_flight {
            out.push_str("  searching...\n");
        }
        for (i, card) in state.cards.iter().enumerate() {
            let star = if card.is_favorite { "*" } else { " " };
            let weather = match (&card.weather, &card.weather_error) {
                (Some(w), _) => format!("{}°C {}", w.temperature_c(), w.condition_description),
                (None, Some(e)) => e.clone(),
                (None, None) if card.loading_weather => "loading...".to_string(),
                (None, None) => String::new(),
            };
            out.push_str(&format!(
                " {}{}. {:<32} {}\n",
                star,
                i + 1,
                card.city.display_name(),
                weather
            ));
        }
    }

    if state.detail_loading {
        out.push_str("  loading weather...\n");
    } else if let Some(report) = &state.detail_weather {
        let w = &report.weather;
        out.push_str(&format!(
            "== {}{} ==\n  {}°C (feels like {}°C), {}\n  min {}°C / max {}°C, humidity {}%\n",
            report.formatted_location(),
            if state.detail_is_favorite { " *" } else { "" },
            w.temperature_c(),
            w.feels_like_c(),
            w.condition_description,
            w.min_c(),
            w.max_c(),
            w.humidity_pct
        ));
    }

    if let Some(error) = &state.detail_error {
        out.push_str(&format!("! {} (:retry)\n", error));
    }
    if let Some(error) = &state.favorite_error {
        out.push_str(&format!("! {}\n", error));
    }

    out.trim_end().to_string()
}
