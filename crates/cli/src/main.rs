use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;

use geoplaces_cli::Session;
use geoplaces_core::{CategoryId, Locale};
use geoplaces_infra::{EngineRegistry, PlacesConfig};
use geoplaces_location::{Coordinate, GeoRectangle};
use geoplaces_observability::LogFormat;
use geoplaces_places::{Category, SearchRequest};

#[derive(Parser)]
#[command(name = "geoplaces")]
#[command(about = "Query and edit places through a place manager")]
struct Args {
    /// Provider to use (overrides GEOPLACES_PROVIDER)
    #[arg(long)]
    provider: Option<String>,

    /// Locale for place details (overrides GEOPLACES_LOCALE)
    #[arg(long)]
    locale: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered providers
    Providers,
    /// Print the default category tree
    Categories,
    /// Search the demo places
    Search {
        term: String,
        /// Only places inside a box centered on "LAT,LON"
        #[arg(long)]
        near: Option<String>,
        /// Box size in degrees, used with --near
        #[arg(long, default_value = "0.1")]
        span: f64,
        /// Category id filter, e.g. leisure.sauna
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a scripted session and report replies and notifications
    Demo,
}

fn parse_coordinate(raw: &str) -> anyhow::Result<Coordinate> {
    let Some((lat, lon)) = raw.split_once(',') else {
        bail!("expected LAT,LON, got {raw:?}");
    };
    let lat: f64 = lat.trim().parse().context("latitude")?;
    let lon: f64 = lon.trim().parse().context("longitude")?;
    Ok(Coordinate::new(lat, lon)?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        geoplaces_observability::init_with(LogFormat::from_env(), "debug");
    } else {
        geoplaces_observability::init();
    }

    let mut config = PlacesConfig::from_env().context("reading configuration")?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(locale) = args.locale {
        config.locale = locale.parse::<Locale>().context("--locale")?;
    }
    tracing::debug!(?config, "configuration loaded");

    let registry = EngineRegistry::with_defaults();

    let output = match args.command {
        Command::Providers => json!({ "providers": registry.available_providers() }),

        Command::Categories => {
            let session = Session::open(&config, &registry)?;
            session.initialize_categories()?;
            json!({ "categories": session.category_tree(&CategoryId::top_level()) })
        }

        Command::Search {
            term,
            near,
            span,
            category,
            limit,
        } => {
            let session = Session::open(&config, &registry)?;
            session.seed_demo_places()?;

            let mut request = SearchRequest::term(term);
            if let Some(raw) = near {
                let center = parse_coordinate(&raw).context("--near")?;
                request = request.within(GeoRectangle::around(center, span, span)?);
            }
            if let Some(id) = category {
                request = request.with_category(Category::default().with_id(id));
            }
            request.limit = limit;

            json!({ "results": session.search(&request)? })
        }

        Command::Demo => {
            let session = Session::open(&config, &registry)?;
            let manager = session.manager();

            session.initialize_categories()?;
            let categories = session.drain_notifications().len();

            let ids = session.seed_demo_places()?;
            let notifications = session.drain_notifications();

            let first = match ids.first() {
                Some(id) => session.place(id)?,
                None => None,
            };
            let recommendations = match &first {
                Some(place) => session.recommendations(place)?,
                None => Vec::new(),
            };

            json!({
                "manager": manager.manager_name(),
                "version": manager.manager_version(),
                "features": manager.supported_features().names(),
                "locale": manager.locale(),
                "categories_added": categories,
                "notifications": notifications,
                "place": first,
                "recommendations": recommendations,
                "predictions": session.text_predictions("a")?,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
