mod channel;
mod interactive;

use std::io;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ride_booking::{BookingDesk, SubmitOutcome};
use ride_core::{
    find_route, fleet, routes, BookingField, Dictionary, Language, RouteSeed, Translator,
};
use ride_notify::DEFAULT_TELEGRAM_API_BASE;
use ride_observability::{init_cli_tracing, AppMetrics};

use crate::channel::{Channel, ChannelOptions};
use crate::interactive::Prompter;

#[derive(Debug, Parser)]
#[command(name = "ride")]
#[command(about = "Chauffeur booking desk for intercity transfers")]
struct Cli {
    /// Interface language: en, ru or kg.
    #[arg(long, env = "RIDE_LANG", default_value = "ru", global = true)]
    lang: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct DeliveryArgs {
    /// Booking backend base URL; when set, credentials stay on the server.
    #[arg(long, env = "RIDE_BACKEND_URL")]
    backend: Option<String>,

    #[arg(long, env = "RIDE_TELEGRAM_API_BASE", default_value = DEFAULT_TELEGRAM_API_BASE)]
    telegram_api_base: String,

    #[arg(long, env = "RIDE_TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    #[arg(long, env = "RIDE_TELEGRAM_CHAT_ID")]
    chat_id: Option<String>,

    #[arg(long, env = "RIDE_OPERATOR_LANG", default_value = "ru")]
    operator_lang: String,
}

impl DeliveryArgs {
    fn into_channel(self) -> Result<Channel> {
        Channel::from_options(ChannelOptions {
            backend: self.backend,
            telegram_api_base: self.telegram_api_base,
            bot_token: self.bot_token,
            chat_id: self.chat_id,
            operator_language: Language::from_optional_str(Some(self.operator_lang.as_str())),
        })
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Walk through the three booking steps interactively.
    Book {
        /// Prefill origin and destination from a catalog route id.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        route: Option<String>,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// List intercity routes.
    Routes {
        #[arg(long)]
        popular: bool,
    },
    /// List fleet categories.
    Vehicles,
    /// Submit a booking in one shot.
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        #[arg(long, default_value_t = 1)]
        passengers: i64,
        #[arg(long, default_value = "sedan")]
        vehicle: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_cli_tracing("ride_cli");
    let cli = Cli::parse();
    let language = Language::parse(&cli.lang)
        .ok_or_else(|| anyhow!("unsupported --lang `{}`, expected en, ru or kg", cli.lang))?;
    let translator = Dictionary::new(language);

    match cli.command {
        Command::Book {
            route,
            from,
            to,
            delivery,
        } => {
            let seed = match (route, from, to) {
                (Some(id), _, _) => Some(
                    find_route(&id)
                        .ok_or_else(|| anyhow!("unknown route `{id}`, see `ride routes`"))?
                        .seed(),
                ),
                (None, Some(from), Some(to)) => Some(RouteSeed { from, to }),
                _ => None,
            };
            let desk = BookingDesk::new(
                Arc::new(delivery.into_channel()?),
                Arc::new(translator),
                AppMetrics::shared(),
                seed,
            );
            Prompter::new(io::stdin().lock(), io::stdout()).run(&desk).await?;
        }
        Command::Routes { popular } => print_routes(&translator, popular),
        Command::Vehicles => print_vehicles(&translator),
        Command::Send {
            from,
            to,
            date,
            time,
            passengers,
            vehicle,
            name,
            phone,
            notes,
            delivery,
        } => {
            let desk = BookingDesk::new(
                Arc::new(delivery.into_channel()?),
                Arc::new(translator),
                AppMetrics::shared(),
                None,
            );
            let passengers = passengers.to_string();
            // Category first so the passenger count clamps against its capacity.
            let edits = [
                ("from", BookingField::From, from.as_str()),
                ("to", BookingField::To, to.as_str()),
                ("date", BookingField::Date, date.as_str()),
                ("time", BookingField::Time, time.as_str()),
                ("vehicle", BookingField::VehicleCategory, vehicle.as_str()),
                ("passengers", BookingField::PassengerCount, passengers.as_str()),
                ("name", BookingField::FullName, name.as_str()),
                ("phone", BookingField::Phone, phone.as_str()),
                ("notes", BookingField::Notes, notes.as_str()),
            ];
            for (flag, field, value) in edits {
                desk.update_field(field, value)
                    .with_context(|| format!("invalid --{flag}"))?;
            }
            while desk.advance().moved() {}

            match desk.submit().await {
                SubmitOutcome::Completed(result) if result.success => {
                    println!("{}", result.message)
                }
                SubmitOutcome::Completed(result) => bail!("{}", result.message),
                SubmitOutcome::Invalid(validation) => bail!("{validation}"),
                other => bail!("booking was not submitted: {other:?}"),
            }
        }
    }

    Ok(())
}

fn print_routes(translator: &Dictionary, popular_only: bool) {
    println!("{}\n", translator.text("routes.title"));
    for route in routes().iter().filter(|route| !popular_only || route.popular) {
        let price = route.price_som.to_string();
        let distance = route.distance_km.to_string();
        println!("{:<18} {}", route.id, translator.text(route.name_key));
        println!(
            "{:<18} {} | {} | {}",
            "",
            translator.translate("routes.duration", &[("time", route.duration)]),
            translator.translate("routes.price", &[("price", price.as_str())]),
            translator.translate("routes.distance", &[("distance", distance.as_str())]),
        );
    }
}

fn print_vehicles(translator: &Dictionary) {
    for entry in fleet() {
        let capacity = entry.capacity.to_string();
        println!(
            "{:<9} {} ({})",
            entry.category.as_code(),
            translator.text(&entry.title_key),
            translator.translate("vehicles.capacity", &[("count", capacity.as_str())]),
        );
        println!("{:<9} {}", "", entry.models.join(", "));
    }
}
