use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use optout_landing::confirmation::ConfirmationView;
use optout_landing::landing::{InputKind, LandingView, PrivacyLink};
use optout_landing::{Config, OptoutApp, Screen};
use std::process;

const TARGET_ENV_VAR: &str = "OPTOUT_TARGET_ENV";

#[tokio::main]
async fn main() {
    let matches = Command::new("optout-landing")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Opt-out landing flow: resolve a key, load the page, submit opt-outs")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/optout-landing.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("target-env")
                .long("target-env")
                .value_name("ENV")
                .help("Use the API preset for development, staging or production")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .value_name("PATH")
                .help("Route to visit, e.g. /o-abc-123-456?email=user@example.com")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("EMAIL")
                .help("Email address to opt out through the landing form")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("sms")
                .long("sms")
                .value_name("PHONE")
                .help("Phone number to opt out through the landing form")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("preference")
                .long("preference")
                .value_name("ID")
                .help("Preference list id to unsubscribe from, or 'all' (repeatable)")
                .action(ArgAction::Append),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let target_env = matches
        .get_one::<String>("target-env")
        .cloned()
        .or_else(|| std::env::var(TARGET_ENV_VAR).ok());
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/optout-landing.yaml");

    let config = match load_config(config_path, target_env.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    // The configured level can only quieten the logger initialised above.
    if !matches.get_flag("verbose") {
        if let Some(level) = config
            .logging
            .as_ref()
            .and_then(|l| l.level.parse::<LevelFilter>().ok())
        {
            log::set_max_level(level.min(LevelFilter::Info));
        }
    }

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    let Some(path) = matches.get_one::<String>("path") else {
        eprintln!("Nothing to do: pass --path with an opt-out route");
        process::exit(2);
    };

    let mut app = match OptoutApp::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error creating HTTP client: {e}");
            process::exit(1);
        }
    };

    let mut screen = app.visit(path).await;

    let email = matches.get_one::<String>("email");
    let sms = matches.get_one::<String>("sms");
    if let Screen::Form(view) = &screen {
        if email.is_some() || sms.is_some() {
            let preference = preference_ids(&matches, view);
            let email = email.map(String::as_str).unwrap_or("");
            let sms = sms.map(String::as_str).unwrap_or("");
            match app.submit(email, sms, &preference).await {
                Ok(next) => screen = next,
                Err(errors) => {
                    for message in errors.messages() {
                        eprintln!("{message}");
                    }
                    process::exit(1);
                }
            }
        }
    }

    print_screen(&screen);

    if let Screen::Confirmation(ConfirmationView::Content {
        collect_feedback: true,
        ..
    }) = &screen
    {
        if let Some(address) = app.feedback_address().await {
            println!();
            println!("Please forward the email to: {address}");
            println!("(Optional. This address only works for the next 48 hours.)");
        }
    }
}

fn load_config(path: &str, target_env: Option<&str>) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else if let Some(target) = target_env {
        log::info!("Using '{target}' API preset");
        Ok(Config::for_target_env(target))
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("Testing configuration...");
    println!("API URL: {}", display_or(&config.api.url, "(same origin)"));
    println!("Fallback API URL: {}", config.api.fallback_url);
    println!(
        "Key resolution attempts: {} ({} on primary)",
        config
            .api
            .request_retries
            .saturating_add(config.api.fallback_attempts),
        config.api.request_retries
    );
    println!("Accepted SMS countries: {}", config.sms.accepted_country_codes.join(", "));

    if !(0.0..=1.0).contains(&config.feedback.collection_ratio) {
        eprintln!(
            "Invalid feedback collection ratio: {}",
            config.feedback.collection_ratio
        );
        process::exit(1);
    }
    println!("Configuration is valid.");
}

fn preference_ids(matches: &clap::ArgMatches, view: &LandingView) -> Vec<u32> {
    let mut ids = Vec::new();
    for value in matches.get_many::<String>("preference").into_iter().flatten() {
        if value.eq_ignore_ascii_case("all") {
            ids.extend(view.all_preferences());
            continue;
        }
        match value.parse::<u32>() {
            Ok(id) => ids.push(id),
            Err(_) => log::warn!("Ignoring preference '{value}'"),
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn print_screen(screen: &Screen) {
    match screen {
        Screen::NotFound => println!("Not found"),
        Screen::Error(message) => println!("{message}"),
        Screen::Form(view) => print_form(view),
        Screen::Confirmation(ConfirmationView::Redirect { url }) => {
            println!("Redirecting to {url}");
        }
        Screen::Confirmation(ConfirmationView::Content {
            title,
            unsubscribed,
            content,
            advertisement,
            ..
        }) => {
            if let Some(title) = title {
                println!("{title}");
            }
            println!();
            println!("Successfully unsubscribed: {unsubscribed}");
            if let Some(content) = content {
                println!("{content}");
            }
            if let Some(ad) = advertisement {
                println!("Advertisement: {ad}");
            }
        }
        Screen::Confirmation(ConfirmationView::NotFound) => println!("Not found"),
    }
}

fn print_form(view: &LandingView) {
    if let Some(logo) = &view.logo {
        println!("[logo] {logo}");
    }
    if let Some(title) = &view.title {
        println!("{title}");
    }
    if let Some(content) = &view.content_above {
        println!("{content}");
    }
    match &view.input {
        InputKind::Email => println!("[Email Address] (--email)"),
        InputKind::Sms { accepted_countries } => {
            println!("[Phone Number: {}] (--sms)", accepted_countries.join("/"));
        }
    }
    if let Some(content) = &view.content_below {
        println!("{content}");
    }
    if !view.preference_options.is_empty() {
        println!("Which emails would you like to unsubscribe from? (--preference)");
        for option in &view.preference_options {
            println!("  [{}] {}", option.id, option.name);
        }
        println!("  [all] Unsubscribe from all lists");
    }
    match &view.privacy {
        PrivacyLink::External(url) => println!("Privacy: {url}"),
        PrivacyLink::Statement(content) => println!("Privacy Statement: {content}"),
        PrivacyLink::Hidden => {}
    }
    if view.complaint_link {
        println!("Still receiving email after unsubscribing?");
    }
}
