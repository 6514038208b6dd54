//! tether CLI entry point.

mod args;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tether_client::{criteria, ClientConfig, Element, Session};
use tether_core::criteria::Criteria;
use tether_core::error::TwinError;
use tether_core::json::{self, Map, Value};
use tether_core::protocol::Method;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, ClipboardAction, Commands, FindArgs, OpenArgs, EXAMPLES_TEXT};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Examples = cli.command {
        print!("{}", EXAMPLES_TEXT);
        return;
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        if let Some(hint) = e.downcast_ref::<TwinError>().and_then(TwinError::suggestion) {
            eprintln!("hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::load()?;
    if let Some(url) = &cli.url {
        config = config.with_url(url.clone());
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(session) = cli.command.session() {
        config = config.with_session(session);
    }

    if let Commands::Open(args) = &cli.command {
        config.session = None;
        return open(config, args);
    }
    if config.session.is_none() {
        bail!("No session given; pass --session or set TETHER_SESSION");
    }
    let session = Session::from_config(&config)?;
    debug!("Using session {:?} at {}", session.id(), session.url());

    match cli.command {
        Commands::Close(_) => {
            session.close()?;
            println!("Session closed");
        }
        Commands::Windows(_) => {
            let windows = session
                .windows()?
                .iter()
                .map(|window| element_json(window))
                .collect::<Vec<_>>();
            print_json(&serde_json::Value::Array(windows))?;
        }
        Commands::Find(args) => {
            let root = root_element(&session, args.under.as_deref())?;
            let criteria = find_criteria(&args)?;
            let found = if args.children {
                root.children(criteria.as_ref())?
            } else {
                root.descendants(criteria.as_ref())?
            };
            info!("Found {} element(s)", found.len());
            let found = found.iter().map(element_json).collect::<Vec<_>>();
            print_json(&serde_json::Value::Array(found))?;
        }
        Commands::Structure(args) => {
            let root = root_element(&session, args.uuid.as_deref())?;
            println!("{}", root.structure(args.verbose)?);
        }
        Commands::Click(args) => {
            let element = session.element(&args.uuid)?;
            match (args.x, args.y) {
                (Some(x), Some(y)) => element.click_at(x, y, args.button.map(Into::into))?,
                _ => match args.button {
                    Some(button) => element.click_button(button.into())?,
                    None => element.click()?,
                },
            }
        }
        Commands::Type(args) => {
            let element = match &args.into {
                Some(uuid) => session.element(uuid)?,
                None => session.focused_element()?,
            };
            if args.raw {
                element.send_keys(&args.text)?;
            } else {
                element.type_text(&args.text)?;
            }
        }
        Commands::Clipboard(args) => {
            let clipboard = session.clipboard();
            match args.action {
                ClipboardAction::Get => {
                    if let Some(text) = clipboard.text()? {
                        println!("{}", text);
                    }
                }
                ClipboardAction::Set { text } => clipboard.set_text(&text)?,
                ClipboardAction::Clear => clipboard.clear()?,
            }
        }
        Commands::Screenshot(args) => {
            let shot = match &args.uuid {
                Some(uuid) => session.element(uuid)?.screenshot()?,
                None => session.screenshot()?,
            };
            let path = match &args.output {
                Some(path) => {
                    shot.save(path)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    path.clone()
                }
                None => shot
                    .save_in(&args.dir)
                    .with_context(|| format!("failed to write into {}", args.dir.display()))?,
            };
            println!("{}", path.display());
        }
        Commands::Options(args) => {
            println!("{}", session.options(&args.path)?.join(", "));
        }
        Commands::Request(args) => {
            let method = Method::parse(&args.method)
                .ok_or_else(|| anyhow!("unknown HTTP method '{}'", args.method))?;
            let body = args
                .body
                .as_deref()
                .map(|text| json::decode(text, &[]))
                .transpose()
                .context("request body is not valid JSON")?;
            let value = session.request(method, &args.path, body.as_ref())?;
            print_json(&serde_json::Value::try_from(&value)?)?;
        }
        Commands::Open(_) | Commands::Examples => {}
    }
    Ok(())
}

fn open(config: ClientConfig, args: &OpenArgs) -> anyhow::Result<()> {
    let session = Session::from_config(&config)?;
    for entry in &args.setup {
        let (name, value) = parse_assignment(entry)?;
        session.add_session_setup(name, value, true)?;
    }
    let mut capabilities = Map::new();
    for entry in &args.capabilities {
        let (name, value) = parse_assignment(entry)?;
        capabilities.insert(name, value);
    }

    match &args.app {
        Some(app) => session.open_application(app, args.version.as_deref(), capabilities)?,
        None => {
            if let Some(version) = &args.version {
                session.set_desired_capability("version", version.as_str())?;
            }
            for (name, value) in capabilities {
                session.set_desired_capability(name, value)?;
            }
            session.open()?;
        }
    }

    let output = serde_json::json!({
        "sessionId": session.id(),
        "url": session.url(),
        "capabilities": serde_json::Value::try_from(&Value::Map(
            session.capabilities().unwrap_or_default()
        ))?,
        "openedAt": session.opened_at().map(|at| at.to_rfc3339()),
    });
    print_json(&output)
}

/// Split `NAME=VALUE`. VALUE is read as JSON when it parses, else as a string.
fn parse_assignment(entry: &str) -> anyhow::Result<(String, Value)> {
    let (name, text) = entry
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", entry))?;
    let value = json::decode(text, &[]).unwrap_or_else(|_| Value::from(text));
    Ok((name.to_string(), value))
}

fn root_element(session: &Session, uuid: Option<&str>) -> anyhow::Result<Element> {
    Ok(match uuid {
        Some(uuid) => session.element(uuid)?,
        None => session.desktop(),
    })
}

fn find_criteria(args: &FindArgs) -> anyhow::Result<Option<Criteria>> {
    let mut parts = Vec::new();
    if let Some(type_name) = &args.type_name {
        parts.push(criteria::type_named(type_name)?);
    }
    if let Some(name) = &args.name {
        parts.push(criteria::name(name.as_str()));
    }
    if let Some(class_name) = &args.class_name {
        parts.push(criteria::class_name(class_name.as_str()));
    }
    if let Some(id) = &args.id {
        parts.push(criteria::id(id.as_str()));
    }
    if let Some(enabled) = args.enabled {
        parts.push(criteria::enabled(enabled));
    }
    Ok(match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(criteria::and(parts)),
    })
}

fn element_json(element: &Element) -> serde_json::Value {
    serde_json::json!({
        "uuid": element.uuid(),
        "name": element.cached_name(),
        "controlType": element.control_type().map(|t| t.to_string()),
        "controlPatterns": element
            .control_patterns()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
