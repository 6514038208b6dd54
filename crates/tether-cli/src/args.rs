//! CLI argument parsing with clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tether_client::{MouseButton, Timeout};

const SESSION_HELP: &str = "Server session id [default: $TETHER_SESSION]";

/// Drive a remote desktop application's UI from the command line.
///
/// Each command runs against a server session opened with `tether open`,
/// so a script can issue one command per process. Results are printed to
/// stdout as JSON or text; logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "tether", version)]
pub struct Cli {
    /// Automation server endpoint [default: $TETHER_URL or http://localhost:4444/]
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Wait timeout in seconds, or "inf"
    #[arg(long, global = true)]
    pub timeout: Option<Timeout>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open a server session and print its id
    #[command(after_help = "\
Examples:
  tether open --app notepad                 # Open by application name
  tether open --app calc --version 10       # Ask for a specific version
  tether open -c profile=\\\"clean\\\"         # Extra desired capability (JSON value)
  export TETHER_SESSION=$(tether open --app notepad | jq -r .sessionId)")]
    Open(OpenArgs),

    /// Close a server session
    Close(SessionArgs),

    /// List the top-level windows
    Windows(SessionArgs),

    /// Search the element tree
    #[command(after_help = "\
Examples:
  tether find --type Window                 # All windows anywhere on the desktop
  tether find --name OK --type Button       # Buttons called OK
  tether find --under <UUID> --children     # Direct children of an element
  tether find --type edit                   # Anything exposing the edit pattern")]
    Find(FindArgs),

    /// Print the element tree as the server renders it
    Structure(StructureArgs),

    /// Click an element
    Click(ClickArgs),

    /// Type text into an element, or the focused one
    #[command(name = "type")]
    Type(TypeArgs),

    /// Read or change the clipboard
    Clipboard(ClipboardArgs),

    /// Capture the desktop or an element to an image file
    Screenshot(ScreenshotArgs),

    /// List the HTTP methods the server allows on a session path
    Options(OptionsArgs),

    /// Send a raw session-scoped request
    #[command(after_help = "\
Examples:
  tether request GET element/active
  tether request POST clipboard '{\"type\":\"text\",\"text\":\"hi\"}'")]
    Request(RequestArgs),

    /// Show an end-to-end usage example
    Examples,
}

impl Commands {
    /// The `--session` flag of commands that work on an open session.
    pub fn session(&self) -> Option<&str> {
        let args = match self {
            Commands::Close(args) | Commands::Windows(args) => args,
            Commands::Find(args) => &args.session,
            Commands::Structure(args) => &args.session,
            Commands::Click(args) => &args.session,
            Commands::Type(args) => &args.session,
            Commands::Clipboard(args) => &args.session,
            Commands::Screenshot(args) => &args.session,
            Commands::Options(args) => &args.session,
            Commands::Request(args) => &args.session,
            Commands::Open(_) | Commands::Examples => return None,
        };
        args.session.as_deref()
    }
}

#[derive(Debug, clap::Args)]
pub struct SessionArgs {
    #[arg(short, long, help = SESSION_HELP)]
    pub session: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct OpenArgs {
    /// Application name configured on the server
    #[arg(short, long)]
    pub app: Option<String>,

    /// Application version
    #[arg(long)]
    pub version: Option<String>,

    /// Extra desired capability as NAME=VALUE; VALUE is JSON when it parses
    #[arg(short, long = "capability", value_name = "NAME=VALUE")]
    pub capabilities: Vec<String>,

    /// Session setup entry as NAME=VALUE that the server must honour
    #[arg(long = "setup", value_name = "NAME=VALUE")]
    pub setup: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct FindArgs {
    #[arg(long)]
    pub name: Option<String>,

    /// Control type (Button) or control pattern (edit)
    #[arg(long = "type", value_name = "TYPE")]
    pub type_name: Option<String>,

    #[arg(long)]
    pub class_name: Option<String>,

    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub enabled: Option<bool>,

    /// Search below this element instead of the desktop
    #[arg(long, value_name = "UUID")]
    pub under: Option<String>,

    /// Only direct children
    #[arg(long)]
    pub children: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, clap::Args)]
pub struct StructureArgs {
    /// Element to start from [default: desktop]
    #[arg(value_name = "UUID")]
    pub uuid: Option<String>,

    /// Include every property
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl From<Button> for MouseButton {
    fn from(button: Button) -> Self {
        match button {
            Button::Left => MouseButton::Left,
            Button::Middle => MouseButton::Middle,
            Button::Right => MouseButton::Right,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ClickArgs {
    pub uuid: String,

    /// X offset from the element's left edge
    #[arg(short, requires = "y")]
    pub x: Option<i32>,

    /// Y offset from the element's top edge
    #[arg(short, requires = "x")]
    pub y: Option<i32>,

    #[arg(short, long, value_enum)]
    pub button: Option<Button>,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, clap::Args)]
pub struct TypeArgs {
    /// Text to type
    pub text: String,

    /// Target element [default: the focused element]
    #[arg(long, value_name = "UUID")]
    pub into: Option<String>,

    /// Send as raw key sequence; metacharacters like {ENTER} are interpreted
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, clap::Args)]
pub struct ClipboardArgs {
    #[command(subcommand)]
    pub action: ClipboardAction,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, Subcommand)]
pub enum ClipboardAction {
    /// Print the clipboard text
    Get,
    /// Put text on the clipboard
    Set { text: String },
    /// Empty the clipboard
    Clear,
}

#[derive(Debug, clap::Args)]
pub struct ScreenshotArgs {
    /// Element to capture [default: desktop]
    #[arg(value_name = "UUID")]
    pub uuid: Option<String>,

    /// Directory to write into, under a random name
    #[arg(short, long, default_value = ".", conflicts_with = "output")]
    pub dir: PathBuf,

    /// Exact output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, clap::Args)]
pub struct OptionsArgs {
    /// Path relative to the session, e.g. element/<UUID>/value
    pub path: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, clap::Args)]
pub struct RequestArgs {
    /// HTTP method
    pub method: String,

    /// Path relative to the session
    pub path: String,

    /// JSON request body
    pub body: Option<String>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// End-to-end example text for the `examples` command.
pub const EXAMPLES_TEXT: &str = r#"End-to-end example: write a line in Notepad

# 1. Open a session for the application and remember its id
export TETHER_SESSION=$(tether open --app notepad | jq -r .sessionId)

# 2. Find the editing area of the main window
tether find --type Window
tether find --type edit --under <WINDOW-UUID>

# 3. Click into it and type
tether click <EDIT-UUID>
tether type "Hello from tether!"

# 4. Copy everything and read it back through the clipboard
tether type --raw "^a^c"
tether clipboard get

# 5. Keep a picture of the result
tether screenshot --dir /tmp

# 6. End the session
tether close
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_flags() {
        let cli = Cli::parse_from([
            "tether", "find", "--type", "Button", "--name", "OK", "--children", "-s", "abc",
        ]);
        assert_eq!(cli.command.session(), Some("abc"));
        match cli.command {
            Commands::Find(args) => {
                assert_eq!(args.type_name.as_deref(), Some("Button"));
                assert_eq!(args.name.as_deref(), Some("OK"));
                assert!(args.children);
            }
            _ => panic!("Expected find command"),
        }
    }

    #[test]
    fn test_global_timeout() {
        let cli = Cli::parse_from(["tether", "windows", "--timeout", "inf"]);
        assert_eq!(cli.timeout, Some(Timeout::INFINITE));
        assert_eq!(cli.command.session(), None);
    }

    #[test]
    fn test_click_needs_both_coordinates() {
        assert!(Cli::try_parse_from(["tether", "click", "u1", "-x", "3"]).is_err());
        let cli = Cli::parse_from(["tether", "click", "u1", "-x", "3", "-y", "4", "-b", "right"]);
        match cli.command {
            Commands::Click(args) => {
                assert_eq!((args.x, args.y), (Some(3), Some(4)));
                assert!(matches!(args.button, Some(Button::Right)));
            }
            _ => panic!("Expected click command"),
        }
    }

    #[test]
    fn test_clipboard_set() {
        let cli = Cli::parse_from(["tether", "clipboard", "set", "hello"]);
        match cli.command {
            Commands::Clipboard(args) => {
                assert!(matches!(args.action, ClipboardAction::Set { text } if text == "hello"));
            }
            _ => panic!("Expected clipboard command"),
        }
    }
}
