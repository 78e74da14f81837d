use std::path::PathBuf;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Anything that is not a slash command
    Prompt(String),
    Help,
    ListModels,
    SwitchModel(String),
    SetLocalUrl(String),
    NewChat,
    History,
    /// 1-based position in the creation history
    Select(usize),
    /// 1-based turn number in the conversation
    PreviewTurn(usize),
    Verify,
    Attach(PathBuf),
    Quit,
    Invalid(String),
}

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();

    let Some(rest) = input.strip_prefix('/') else {
        return Command::Prompt(input.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "" | "help" | "h" => Command::Help,
        "models" => Command::ListModels,
        "model" | "m" if args.is_empty() => Command::ListModels,
        "model" | "m" => Command::SwitchModel(args.to_string()),
        "url" if args.is_empty() => Command::Invalid("Usage: /url <local daemon url>".to_string()),
        "url" => Command::SetLocalUrl(args.to_string()),
        "new" => Command::NewChat,
        "history" => Command::History,
        "select" => parse_index(args, "/select <n>").map_or_else(Command::Invalid, Command::Select),
        "preview" => {
            parse_index(args, "/preview <turn>").map_or_else(Command::Invalid, Command::PreviewTurn)
        }
        "verify" => Command::Verify,
        "attach" if args.is_empty() => Command::Invalid("Usage: /attach <path>".to_string()),
        "attach" => Command::Attach(PathBuf::from(args)),
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Invalid(format!("Unknown command: /{}", name)),
    }
}

fn parse_index(args: &str, usage: &str) -> Result<usize, String> {
    match args.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Usage: {}", usage)),
    }
}

pub fn help_text() -> &'static str {
    concat!(
        "Available commands:\n",
        "/help, /h          - Show this help\n",
        "/models            - List catalog and local models\n",
        "/model <id>        - Switch to a model or catalog alias\n",
        "/url <url>         - Set the local daemon URL and re-probe it\n",
        "/new               - Start a new chat (history is kept)\n",
        "/history           - List creations, most recent first\n",
        "/select <n>        - Preview creation number n\n",
        "/preview <turn>    - Preview the HTML in conversation turn number <turn>\n",
        "/verify            - Ask the model to review the active creation\n",
        "/attach <path>     - Attach an image to the next prompt\n",
        "/quit              - Exit\n",
        "\n",
        "Anything else is sent as a prompt.",
    )
}

/// Guess the MIME type of an attachment from its extension
pub fn mime_type_for(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
