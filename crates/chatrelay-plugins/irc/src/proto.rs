//! IRC line framing: parsing inbound lines and rendering outbound commands.

use crate::transport::{ClientCommand, ClientEvent, ConnectOptions};

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub(crate) prefix: Option<String>,
    pub(crate) command: String,
    pub(crate) params: Vec<String>,
}

/// Parses a raw line into prefix, command and params.
///
/// Returns `None` for empty or malformed input. The trailing parameter
/// (after ` :`) is kept as a single param, spaces included.
pub(crate) fn parse(input: &str) -> Option<Line> {
    let input = input.trim_end_matches(['\r', '\n']);
    let mut rest = input;
    let prefix = match rest.strip_prefix(':') {
        Some(tagged) => {
            let (prefix, remainder) = tagged.split_once(' ')?;
            rest = remainder;
            Some(prefix.to_string())
        }
        None => None,
    };
    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };
    let mut params: Vec<String> = head.split_whitespace().map(str::to_string).collect();
    if params.is_empty() {
        return None;
    }
    let command = params.remove(0).to_ascii_uppercase();
    if let Some(trailing) = trailing {
        params.push(trailing.to_string());
    }
    Some(Line { prefix, command, params })
}

/// Extracts the nick from a `nick!user@host` prefix.
pub(crate) fn nick_of(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}

/// What the session loop should do with a parsed line.
pub(crate) enum Translated {
    Event(ClientEvent),
    Pong(String),
    Ignore,
}

pub(crate) fn translate(line: &Line) -> Translated {
    match line.command.as_str() {
        "PING" => Translated::Pong(line.params.first().cloned().unwrap_or_default()),
        "001" => Translated::Event(ClientEvent::Welcome),
        "433" => Translated::Event(ClientEvent::NickInUse),
        "PRIVMSG" if line.params.len() >= 2 => Translated::Event(ClientEvent::Privmsg {
            from: line.prefix.clone().unwrap_or_default(),
            target: line.params[0].clone(),
            text: line.params[1].clone(),
        }),
        "NOTICE" if line.params.len() >= 2 => Translated::Event(ClientEvent::Notice {
            from: line.prefix.clone().unwrap_or_default(),
            target: line.params[0].clone(),
            text: line.params[1].clone(),
        }),
        "JOIN" if !line.params.is_empty() => match &line.prefix {
            Some(prefix) => Translated::Event(ClientEvent::Joined {
                nick: nick_of(prefix).to_string(),
                channel: line.params[0].clone(),
            }),
            None => Translated::Ignore,
        },
        "PART" if !line.params.is_empty() => match &line.prefix {
            Some(prefix) => Translated::Event(ClientEvent::Parted {
                nick: nick_of(prefix).to_string(),
                channel: line.params[0].clone(),
            }),
            None => Translated::Ignore,
        },
        _ => Translated::Ignore,
    }
}

/// Renders the registration burst sent right after connecting.
pub(crate) fn registration(options: &ConnectOptions) -> String {
    format!(
        "NICK {}\r\nUSER {} 0 * :{}\r\n",
        options.nick, options.username, options.realname
    )
}

pub(crate) fn render(command: &ClientCommand) -> String {
    match command {
        ClientCommand::Privmsg { target, text } => format!("PRIVMSG {target} :{text}\r\n"),
        ClientCommand::Join { channel } => format!("JOIN {channel}\r\n"),
        ClientCommand::Nick { nick } => format!("NICK {nick}\r\n"),
        ClientCommand::Mode { nick, modes } => format!("MODE {nick} {modes}\r\n"),
        ClientCommand::Quit { reason } => match reason {
            Some(reason) => format!("QUIT :{reason}\r\n"),
            None => "QUIT\r\n".to_string(),
        },
    }
}
