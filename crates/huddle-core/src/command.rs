//! Console line tokenization shared by the server and client interpreters.

/// A `#`-prefixed console line split into its name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> Command<'a> {
    /// Split `line` on whitespace. Returns `None` when the first token does
    /// not start with `#` (or there is no token), i.e. the line is chat.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().filter(|token| token.starts_with('#'))?;
        Some(Self {
            name,
            args: tokens.collect(),
        })
    }

    /// The sole argument, or a syntax error naming `usage`.
    pub fn single_arg(&self, usage: &'static str) -> Result<&'a str, CommandError> {
        match self.args.as_slice() {
            [arg] => Ok(*arg),
            _ => Err(CommandError::Syntax { usage }),
        }
    }
}

/// Parse the argument list of a `#setport` command.
///
/// The argument is read as a 32-bit signed integer first, so `-1` and
/// `70000` are range errors while `abc` or a 12-digit number is not numeric.
pub fn parse_port(args: &[&str]) -> Result<u16, CommandError> {
    let [arg] = args else {
        return Err(CommandError::Syntax {
            usage: "#setport <port>",
        });
    };
    let value: i32 = arg
        .parse()
        .map_err(|_| CommandError::PortNotNumeric(arg.to_string()))?;
    u16::try_from(value).map_err(|_| CommandError::PortOutOfRange(value))
}

/// A malformed command. The `Display` text is what gets shown to whoever
/// typed it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Please follow the syntax {usage}")]
    Syntax { usage: &'static str },
    #[error("Port number must be between 0 and 65535 (inclusive)")]
    PortOutOfRange(i32),
    #[error("Port number must only contain digits [0-9]")]
    PortNotNumeric(String),
}
