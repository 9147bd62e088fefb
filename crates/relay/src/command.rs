/// A recognised trigger command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// First argument after the trigger, if any.
    pub link: Option<&'a str>,
}

/// Recognise `text` as `<trigger> <link>`.
///
/// The first whitespace-delimited token must equal `trigger` exactly; any
/// further arguments after the link are ignored.
#[must_use]
pub fn parse_command<'a>(text: &'a str, trigger: &str) -> Option<Command<'a>> {
    let mut tokens = text.split_whitespace();
    if tokens.next()? != trigger {
        return None;
    }
    Some(Command {
        link: tokens.next(),
    })
}
