use std::collections::HashSet;

use log::{debug, info};

use crate::error::Result;
use crate::event::Actor;
use crate::relay::Context;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Quit,
    Join(Option<String>),
    Part(Option<String>),
    Close,
    List,
    Unknown(String),
}

impl Command {
    /// `None` when `text` does not start with `prefix`.
    pub fn parse(prefix: char, text: &str) -> Option<Self> {
        if !text.starts_with(prefix) {
            return None;
        }
        let mut args = text.split_whitespace();

        let name = args.next().and_then(|x| x.strip_prefix(prefix)).unwrap_or("");
        let arg = args.next().map(ToOwned::to_owned);

        Some(match name {
            "quit" => Self::Quit,
            "join" => Self::Join(arg),
            "part" | "leave" => Self::Part(arg),
            "close" => Self::Close,
            "list" => Self::List,
            _ => Self::Unknown(name.to_owned()),
        })
    }
}

/// Administrative commands typed into the chat session.
pub struct Commands {
    prefix: char,
    accounts: HashSet<String>,
}

impl Commands {
    pub fn new(prefix: char, accounts: HashSet<String>) -> Self {
        Self { prefix, accounts }
    }

    fn is_authorized(&self, actor: &Actor) -> bool {
        actor.account.as_ref().map_or(false, |x| self.accounts.contains(x))
    }

    /// Runs the command in `text`, if any. Commands from accounts outside the
    /// allow-set are dropped without a reply.
    pub async fn handle(&self, context: &Context, actor: &Actor, channel: Option<&str>, text: &str) -> Result<()> {
        let command = match Command::parse(self.prefix, text) {
            Some(x) => x,
            None => return Ok(()),
        };

        if !self.is_authorized(actor) {
            debug!("Ignoring {:?} from unauthorized {}", command, actor.nick);
            return Ok(());
        }
        info!("{} issued {:?}", actor.nick, command);

        let source = &context.source;
        match command {
            Command::Quit => context.shutdown.cancel(),
            Command::Join(Some(target)) => source.join(&target).await?,
            Command::Join(None) => source.send_text(&actor.nick, "no channel provided").await?,
            Command::Part(target) => match target.as_deref().or(channel) {
                Some(target) => source.part(target).await?,
                None => source.send_text(&actor.nick, "no channel provided").await?,
            },
            Command::Close => context.server.close_all().await,
            Command::List => {
                let channels = source.channels().await.join(", ");
                let reply_to = channel.unwrap_or(&actor.nick);

                source.send_text(reply_to, &format!("I'm in {}", channels)).await?
            }
            Command::Unknown(_) => source.send_text(&actor.nick, "invalid command").await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::dispatch;
    use crate::server::{Connection, Outgoing, Server};
    use crate::source::test::{Action, FakeSource};

    fn parse(text: &str) -> Option<Command> {
        Command::parse('!', text)
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("!quit"), Some(Command::Quit));
        assert_eq!(parse("!join #bar"), Some(Command::Join(Some("#bar".into()))));
        assert_eq!(parse("!join"), Some(Command::Join(None)));
        assert_eq!(parse("!part"), Some(Command::Part(None)));
        assert_eq!(parse("!leave   #az  extra"), Some(Command::Part(Some("#az".into()))));
        assert_eq!(parse("!close"), Some(Command::Close));
        assert_eq!(parse("!list"), Some(Command::List));
        assert_eq!(parse("!dance"), Some(Command::Unknown("dance".into())));
        assert_eq!(parse("!"), Some(Command::Unknown("".into())));
        assert_eq!(parse("! quit"), Some(Command::Unknown("".into())));
    }

    #[test]
    fn test_parse_not_a_command() {
        assert_eq!(parse("quit"), None);
        assert_eq!(parse(" !quit"), None);
        assert_eq!(parse(""), None);
        assert_eq!(Command::parse('.', "!quit"), None);
    }

    struct Harness {
        source: Arc<FakeSource>,
        context: Context,
        commands: Commands,
    }

    fn harness(channels: &[&str]) -> Harness {
        let (source, _events) = FakeSource::new(channels);
        let source = Arc::new(source);
        let server = Arc::new(Server::new(source.clone(), None));
        let (queue, _dispatcher) = dispatch::channel(server.connections().clone(), server.registry().clone());

        let context = Context::new(source.clone(), server, queue);
        let commands = Commands::new('!', vec!["admin".to_owned()].into_iter().collect());

        Harness {
            source,
            context,
            commands,
        }
    }

    fn admin() -> Actor {
        Actor::new("boss", Some("admin"))
    }

    impl Harness {
        async fn run(&self, actor: &Actor, channel: Option<&str>, text: &str) -> Vec<Action> {
            self.commands.handle(&self.context, actor, channel, text).await.unwrap();

            self.source.actions().await
        }
    }

    #[tokio::test]
    async fn test_quit() {
        let h = harness(&[]);

        h.run(&admin(), None, "!quit").await;

        assert!(h.context.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_unauthorized_is_silent() {
        let h = harness(&["#az"]);
        let stranger = Actor::new("boss", Some("someone"));
        let anonymous = Actor::new("boss", None);

        for actor in &[stranger, anonymous] {
            for text in &["!quit", "!join #bar", "!part", "!list", "!bogus"] {
                assert!(h.run(actor, Some("#az"), text).await.is_empty());
            }
        }
        assert!(!h.context.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_join() {
        let h = harness(&[]);

        assert_eq!(h.run(&admin(), None, "!join #bar").await, vec![Action::Join("#bar".into())]);
    }

    #[tokio::test]
    async fn test_join_without_channel() {
        let h = harness(&[]);

        assert_eq!(
            h.run(&admin(), Some("#az"), "!join").await,
            vec![Action::Send("boss".into(), "no channel provided".into())]
        );
    }

    #[tokio::test]
    async fn test_part_defaults_to_current_channel() {
        let h = harness(&["#az"]);

        assert_eq!(h.run(&admin(), Some("#az"), "!part").await, vec![Action::Part("#az".into())]);
    }

    #[tokio::test]
    async fn test_part_argument_wins() {
        let h = harness(&["#az", "#foo"]);

        assert_eq!(h.run(&admin(), Some("#az"), "!leave #foo").await, vec![Action::Part("#foo".into())]);
    }

    #[tokio::test]
    async fn test_part_without_any_channel() {
        let h = harness(&["#az"]);

        assert_eq!(
            h.run(&admin(), None, "!part").await,
            vec![Action::Send("boss".into(), "no channel provided".into())]
        );
    }

    #[tokio::test]
    async fn test_list_replies_in_channel_or_private() {
        let h = harness(&["#foo", "#az"]);

        h.run(&admin(), Some("#foo"), "!list").await;
        let actions = h.run(&admin(), None, "!list").await;

        assert_eq!(
            actions,
            vec![
                Action::Send("#foo".into(), "I'm in #az, #foo".into()),
                Action::Send("boss".into(), "I'm in #az, #foo".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let h = harness(&[]);

        assert_eq!(
            h.run(&admin(), Some("#az"), "!dance").await,
            vec![Action::Send("boss".into(), "invalid command".into())]
        );
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let h = harness(&[]);

        assert!(h.run(&admin(), Some("#az"), "just chatting").await.is_empty());
    }

    #[tokio::test]
    async fn test_close_drops_every_connection() {
        let h = harness(&[]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let connection = Arc::new(Connection::new("127.0.0.1:4000".parse().unwrap(), tx));
        assert!(h.context.server.open(connection.clone()).await);

        h.run(&admin(), None, "!close").await;

        assert!(connection.is_closed());
        assert_eq!(h.context.server.connections().len().await, 0);
        assert!(h.context.server.connections().is_accepting());
        assert!(matches!(rx.recv().await, Some(Outgoing::Text(_))));
        assert_eq!(rx.recv().await, Some(Outgoing::Close));
    }
}
