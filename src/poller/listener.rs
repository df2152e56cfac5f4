use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;

use crate::types::Message;

type Handler = Arc<dyn Fn(Message) -> BoxFuture<'static, ()> + Send + Sync>;
type Predicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Decides whether a listener sees a message
#[derive(Clone)]
pub enum Filter {
    /// Every message
    Any,
    /// Regex over the text (or caption)
    Pattern(Regex),
    /// `/name`, optionally addressed as `/name@botname`
    Command(String),
    Custom(Predicate),
}

impl Filter {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Filter::Pattern(Regex::new(pattern)?))
    }

    pub fn command(name: &str) -> Self {
        Filter::Command(name.trim_start_matches('/').to_string())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Filter::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Filter::Any => true,
            Filter::Pattern(re) => message.text_or_caption().is_some_and(|t| re.is_match(t)),
            Filter::Command(name) => message
                .text
                .as_deref()
                .and_then(|t| t.split_whitespace().next())
                .and_then(|word| word.strip_prefix('/'))
                .map(|cmd| cmd.split('@').next() == Some(name.as_str()))
                .unwrap_or(false),
            Filter::Custom(predicate) => predicate(message),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Any => write!(f, "Any"),
            Filter::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Filter::Command(name) => write!(f, "Command(/{})", name),
            Filter::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A filter plus the async callback run for each matching message
#[derive(Clone)]
pub struct Listener {
    filter: Filter,
    handler: Handler,
}

impl Listener {
    pub fn new<F, Fut>(filter: Filter, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            filter,
            handler: Arc::new(move |message| handler(message).boxed()),
        }
    }

    /// Listen for messages whose text matches `pattern`, e.g. `^/start$`
    pub fn on_pattern<F, Fut>(pattern: &str, handler: F) -> Result<Self, regex::Error>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Ok(Self::new(Filter::pattern(pattern)?, handler))
    }

    pub fn on_command<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(Filter::command(name), handler)
    }

    pub fn on_message<F, Fut>(handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(Filter::Any, handler)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.filter.matches(message)
    }

    pub(crate) async fn invoke(&self, message: Message) {
        (self.handler)(message).await
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
