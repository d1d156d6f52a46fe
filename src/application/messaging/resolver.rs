//! Resolver - picks the plugin handlers an incoming line applies to

use std::rc::Rc;

use super::args::RawArgs;
use super::parser::{MessageParser, Mode};
use crate::domain::entities::{HandlerDescriptor, Trigger};
use crate::infrastructure::config::{split_list, MainSettings};
use crate::plugins::plugin::{Plugin, PluginConfig};

/// Pattern handlers fire at most this many times per line
pub const MAX_PATTERN_MATCHES: usize = 3;

/// Config key always injected into a plugin's merged config
pub const NICK_KEY: &str = "__nick__";

/// A selected handler of a live plugin
#[derive(Debug, Clone)]
pub struct Candidate {
    pub plugin: Rc<Plugin>,
    pub index: usize,
}

impl Candidate {
    pub fn handler(&self) -> &HandlerDescriptor {
        &self.plugin.handlers()[self.index]
    }
}

/// One pattern match, ready to be dispatched
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub candidate: Candidate,
    pub args: RawArgs,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    parser: MessageParser,
    nick: String,
}

impl Resolver {
    pub fn new(settings: &MainSettings) -> Self {
        Self {
            parser: MessageParser::new(&settings.command_prefix, &settings.nick),
            nick: settings.nick.clone(),
        }
    }

    pub fn detect<'a>(&self, line: &'a str) -> Mode<'a> {
        self.parser.parse(line)
    }

    /// Plugin config plus the bot's own nick under `__nick__`
    pub fn merged_config(&self, plugin: &Plugin) -> PluginConfig {
        let mut config = plugin.config().clone();
        config.insert(NICK_KEY.to_string(), self.nick.clone());
        config
    }

    /// First command handler named `name` that may fire here
    pub fn find_command(
        &self,
        plugins: &[Rc<Plugin>],
        name: &str,
        private: bool,
        channel: Option<&str>,
    ) -> Option<Candidate> {
        candidates(plugins, private)
            .filter(|candidate| !candidate.handler().is_pattern())
            .find(|candidate| {
                let handler = candidate.handler();
                let config = self.merged_config(&candidate.plugin);
                let Some(template) = handler.template() else {
                    return false;
                };
                match render_template(template, &config) {
                    Some(rendered) if rendered == name => channel_allowed(&config, private, channel),
                    Some(_) => false,
                    None => {
                        tracing::debug!(
                            "Command template {:?} of plugin '{}' references a missing config key",
                            template,
                            candidate.plugin.name()
                        );
                        false
                    }
                }
            })
    }

    /// Every pattern handler match in `line`, capped per handler
    pub fn find_patterns(&self, plugins: &[Rc<Plugin>], line: &str, private: bool) -> Vec<PatternMatch> {
        let mut matches = Vec::new();

        for candidate in candidates(plugins, private) {
            let Trigger::Pattern(regex) = &candidate.handler().trigger else {
                continue;
            };
            let names: Vec<Option<&str>> = regex.capture_names().collect();

            for caps in regex.captures_iter(line).take(MAX_PATTERN_MATCHES) {
                let mut args = RawArgs::default();
                for (index, name) in names.iter().enumerate().skip(1) {
                    let value = caps.get(index).map(|m| m.as_str().to_string());
                    match name {
                        Some(name) => {
                            args.named.insert(name.to_string(), value);
                        }
                        None => args.positional.push(value),
                    }
                }
                matches.push(PatternMatch {
                    candidate: candidate.clone(),
                    args,
                });
            }
        }
        matches
    }
}

/// All handlers allowed by privacy scoping, in resolution order
fn candidates(plugins: &[Rc<Plugin>], private: bool) -> impl Iterator<Item = Candidate> + '_ {
    plugins.iter().flat_map(move |plugin| {
        plugin
            .handlers()
            .iter()
            .enumerate()
            .filter(move |(_, handler)| handler.allows(private))
            .map(move |(index, _)| Candidate {
                plugin: Rc::clone(plugin),
                index,
            })
    })
}

/// Whitelist wins; the blacklist is only consulted without a whitelist
fn channel_allowed(config: &PluginConfig, private: bool, channel: Option<&str>) -> bool {
    let Some(channel) = channel.filter(|_| !private) else {
        return true;
    };
    let list = |key: &str| config.get(key).map(|v| split_list(v)).unwrap_or_default();

    let whitelist = list("whitelist");
    if !whitelist.is_empty() {
        return whitelist.iter().any(|c| c == channel);
    }
    !list("blacklist").iter().any(|c| c == channel)
}

/// Fill `{key}` placeholders from `config`; `{{` and `}}` are literal braces.
///
/// Returns `None` when a placeholder names a missing key or is unterminated.
pub fn render_template(template: &str, config: &PluginConfig) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        '{' if key.is_empty() => {
                            out.push('{');
                            break;
                        }
                        '}' => {
                            out.push_str(config.get(&key)?);
                            break;
                        }
                        c => key.push(c),
                    }
                }
            }
            '}' => {
                if chars.next()? != '}' {
                    return None;
                }
                out.push('}');
            }
            _ => out.push(ch),
        }
    }
    Some(out)
}
