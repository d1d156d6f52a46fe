//! Handler descriptors - the registration record of one plugin handler

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use regex_lite::Regex;
use serde_json::Value;

use super::message::is_channel_name;
use crate::application::errors::PluginError;
use crate::application::messaging::{BoundArgs, RequestContext};

/// Future returned by a handler
pub type HandlerFuture = LocalBoxFuture<'static, anyhow::Result<()>>;

/// Handler function type
pub type HandlerFn = Rc<dyn Fn(RequestContext, BoundArgs) -> HandlerFuture>;

/// Converts one raw string token into a typed value
pub type Coercer = Rc<dyn Fn(&str) -> Result<Value, String>>;

/// Declared type of a handler parameter
#[derive(Clone)]
pub enum ParamType {
    /// Plain string, never coerced
    Text,
    Integer,
    Float,
    Boolean,
    Custom { name: String, coerce: Coercer },
}

impl ParamType {
    pub fn custom<F>(name: impl Into<String>, coerce: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + 'static,
    {
        Self::Custom {
            name: name.into(),
            coerce: Rc::new(coerce),
        }
    }

    /// Integer within `lo..=hi`
    pub fn int_range(lo: i64, hi: i64) -> Self {
        Self::custom(format!("int({}..={})", lo, hi), move |raw| {
            let n: i64 = raw.trim().parse().map_err(|e| format!("{}", e))?;
            if (lo..=hi).contains(&n) {
                Ok(Value::from(n))
            } else {
                Err(format!("{} is not in range {}..={}", n, lo, hi))
            }
        })
    }

    /// A channel name such as `#rust`
    pub fn channel() -> Self {
        Self::custom("channel", |raw| {
            if is_channel_name(raw) {
                Ok(Value::from(raw))
            } else {
                Err("not a channel name".to_string())
            }
        })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    pub fn coerce(&self, raw: &str) -> Result<Value, String> {
        match self {
            Self::Text => Ok(Value::from(raw)),
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("{:?} is not a boolean", other)),
            },
            Self::Custom { coerce, .. } => coerce(raw),
        }
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "Text"),
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Custom { name, .. } => write!(f, "Custom({})", name),
        }
    }
}

/// One declared handler parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl ParamSpec {
    /// Required text parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Text,
            default: None,
        }
    }

    pub fn typed(mut self, ty: ParamType) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Defaults to null
    pub fn optional(self) -> Self {
        self.with_default(Value::Null)
    }
}

/// How many bare words a command handler accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxArgs {
    Limited(usize),
    Unlimited,
}

/// What makes a handler fire
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Literal command name; `{key}` placeholders are filled from the plugin config
    Command(String),
    /// Regular expression run against every non-command line
    Pattern(Regex),
}

/// Immutable description of a registered handler
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub name: String,
    pub trigger: Trigger,
    pub params: Vec<ParamSpec>,
    max_args: Option<usize>,
    variadic: bool,
    pub allow_private: bool,
    pub allow_channel: bool,
    pub admin_required: bool,
    pub rate_limited: bool,
    func: HandlerFn,
}

impl HandlerDescriptor {
    fn with_trigger<F, Fut>(trigger: Trigger, name: String, func: F) -> Self
    where
        F: Fn(RequestContext, BoundArgs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let rate_limited = matches!(trigger, Trigger::Command(_));
        Self {
            name,
            trigger,
            params: Vec::new(),
            max_args: None,
            variadic: false,
            allow_private: true,
            allow_channel: true,
            admin_required: false,
            rate_limited,
            func: Rc::new(move |ctx, args| func(ctx, args).boxed_local()),
        }
    }

    /// Command handler fired by `<prefix><template>`
    pub fn command<F, Fut>(template: impl Into<String>, func: F) -> Self
    where
        F: Fn(RequestContext, BoundArgs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let template = template.into();
        Self::with_trigger(Trigger::Command(template.clone()), template, func)
    }

    /// Pattern handler; fails if the expression does not compile
    pub fn pattern<F, Fut>(pattern: &str, func: F) -> Result<Self, PluginError>
    where
        F: Fn(RequestContext, BoundArgs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let regex = Regex::new(pattern).map_err(|e| PluginError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::with_trigger(Trigger::Pattern(regex), pattern.to_string(), func))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Cap the bare words; the overflow is folded into the last one
    pub fn with_max_args(mut self, max: usize) -> Self {
        self.max_args = Some(max);
        self
    }

    /// Accept any number of bare words; surplus ones land in `BoundArgs::rest`
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn private_only(self) -> Self {
        self.with_scope(true, false)
    }

    pub fn channel_only(self) -> Self {
        self.with_scope(false, true)
    }

    pub fn with_scope(mut self, allow_private: bool, allow_channel: bool) -> Self {
        self.allow_private = allow_private;
        self.allow_channel = allow_channel;
        self
    }

    pub fn admin_required(mut self) -> Self {
        self.admin_required = true;
        self
    }

    pub fn rate_limited(mut self, rate_limited: bool) -> Self {
        self.rate_limited = rate_limited;
        self
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self.trigger, Trigger::Pattern(_))
    }

    pub fn template(&self) -> Option<&str> {
        match &self.trigger {
            Trigger::Command(template) => Some(template),
            Trigger::Pattern(_) => None,
        }
    }

    pub fn max_positional_args(&self) -> MaxArgs {
        if self.variadic {
            MaxArgs::Unlimited
        } else {
            MaxArgs::Limited(self.max_args.unwrap_or(self.params.len()))
        }
    }

    /// Privacy scoping
    pub fn allows(&self, private: bool) -> bool {
        if private {
            self.allow_private
        } else {
            self.allow_channel
        }
    }

    pub fn call(&self, ctx: RequestContext, args: BoundArgs) -> HandlerFuture {
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("params", &self.params)
            .field("max_args", &self.max_positional_args())
            .field("allow_private", &self.allow_private)
            .field("allow_channel", &self.allow_channel)
            .field("admin_required", &self.admin_required)
            .field("rate_limited", &self.rate_limited)
            .finish()
    }
}
