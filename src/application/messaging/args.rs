//! Argument binding - tokenizes free text and binds it to handler parameters

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::application::errors::BindError;
use crate::domain::entities::{HandlerDescriptor, MaxArgs};

/// `name=value`, `name="quoted value"`, `"quoted"` or a bare word
static ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#" *(?:(\w+)= *)?(?:"([^"]+)"|(\S+))"#).expect("argument pattern is valid")
});

/// Unbound string arguments, `None` for pattern groups that did not match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArgs {
    pub positional: Vec<Option<String>>,
    pub named: IndexMap<String, Option<String>>,
}

impl RawArgs {
    pub fn positional(&self) -> Vec<&str> {
        self.positional.iter().flatten().map(String::as_str).collect()
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(|v| v.as_deref())
    }
}

/// Split free text into positional and named arguments.
///
/// Bare words are dropped when `max_args` is `Limited(0)`. Words past a
/// limited cap are folded into the last kept word so a trailing parameter
/// can take free text.
pub fn tokenize(text: &str, max_args: MaxArgs) -> RawArgs {
    let mut raw = RawArgs::default();
    let mut positional = Vec::new();

    for caps in ARG_RE.captures_iter(text) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        match caps.get(1) {
            Some(name) => {
                raw.named.insert(name.as_str().to_string(), Some(value));
            }
            None if max_args == MaxArgs::Limited(0) => {}
            None => positional.push(value),
        }
    }

    if let MaxArgs::Limited(cap) = max_args {
        fold_overflow(&mut positional, cap);
    }
    raw.positional = positional.into_iter().map(Some).collect();
    raw
}

fn fold_overflow(args: &mut Vec<String>, cap: usize) {
    if args.len() <= cap {
        return;
    }
    let overflow = args.split_off(cap).join(" ");
    match args.last_mut() {
        Some(last) => {
            last.push(' ');
            last.push_str(&overflow);
        }
        None => args.push(overflow),
    }
}

/// Arguments after binding and coercion, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: IndexMap<String, Value>,
    rest: Vec<String>,
}

impl BoundArgs {
    /// Typed value; `None` when absent, null or not convertible
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.values.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => serde_json::from_value(value.clone()).ok(),
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Surplus bare words of a variadic handler
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind raw arguments to the handler's declared parameters.
///
/// Positional arguments fill parameters in order, named ones fill the rest,
/// defaults cover what is left. Every string value, supplied or default, is
/// coerced to the declared type; other defaults are used as declared.
pub fn bind(handler: &HandlerDescriptor, raw: RawArgs) -> Result<BoundArgs, BindError> {
    let params = &handler.params;
    let mut slots: Vec<Option<Option<String>>> = vec![None; params.len()];

    let mut positional = raw.positional.into_iter();
    for (slot, value) in slots.iter_mut().zip(positional.by_ref()) {
        *slot = Some(value);
    }
    let rest: Vec<Option<String>> = positional.collect();
    if !rest.is_empty() && handler.max_positional_args() != MaxArgs::Unlimited {
        return Err(BindError::TooManyPositional {
            expected: params.len(),
            got: params.len() + rest.len(),
        });
    }

    for (name, value) in raw.named {
        let index = params
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| BindError::UnexpectedNamed(name.clone()))?;
        if slots[index].is_some() {
            return Err(BindError::Duplicate(name));
        }
        slots[index] = Some(value);
    }

    let mut values = IndexMap::with_capacity(params.len());
    for (param, slot) in params.iter().zip(slots) {
        let raw = match slot {
            Some(Some(raw)) => raw,
            Some(None) => {
                values.insert(param.name.clone(), Value::Null);
                continue;
            }
            None => match &param.default {
                Some(Value::String(raw)) if !param.ty.is_text() => raw.clone(),
                Some(default) => {
                    values.insert(param.name.clone(), default.clone());
                    continue;
                }
                None => return Err(BindError::Missing(param.name.clone())),
            },
        };
        let value = param.ty.coerce(&raw).map_err(|reason| BindError::Coercion {
            param: param.name.clone(),
            value: raw,
            reason,
        })?;
        values.insert(param.name.clone(), value);
    }

    Ok(BoundArgs {
        values,
        rest: rest.into_iter().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::RequestContext;
    use crate::domain::entities::{ParamSpec, ParamType};

    async fn noop(_ctx: RequestContext, _args: BoundArgs) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_overflow_folds_into_last_arg() {
        let raw = tokenize("one two three", MaxArgs::Limited(2));
        assert_eq!(raw.positional(), vec!["one", "two three"]);
    }

    #[test]
    fn test_named_and_quoted() {
        let raw = tokenize(r#"msg="hello world" nick=bob"#, MaxArgs::Limited(3));
        assert!(raw.positional.is_empty());
        assert_eq!(raw.named("msg"), Some("hello world"));
        assert_eq!(raw.named("nick"), Some("bob"));
    }

    #[test]
    fn test_bare_quoted_word() {
        let raw = tokenize(r#""New York" tomorrow"#, MaxArgs::Limited(2));
        assert_eq!(raw.positional(), vec!["New York", "tomorrow"]);
    }

    #[test]
    fn test_zero_cap_discards_bare_words() {
        let raw = tokenize("stray words key=v", MaxArgs::Limited(0));
        assert!(raw.positional.is_empty());
        assert_eq!(raw.named("key"), Some("v"));
    }

    #[test]
    fn test_unlimited_never_folds() {
        let raw = tokenize("a b c d", MaxArgs::Unlimited);
        assert_eq!(raw.positional(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(tokenize("", MaxArgs::Limited(2)), RawArgs::default());
    }

    fn rocket() -> HandlerDescriptor {
        HandlerDescriptor::command("rocket", noop)
            .with_param(ParamSpec::new("nick"))
            .with_param(ParamSpec::new("n").typed(ParamType::int_range(0, 10)).with_default(3))
            .with_param(ParamSpec::new("chan").typed(ParamType::channel()).optional())
    }

    #[test]
    fn test_bind_applies_defaults_and_coercion() {
        let handler = rocket();
        let args = bind(&handler, tokenize("bob 5", handler.max_positional_args())).unwrap();
        assert_eq!(args.str("nick"), Some("bob"));
        assert_eq!(args.get::<i64>("n"), Some(5));
        assert_eq!(args.value("chan"), Some(&Value::Null));

        let args = bind(&handler, tokenize("bob chan=#rust", handler.max_positional_args())).unwrap();
        assert_eq!(args.get::<i64>("n"), Some(3));
        assert_eq!(args.get::<String>("chan").as_deref(), Some("#rust"));
    }

    #[test]
    fn test_string_default_is_coerced() {
        let handler = HandlerDescriptor::command("count", noop)
            .with_param(ParamSpec::new("n").typed(ParamType::Integer).with_default("5"))
            .with_param(ParamSpec::new("loud").typed(ParamType::Boolean).with_default(false))
            .with_param(ParamSpec::new("label").with_default("7"));
        let args = bind(&handler, tokenize("", handler.max_positional_args())).unwrap();
        assert_eq!(args.get::<i64>("n"), Some(5));
        assert_eq!(args.get::<bool>("loud"), Some(false));
        assert_eq!(args.str("label"), Some("7"));

        let broken = HandlerDescriptor::command("count", noop)
            .with_param(ParamSpec::new("n").typed(ParamType::Integer).with_default("five"));
        assert!(matches!(
            bind(&broken, RawArgs::default()).unwrap_err(),
            BindError::Coercion { .. }
        ));
    }

    #[test]
    fn test_bind_failures() {
        let handler = rocket();
        let bind_text = |text: &str| bind(&handler, tokenize(text, handler.max_positional_args()));

        assert_eq!(bind_text("").unwrap_err(), BindError::Missing("nick".into()));
        assert!(matches!(bind_text("bob 11").unwrap_err(), BindError::Coercion { .. }));
        assert_eq!(bind_text("bob why=x").unwrap_err(), BindError::UnexpectedNamed("why".into()));
        assert_eq!(bind_text("bob nick=alice").unwrap_err(), BindError::Duplicate("nick".into()));
    }

    #[test]
    fn test_bind_too_many_positional() {
        let handler = HandlerDescriptor::command("join", noop).with_param(ParamSpec::new("chan"));
        let raw = RawArgs {
            positional: vec![Some("#a".into()), Some("#b".into())],
            ..RawArgs::default()
        };
        assert_eq!(
            bind(&handler, raw).unwrap_err(),
            BindError::TooManyPositional { expected: 1, got: 2 }
        );
    }

    #[test]
    fn test_bind_variadic_rest() {
        let handler = HandlerDescriptor::command("echo", noop)
            .with_param(ParamSpec::new("first"))
            .variadic();
        let args = bind(&handler, tokenize("a b c", handler.max_positional_args())).unwrap();
        assert_eq!(args.str("first"), Some("a"));
        assert_eq!(args.rest(), ["b", "c"]);
    }

    #[test]
    fn test_unmatched_group_binds_null_without_coercion() {
        let handler = HandlerDescriptor::command("count", noop)
            .with_param(ParamSpec::new("n").typed(ParamType::Integer));
        let raw = RawArgs {
            positional: vec![None],
            ..RawArgs::default()
        };
        let args = bind(&handler, raw).unwrap();
        assert_eq!(args.get::<i64>("n"), None);
        assert_eq!(args.value("n"), Some(&Value::Null));
    }
}
