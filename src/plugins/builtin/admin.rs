//! Administrative commands: plugin reloading and speaking as the bot

use anyhow::Context;

use crate::application::errors::PluginError;
use crate::application::messaging::{BoundArgs, RequestContext};
use crate::domain::entities::{HandlerDescriptor, ParamSpec, ParamType};
use crate::plugins::module::PluginModule;

pub const MODULE_PATH: &str = "builtin.admin";

pub fn module() -> Result<PluginModule, PluginError> {
    Ok(PluginModule::new()
        .with_handler(
            HandlerDescriptor::command("reload", reload)
                .with_param(ParamSpec::new("plugin"))
                .admin_required(),
        )
        .with_handler(
            HandlerDescriptor::command("unload", unload)
                .with_param(ParamSpec::new("plugin"))
                .admin_required(),
        )
        .with_handler(
            HandlerDescriptor::command("say", say)
                .with_param(ParamSpec::new("msg"))
                .with_param(ParamSpec::new("nick").optional())
                .with_param(ParamSpec::new("chan").typed(ParamType::channel()).optional())
                .with_max_args(1)
                .admin_required(),
        ))
}

async fn reload(ctx: RequestContext, args: BoundArgs) -> anyhow::Result<()> {
    let name: String = args.get("plugin").context("plugin name is required")?;
    ctx.registry().reload(&name).await?;
    ctx.reply("Done!").await?;
    Ok(())
}

async fn unload(ctx: RequestContext, args: BoundArgs) -> anyhow::Result<()> {
    let name: String = args.get("plugin").context("plugin name is required")?;
    ctx.registry().unload(&name).await?;
    ctx.reply("Done!").await?;
    Ok(())
}

/// `say <msg> [nick=..] [chan=#..]`
async fn say(ctx: RequestContext, args: BoundArgs) -> anyhow::Result<()> {
    let msg: String = args.get("msg").context("message is required")?;
    let nick: Option<String> = args.get("nick");
    let chan: Option<String> = args.get("chan");

    if ctx.is_private() && chan.is_none() && nick.is_none() {
        return Ok(());
    }

    match (chan, nick) {
        (Some(chan), Some(nick)) => ctx.say_to(format!("{}: {}", nick, msg), &chan).await?,
        (Some(target), None) | (None, Some(target)) => ctx.say_to(&msg, &target).await?,
        (None, None) => ctx.say(&msg).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_commands_are_admin_only() {
        let module = module().unwrap();
        let names: Vec<_> = module.handlers.iter().filter_map(|h| h.template()).collect();
        assert_eq!(names, vec!["reload", "unload", "say"]);
        assert!(module.handlers.iter().all(|h| h.admin_required));
    }
}
