use crate::context::Context;
use crate::resource::ResourceKind;
use crate::utils::print_record;
use colored::Colorize;

pub fn handle(ctx: &Context, kind: ResourceKind, handle: &str) -> anyhow::Result<()> {
    let resolver = kind.resolver(ctx.offline_subscription_id());
    let identity = resolver.parse(handle)?;

    println!("{}", "✓ 有効なリソース ID です".green().bold());
    print_record(&kind.schema(), &resolver.flatten_identity(&identity));
    Ok(())
}
