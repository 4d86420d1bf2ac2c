use super::with_reconciler;
use crate::context::Context;
use crate::resource::ResourceKind;
use crate::utils::print_record;
use colored::Colorize;
use reconflow_cloud::{Backend, HandleEntry, PropertyMapper, Reconciler};

pub async fn handle(
    ctx: &Context,
    kind: ResourceKind,
    handle: &str,
    address: &str,
) -> anyhow::Result<()> {
    let mut state = ctx.store.load().await?;
    if let Some(entry) = state.get(address) {
        anyhow::bail!(
            "アドレス '{}' は既に管理されています ({})",
            address,
            entry.handle
        );
    }

    println!("{} {}", "取り込み中:".blue(), handle);
    let imported = with_reconciler!(ctx, kind, |reconciler| run(&reconciler, handle).await)?;

    state.set(address, HandleEntry::new(kind.resource_type(), imported));
    ctx.store.save(&state).await?;
    println!(
        "{} {}",
        "✓ 取り込みました:".green().bold(),
        address.cyan()
    );

    Ok(())
}

async fn run<M, B>(reconciler: &Reconciler<M, B>, handle: &str) -> anyhow::Result<String>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    let (identity, record) = reconciler.import(handle).await?;
    print_record(reconciler.mapper().schema(), &record);
    Ok(identity.to_string())
}
