use super::with_reconciler;
use crate::context::Context;
use crate::resource::ResourceFile;
use colored::Colorize;
use reconflow_cloud::{Backend, PropertyMapper, PropertyRecord, Reconciler};
use std::path::Path;

pub async fn handle(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let file = ResourceFile::load(path)?;
    let desired = file.desired()?;
    let address = file.address().to_string();

    let mut state = ctx.store.load().await?;
    let stored = state.get(&address).map(|entry| entry.handle.clone());

    with_reconciler!(ctx, file.kind, |reconciler| {
        run(&reconciler, &desired, stored.as_deref()).await
    })?;

    if state.remove(&address).is_some() {
        ctx.store.save(&state).await?;
    }

    Ok(())
}

async fn run<M, B>(
    reconciler: &Reconciler<M, B>,
    desired: &PropertyRecord,
    stored: Option<&str>,
) -> anyhow::Result<()>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    let identity = match stored {
        Some(handle) => reconciler.resolver().parse(handle)?,
        None => reconciler.resolver().resolve_for_write(desired)?,
    };

    println!("{} {}", "削除中:".blue(), identity);
    reconciler.delete(&identity).await?;
    println!("{}", "✓ 削除しました".green().bold());
    Ok(())
}
