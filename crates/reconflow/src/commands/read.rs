use super::with_reconciler;
use crate::context::Context;
use crate::resource::ResourceFile;
use crate::utils::print_record;
use colored::Colorize;
use reconflow_cloud::{Backend, PropertyMapper, PropertyRecord, ReadOutcome, Reconciler};
use std::path::Path;

pub async fn handle(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let file = ResourceFile::load(path)?;
    let desired = file.desired()?;
    let address = file.address().to_string();

    let mut state = ctx.store.load().await?;
    let stored = state.get(&address).map(|entry| entry.handle.clone());

    let present = with_reconciler!(ctx, file.kind, |reconciler| {
        run(&reconciler, &desired, stored.as_deref()).await
    })?;

    if !present && stored.is_some() {
        // 外部で削除されたリソースは状態から外す
        state.remove(&address);
        ctx.store.save(&state).await?;
    }

    Ok(())
}

async fn run<M, B>(
    reconciler: &Reconciler<M, B>,
    desired: &PropertyRecord,
    stored: Option<&str>,
) -> anyhow::Result<bool>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    let identity = match stored {
        Some(handle) => reconciler.resolver().parse(handle)?,
        None => reconciler.resolver().resolve_for_write(desired)?,
    };

    match reconciler.read(&identity).await? {
        ReadOutcome::Present(record) => {
            println!("{}", identity.to_string().bold());
            print_record(reconciler.mapper().schema(), &record);
            Ok(true)
        }
        ReadOutcome::Absent => {
            println!(
                "{} {}",
                "⚠ リソースが存在しません:".yellow(),
                identity
            );
            Ok(false)
        }
    }
}
