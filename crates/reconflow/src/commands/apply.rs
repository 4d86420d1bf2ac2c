use super::with_reconciler;
use crate::context::Context;
use crate::resource::ResourceFile;
use crate::utils::print_record;
use colored::Colorize;
use reconflow_cloud::{
    Backend, HandleEntry, PropertyMapper, PropertyRecord, Reconciler, WriteMode,
};
use std::path::Path;

pub async fn handle(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let file = ResourceFile::load(path)?;
    let desired = file.desired()?;
    let address = file.address().to_string();
    let resource_type = file.kind.resource_type();

    let mut state = ctx.store.load().await?;
    let stored = state.get(&address).cloned();
    if let Some(entry) = &stored
        && entry.resource_type != resource_type
    {
        anyhow::bail!(
            "アドレス '{}' は別の種別 ({}) で管理されています",
            address,
            entry.resource_type
        );
    }

    let previous = stored.as_ref().map(|entry| entry.handle.as_str());
    let handle = with_reconciler!(ctx, file.kind, |reconciler| {
        run(&reconciler, &desired, previous).await
    })?;

    state.set(address.clone(), HandleEntry::new(resource_type, handle));
    ctx.store.save(&state).await?;
    tracing::debug!("Saved handle for {}", address);

    Ok(())
}

/// Create when nothing is stored, update in place when the identity is
/// unchanged, otherwise replace the old object
async fn run<M, B>(
    reconciler: &Reconciler<M, B>,
    desired: &PropertyRecord,
    previous: Option<&str>,
) -> anyhow::Result<String>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    let identity = reconciler.resolver().resolve_for_write(desired)?;

    let mode = match previous {
        None => WriteMode::Create,
        Some(handle) => {
            let previous = reconciler.resolver().parse(handle)?;
            if previous.same_resource(&identity) {
                WriteMode::Update
            } else {
                println!("{}", "識別子が変わったため置き換えます".yellow().bold());
                println!("  {} {}", "-".red(), previous);
                println!("  {} {}", "+".green(), identity);
                reconciler.delete(&previous).await?;
                WriteMode::Create
            }
        }
    };

    let label = match mode {
        WriteMode::Create => "作成中:",
        WriteMode::Update => "更新中:",
    };
    println!("{} {}", label.blue(), identity);
    reconciler.create_or_update(mode, &identity, desired).await?;

    let Some(live) = reconciler.read(&identity).await?.into_record() else {
        anyhow::bail!("適用直後のリソースが見つかりません: {}", identity);
    };

    println!("{}", "✓ 適用しました".green().bold());
    print_record(reconciler.mapper().schema(), &live);
    Ok(identity.to_string())
}
