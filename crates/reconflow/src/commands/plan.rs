use super::with_reconciler;
use crate::context::Context;
use crate::resource::ResourceFile;
use crate::utils::print_plan;
use colored::Colorize;
use reconflow_cloud::{Backend, PropertyMapper, PropertyRecord, Reconciler};
use std::path::Path;

pub async fn handle(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let file = ResourceFile::load(path)?;
    let desired = file.desired()?;

    println!(
        "{} {}",
        "プランを作成中:".blue(),
        file.address().cyan()
    );
    with_reconciler!(ctx, file.kind, |reconciler| run(&reconciler, &desired).await)
}

async fn run<M, B>(reconciler: &Reconciler<M, B>, desired: &PropertyRecord) -> anyhow::Result<()>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    let plan = reconciler.plan(desired).await?;
    println!();
    print_plan(&plan);
    Ok(())
}
