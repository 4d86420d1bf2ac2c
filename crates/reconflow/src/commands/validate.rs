use crate::context::Context;
use crate::resource::ResourceFile;
use colored::Colorize;
use std::path::Path;

pub async fn handle(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    println!("{}", "リソースファイルを検証中...".blue());

    let file = match ResourceFile::load(path) {
        Ok(file) => file,
        Err(e) => fail(e),
    };

    match file.resolve(ctx.offline_subscription_id()) {
        Ok((record, identity)) => {
            println!("{}", "✓ リソースファイルは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  種別: {}", file.kind.resource_type().cyan());
            println!("  アドレス: {}", file.address().cyan());
            println!("  ID: {}", identity.to_string().dimmed());
            println!("  プロパティ: {}個", record.len());
        }
        Err(e) => fail(e),
    }

    Ok(())
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!();
    eprintln!("{}", "✗ 設定エラー".red().bold());
    eprintln!("  {}", e);
    std::process::exit(1);
}
