mod commands;
mod context;
mod resource;
mod utils;

use clap::{Parser, Subcommand};
use context::Context;
use resource::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "宣言して、揃える。Azure リソースの調停ツール", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は自動検出）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// リソースファイルを検証（Azure への接続なし）
    Validate {
        /// リソースファイル (YAML)
        file: PathBuf,
    },
    /// 現在の状態との差分を表示
    Plan {
        /// リソースファイル (YAML)
        file: PathBuf,
    },
    /// リソースを作成または更新
    Apply {
        /// リソースファイル (YAML)
        file: PathBuf,
    },
    /// リソースの現在の状態を表示
    Read {
        /// リソースファイル (YAML)
        file: PathBuf,
    },
    /// リソースを削除
    Delete {
        /// リソースファイル (YAML)
        file: PathBuf,
    },
    /// 既存のリソースを管理下に取り込む
    Import {
        /// リソース種別
        #[arg(value_enum)]
        kind: ResourceKind,
        /// リソース ID
        handle: String,
        /// 状態ファイル上のアドレス
        #[arg(short, long)]
        address: String,
    },
    /// リソース ID を解析して表示（Azure への接続なし）
    ParseId {
        /// リソース種別
        #[arg(value_enum)]
        kind: ResourceKind,
        /// リソース ID
        handle: String,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 標準出力は結果表示に使うので、ログはstderrに出力
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("reconflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::load(cli.config.as_deref())?;
    tracing::debug!("Project root: {}", ctx.project_root.display());

    match cli.command {
        Commands::Validate { file } => {
            commands::validate::handle(&ctx, &file).await?;
        }
        Commands::Plan { file } => {
            commands::plan::handle(&ctx, &file).await?;
        }
        Commands::Apply { file } => {
            commands::apply::handle(&ctx, &file).await?;
        }
        Commands::Read { file } => {
            commands::read::handle(&ctx, &file).await?;
        }
        Commands::Delete { file } => {
            commands::delete::handle(&ctx, &file).await?;
        }
        Commands::Import {
            kind,
            handle,
            address,
        } => {
            commands::import::handle(&ctx, kind, &handle, &address).await?;
        }
        Commands::ParseId { kind, handle } => {
            commands::parse_id::handle(&ctx, kind, &handle)?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
