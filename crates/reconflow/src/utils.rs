use colored::Colorize;
use reconflow_cloud::{ActionType, ChangeKind, Plan, PropertyRecord, Schema};

/// レコードを表示する（機密値はマスク）
pub fn print_record(schema: &Schema, record: &PropertyRecord) {
    let redacted = schema.redact(record);
    let width = redacted.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (name, value) in redacted.iter() {
        let padded = format!("{:width$}", name, width = width);
        println!("  {}  {}", padded.cyan(), value);
    }
}

/// プランを表示する
pub fn print_plan(plan: &Plan) {
    let header = match plan.action_type {
        ActionType::Create => format!("+ {} を作成", plan.resource_type).green(),
        ActionType::Update => format!("~ {} を更新", plan.resource_type).yellow(),
        ActionType::NoOp => format!("= {} は最新です", plan.resource_type).normal(),
    };
    println!("{}", header.bold());
    println!("  {}", plan.resource_id.dimmed());

    for change in &plan.changes {
        let old = change.old.as_deref().unwrap_or("(なし)");
        let new = change.new.as_deref().unwrap_or("(なし)");
        match change.kind {
            ChangeKind::Add => println!("    {} {} = {}", "+".green(), change.field, new),
            ChangeKind::Change => println!(
                "    {} {} = {} → {}",
                "~".yellow(),
                change.field,
                old,
                new
            ),
            ChangeKind::Remove => println!("    {} {} = {}", "-".red(), change.field, old),
        }
    }

    println!();
    println!("プラン: {}", plan.summary().to_string().bold());
}
