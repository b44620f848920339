use crate::modules::rules::RuleDatabase;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct RulesCommand {
    /// 操作: list / show / reload
    pub action: String,

    /// 规则名称 (show 时必填，支持模糊匹配)
    pub name: Option<String>,
}

pub async fn execute(cmd: RulesCommand) -> Result<()> {
    let db = RuleDatabase::open_default()?;

    match cmd.action.as_str() {
        "list" => {
            let rules = db.all();
            if rules.is_empty() {
                println!("规则库为空: {}", db.path().display());
                return Ok(());
            }
            println!("共 {} 条规则:\n", rules.len());
            for rule in rules {
                println!(
                    "  {}  {} 个条件, {} 个步骤",
                    rule.name,
                    rule.matchers.len(),
                    rule.steps.len()
                );
            }
        }
        "show" => {
            let name = cmd
                .name
                .ok_or_else(|| anyhow::anyhow!("show 需要指定规则名称"))?;
            let rule = db
                .find(&name)
                .ok_or_else(|| anyhow::anyhow!("未找到规则: {}", name))?;

            println!("规则: {}", rule.name);
            if let Some(notes) = &rule.notes {
                println!("说明: {}", notes);
            }
            println!("\n匹配条件:");
            for matcher in &rule.matchers {
                println!("  {:?}", matcher);
            }
            println!("\n清除步骤:");
            for (index, step) in rule.steps.iter().enumerate() {
                println!("  {}. {}", index + 1, step.instantiate().describe());
            }
        }
        "reload" => {
            let count = db.reload()?;
            println!("规则库已重载: {} 条规则", count);
        }
        other => anyhow::bail!("未知操作: {} (支持 list/show/reload)", other),
    }

    Ok(())
}
